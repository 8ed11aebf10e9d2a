//! The place store: local-first reads/writes with background remote sync
//!
//! Every mutation is a short read-modify-write against the in-memory working
//! copy under a single writer lock, persisted through the cache adapter and
//! delivered to subscribers before the call returns. Remote work (blob
//! uploads, snapshot replacement) is enqueued on the background sync queue
//! and never blocks or fails a write.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use stagedoc_types::access::AccessGate;
use stagedoc_types::blob_adapter::BlobAdapter;
use stagedoc_types::cache_adapter::CacheAdapter;
use stagedoc_types::doc_adapter::DocAdapter;
use stagedoc_types::prelude::*;
use stagedoc_types::types::{
	EquipmentItem, ImageRef, Place, SectionKind, Sections, TaskItem,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::listener;
use crate::subscription::{SubscriberId, SubscriptionRegistry};
use crate::sync::{self, SyncJob};

/// Adapters and collaborators a store is built from.
///
/// `docs` is the shared-mode switch: without a document adapter the store is
/// purely local and the sync queue is never started. Without a blob adapter
/// images simply stay embedded.
pub struct StoreOpts {
	pub cache: Arc<dyn CacheAdapter>,
	pub blobs: Option<Arc<dyn BlobAdapter>>,
	pub docs: Option<Arc<dyn DocAdapter>>,
	pub gate: Arc<dyn AccessGate>,
}

/// Targets an image sequence inside a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageScope {
	/// Images attached directly to a section
	Section(SectionKind),
	/// Images of a task item (searched in both checklist sections)
	Task(Uuid),
	/// Images of an equipment item
	Equipment(Uuid),
}

/// A file handed to [`PlaceStore::add_images`].
#[derive(Debug, Clone)]
pub struct NewImage {
	pub name: Box<str>,
	pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub(crate) struct StoreInner {
	pub(crate) cache: Arc<dyn CacheAdapter>,
	pub(crate) blobs: Option<Arc<dyn BlobAdapter>>,
	pub(crate) docs: Option<Arc<dyn DocAdapter>>,
	gate: Arc<dyn AccessGate>,
	pub(crate) places: RwLock<Vec<Place>>,
	pub(crate) subs: SubscriptionRegistry,
	sync_tx: Option<flume::Sender<SyncJob>>,
	pub(crate) listener_active: AtomicBool,
}

impl StoreInner {
	/// Clone of the current working copy.
	pub(crate) async fn snapshot(&self) -> Vec<Place> {
		self.places.read().await.clone()
	}

	/// Persist best-effort and notify subscribers. Cache failures only cost
	/// durability — the in-memory state has already advanced and the UI
	/// must keep reflecting it.
	pub(crate) async fn persist_and_notify(&self, places: &[Place]) {
		if let Err(err) = self.cache.save(places).await {
			warn!("Local cache save failed: {}", err);
		}
		self.subs.notify(places);
	}

	pub(crate) fn enqueue(&self, job: SyncJob) {
		if let Some(tx) = &self.sync_tx {
			if tx.send(job).is_err() {
				error!("Sync queue is closed");
			}
		}
	}
}

/// Handle to the document set. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PlaceStore {
	inner: Arc<StoreInner>,
}

impl PlaceStore {
	/// Open the store: hydrate the working copy from the local cache and,
	/// when shared mode is configured, start the background sync worker.
	pub async fn open(opts: StoreOpts) -> SdResult<Self> {
		let places = match opts.cache.load().await {
			Ok(places) => places,
			Err(err) => {
				warn!("Local cache load failed, starting empty: {}", err);
				Vec::new()
			}
		};
		info!("Opened place store with {} places", places.len());

		let (sync_tx, sync_rx) = if opts.docs.is_some() {
			let (tx, rx) = flume::unbounded();
			(Some(tx), Some(rx))
		} else {
			(None, None)
		};

		let inner = Arc::new(StoreInner {
			cache: opts.cache,
			blobs: opts.blobs,
			docs: opts.docs,
			gate: opts.gate,
			places: RwLock::new(places),
			subs: SubscriptionRegistry::new(),
			sync_tx,
			listener_active: AtomicBool::new(false),
		});

		if let Some(rx) = sync_rx {
			sync::spawn_sync_worker(Arc::clone(&inner), rx);
		}

		Ok(Self { inner })
	}

	// Reads
	//*******

	/// Current document set, served from the working copy.
	pub async fn places(&self) -> Vec<Place> {
		self.inner.snapshot().await
	}

	pub async fn place(&self, id: Uuid) -> Option<Place> {
		self.inner.places.read().await.iter().find(|p| p.id == id).cloned()
	}

	/// Fetch the remote snapshot, merge it into the working copy, persist
	/// and notify. Without usable remote data the local set is returned
	/// unchanged (seeding the remote from it when non-empty).
	pub async fn refresh(&self) -> Vec<Place> {
		sync::refresh_inner(&self.inner).await
	}

	// Subscriptions
	//***************

	/// Register a subscriber; it receives the full document set on every
	/// save, local or remote-merge.
	pub fn subscribe(&self, listener: impl Fn(&[Place]) + Send + Sync + 'static) -> SubscriberId {
		self.inner.subs.subscribe(listener)
	}

	pub fn unsubscribe(&self, id: SubscriberId) {
		self.inner.subs.unsubscribe(id);
	}

	/// Start the remote change listener. Idempotent; fails with
	/// [`Error::Disabled`] when shared mode is not configured.
	pub fn start_listener(&self) -> SdResult<()> {
		listener::start(&self.inner)
	}

	/// Resolve a blob locator to an accessible URL.
	///
	/// Identity when no blob adapter is configured, and the adapter itself
	/// falls back to the locator when re-derivation fails — either way the
	/// caller can retry on a later access.
	pub async fn resolve_blob(&self, blob_id: &str) -> Box<str> {
		match &self.inner.blobs {
			Some(blobs) => blobs.resolve(blob_id).await,
			None => blob_id.into(),
		}
	}

	/// Wait until every sync job enqueued so far has been processed.
	pub async fn flush_sync(&self) {
		let Some(tx) = &self.inner.sync_tx else { return };
		let (ack_tx, ack_rx) = futures::channel::oneshot::channel();
		if tx.send(SyncJob::Flush(ack_tx)).is_ok() {
			let _ = ack_rx.await;
		}
	}

	// Places
	//********

	/// Create a place with four empty sections.
	pub async fn create_place(&self, name: &str) -> SdResult<Place> {
		let place = Place::new(name);
		let created = place.clone();
		self.mutate(move |places| {
			places.push(place);
			Ok(())
		})
		.await?;
		Ok(created)
	}

	/// Replace a place by id, or append it when unknown.
	pub async fn upsert_place(&self, place: Place) -> SdResult<()> {
		self.mutate(move |places| {
			match places.iter().position(|p| p.id == place.id) {
				Some(idx) => places[idx] = place,
				None => places.push(place),
			}
			Ok(())
		})
		.await
	}

	pub async fn rename_place(&self, id: Uuid, name: &str) -> SdResult<()> {
		self.mutate(|places| {
			place_mut(places, id)?.name = name.into();
			Ok(())
		})
		.await
	}

	/// Privileged only; unprivileged calls change nothing and do not error.
	pub async fn delete_place(&self, id: Uuid) -> SdResult<()> {
		if !self.inner.gate.is_privileged() {
			debug!("delete_place ignored for unprivileged actor");
			return Ok(());
		}
		self.mutate(|places| {
			places.retain(|p| p.id != id);
			Ok(())
		})
		.await
	}

	// Sections
	//**********

	pub async fn update_section_text(
		&self,
		place_id: Uuid,
		kind: SectionKind,
		text: &str,
	) -> SdResult<()> {
		self.mutate(|places| {
			place_mut(places, place_id)?.sections.set_text(kind, text);
			Ok(())
		})
		.await
	}

	// Images
	//********

	/// Attach files as embedded images; payloads are offloaded to the blob
	/// store by later sync cycles.
	pub async fn add_images(
		&self,
		place_id: Uuid,
		scope: ImageScope,
		files: Vec<NewImage>,
	) -> SdResult<()> {
		self.mutate(move |places| {
			let images = scope_images_mut(place_mut(places, place_id)?, scope)?;
			for file in files {
				images.push(ImageRef::embedded(&file.name, &file.bytes));
			}
			Ok(())
		})
		.await
	}

	/// Privileged only; unprivileged calls change nothing and do not error.
	pub async fn remove_image(
		&self,
		place_id: Uuid,
		scope: ImageScope,
		image_id: Uuid,
	) -> SdResult<()> {
		if !self.inner.gate.is_privileged() {
			debug!("remove_image ignored for unprivileged actor");
			return Ok(());
		}
		self.mutate(|places| {
			let images = scope_images_mut(place_mut(places, place_id)?, scope)?;
			images.retain(|img| img.id != image_id);
			Ok(())
		})
		.await
	}

	/// Move the image at `from` to target index `to`.
	pub async fn reorder_image(
		&self,
		place_id: Uuid,
		scope: ImageScope,
		from: usize,
		to: usize,
	) -> SdResult<()> {
		self.mutate(|places| {
			reorder(scope_images_mut(place_mut(places, place_id)?, scope)?, from, to)
		})
		.await
	}

	// Tasks
	//*******

	/// Append a task to a checklist-bearing section (`tasks` or `teardown`).
	pub async fn add_task(
		&self,
		place_id: Uuid,
		kind: SectionKind,
		text: &str,
	) -> SdResult<TaskItem> {
		let task = TaskItem::new(text);
		let created = task.clone();
		self.mutate(move |places| {
			let place = place_mut(places, place_id)?;
			place.sections.tasks_mut(kind).ok_or(Error::NotFound)?.push(task);
			Ok(())
		})
		.await?;
		Ok(created)
	}

	pub async fn set_task_done(&self, place_id: Uuid, task_id: Uuid, done: bool) -> SdResult<()> {
		self.mutate(|places| {
			task_mut(&mut place_mut(places, place_id)?.sections, task_id)?.done = done;
			Ok(())
		})
		.await
	}

	pub async fn update_task_text(
		&self,
		place_id: Uuid,
		task_id: Uuid,
		text: &str,
	) -> SdResult<()> {
		self.mutate(|places| {
			task_mut(&mut place_mut(places, place_id)?.sections, task_id)?.text = text.into();
			Ok(())
		})
		.await
	}

	/// Privileged only; unprivileged calls change nothing and do not error.
	pub async fn remove_task(&self, place_id: Uuid, task_id: Uuid) -> SdResult<()> {
		if !self.inner.gate.is_privileged() {
			debug!("remove_task ignored for unprivileged actor");
			return Ok(());
		}
		self.mutate(|places| {
			let sections = &mut place_mut(places, place_id)?.sections;
			sections.tasks.tasks.retain(|t| t.id != task_id);
			sections.teardown.tasks.retain(|t| t.id != task_id);
			Ok(())
		})
		.await
	}

	pub async fn reorder_task(
		&self,
		place_id: Uuid,
		kind: SectionKind,
		from: usize,
		to: usize,
	) -> SdResult<()> {
		self.mutate(|places| {
			let place = place_mut(places, place_id)?;
			reorder(place.sections.tasks_mut(kind).ok_or(Error::NotFound)?, from, to)
		})
		.await
	}

	// Equipment
	//***********

	pub async fn add_equipment(&self, place_id: Uuid, text: &str) -> SdResult<EquipmentItem> {
		let item = EquipmentItem::new(text);
		let created = item.clone();
		self.mutate(move |places| {
			place_mut(places, place_id)?.sections.equipment.equipments.push(item);
			Ok(())
		})
		.await?;
		Ok(created)
	}

	pub async fn update_equipment_text(
		&self,
		place_id: Uuid,
		equipment_id: Uuid,
		text: &str,
	) -> SdResult<()> {
		self.mutate(|places| {
			equipment_mut(&mut place_mut(places, place_id)?.sections, equipment_id)?.text =
				text.into();
			Ok(())
		})
		.await
	}

	/// Privileged only; unprivileged calls change nothing and do not error.
	pub async fn remove_equipment(&self, place_id: Uuid, equipment_id: Uuid) -> SdResult<()> {
		if !self.inner.gate.is_privileged() {
			debug!("remove_equipment ignored for unprivileged actor");
			return Ok(());
		}
		self.mutate(|places| {
			place_mut(places, place_id)?
				.sections
				.equipment
				.equipments
				.retain(|e| e.id != equipment_id);
			Ok(())
		})
		.await
	}

	pub async fn reorder_equipment(&self, place_id: Uuid, from: usize, to: usize) -> SdResult<()> {
		self.mutate(|places| {
			reorder(&mut place_mut(places, place_id)?.sections.equipment.equipments, from, to)
		})
		.await
	}

	/// Run a mutation against the working copy, then persist, notify and
	/// schedule a remote push. Failed mutations leave everything untouched.
	///
	/// The writer lock is held through notification so subscribers observe
	/// saves in exactly the order they happened.
	async fn mutate<R>(&self, f: impl FnOnce(&mut Vec<Place>) -> SdResult<R>) -> SdResult<R> {
		let mut places = self.inner.places.write().await;
		let out = f(&mut places)?;
		self.inner.persist_and_notify(&places).await;
		drop(places);
		self.inner.enqueue(SyncJob::Push);
		Ok(out)
	}
}

fn place_mut(places: &mut [Place], id: Uuid) -> SdResult<&mut Place> {
	places.iter_mut().find(|p| p.id == id).ok_or(Error::NotFound)
}

fn task_mut(sections: &mut Sections, task_id: Uuid) -> SdResult<&mut TaskItem> {
	sections
		.tasks
		.tasks
		.iter_mut()
		.chain(sections.teardown.tasks.iter_mut())
		.find(|t| t.id == task_id)
		.ok_or(Error::NotFound)
}

fn equipment_mut(sections: &mut Sections, equipment_id: Uuid) -> SdResult<&mut EquipmentItem> {
	sections.equipment.equipments.iter_mut().find(|e| e.id == equipment_id).ok_or(Error::NotFound)
}

fn scope_images_mut(place: &mut Place, scope: ImageScope) -> SdResult<&mut Vec<ImageRef>> {
	match scope {
		ImageScope::Section(kind) => Ok(place.sections.images_mut(kind)),
		ImageScope::Task(task_id) => task_mut(&mut place.sections, task_id).map(|t| &mut t.images),
		ImageScope::Equipment(equipment_id) => {
			equipment_mut(&mut place.sections, equipment_id).map(|e| &mut e.images)
		}
	}
}

/// Index-based reorder primitive: remove `from`, insert at `to` (clamped).
fn reorder<T>(list: &mut Vec<T>, from: usize, to: usize) -> SdResult<()> {
	if from >= list.len() {
		return Err(Error::NotFound);
	}
	let item = list.remove(from);
	let to = to.min(list.len());
	list.insert(to, item);
	Ok(())
}


// vim: ts=4
