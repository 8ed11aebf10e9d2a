//! Background sync queue
//!
//! Remote work triggered by local writes runs here: blob backfill, document
//! slimming, snapshot replacement, and listener-triggered refreshes. Jobs
//! flow through one flume channel and are processed strictly in order by a
//! single worker task, so a `Flush` barrier lets tests wait for every
//! previously enqueued job deterministically.
//!
//! Nothing in this module can fail a write: every remote failure is logged
//! and retried on the next cycle.

use std::sync::Arc;

use futures::channel::oneshot;
use stagedoc_types::blob_adapter::BlobPath;
use stagedoc_types::doc_adapter::SharedDoc;
use stagedoc_types::prelude::*;
use stagedoc_types::types::Place;

use crate::merge::merge_places;
use crate::store::StoreInner;

pub(crate) enum SyncJob {
	/// Backfill blob locators, slim, replace the remote snapshot
	Push,
	/// Fetch the remote snapshot and merge it in
	Refresh,
	/// Barrier: acknowledged once every earlier job has been processed
	Flush(oneshot::Sender<()>),
}

pub(crate) fn spawn_sync_worker(inner: Arc<StoreInner>, rx: flume::Receiver<SyncJob>) {
	tokio::spawn(async move {
		while let Ok(job) = rx.recv_async().await {
			match job {
				SyncJob::Push => push_remote(&inner).await,
				SyncJob::Refresh => {
					refresh_inner(&inner).await;
				}
				SyncJob::Flush(ack) => {
					let _ = ack.send(());
				}
			}
		}
		debug!("Sync worker stopped");
	});
}

/// A remote-persisted copy of the document set: embedded payloads are
/// stripped wherever a blob locator already exists. Local copies are never
/// slimmed.
pub(crate) fn slim_doc(places: &[Place]) -> SharedDoc {
	let mut places = places.to_vec();
	for place in &mut places {
		place.visit_images_mut(|_, _, img| {
			if img.blob_id.is_some() {
				img.data = None;
			}
		});
	}
	SharedDoc::new(places)
}

struct PendingUpload {
	path: BlobPath,
	name: Box<str>,
	bytes: Vec<u8>,
}

/// Write path, steps 3–5: upload embedded-only images, write locators back
/// through the normal save path (without re-enqueueing), then replace the
/// remote snapshot with a slimmed copy.
async fn push_remote(inner: &Arc<StoreInner>) {
	let Some(docs) = inner.docs.clone() else { return };

	if let Some(blobs) = inner.blobs.clone() {
		let snapshot = inner.snapshot().await;
		let mut pending = Vec::new();
		for place in &snapshot {
			let place_id = place.id;
			place.visit_images(|kind, item_id, img| {
				if !img.pending_upload() {
					return;
				}
				match img.payload_bytes() {
					Some(bytes) => pending.push(PendingUpload {
						path: BlobPath { place_id, kind, item_id, image_id: img.id },
						name: img.name.clone(),
						bytes,
					}),
					// Treated like a failed upload: the image stays
					// embedded and is reported on every cycle.
					None => warn!("Image {} has an undecodable payload", img.id),
				}
			});
		}

		let mut uploaded: Vec<(BlobPath, Box<str>)> = Vec::new();
		for upload in pending {
			match blobs.upload(&upload.path, &upload.name, &upload.bytes).await {
				Some(blob_id) => uploaded.push((upload.path, blob_id)),
				None => debug!("Blob upload deferred for {}", upload.path.key()),
			}
		}

		if !uploaded.is_empty() {
			info!("Backfilled {} blob locators", uploaded.len());
			let mut places = inner.places.write().await;
			for (path, blob_id) in uploaded {
				let Some(place) = places.iter_mut().find(|p| p.id == path.place_id) else {
					continue;
				};
				place.visit_images_mut(|_, _, img| {
					if img.id == path.image_id && img.blob_id.is_none() {
						img.blob_id = Some(blob_id.clone());
					}
				});
			}
			inner.persist_and_notify(&places).await;
		}
	}

	let snapshot = inner.snapshot().await;
	let doc = slim_doc(&snapshot);
	if let Err(err) = docs.replace_snapshot(&doc).await {
		warn!("Remote snapshot replace failed: {}", err);
	}
}

/// Read/refresh path: fetch, merge against the then-current local copy,
/// persist with remote re-sync suppressed, notify. Without usable remote
/// data the local snapshot seeds the remote (first-writer bootstrap) and is
/// returned unchanged.
///
/// Always notifies, even when the merge changes nothing — concurrent remote
/// writers may have replaced the snapshot with equal content and the UI is
/// told either way.
pub(crate) async fn refresh_inner(inner: &Arc<StoreInner>) -> Vec<Place> {
	let Some(docs) = inner.docs.clone() else {
		return inner.snapshot().await;
	};

	match docs.fetch_snapshot().await {
		None => {
			let snapshot = inner.snapshot().await;
			if !snapshot.is_empty() {
				debug!("No remote snapshot, seeding from local");
				if let Err(err) = docs.replace_snapshot(&slim_doc(&snapshot)).await {
					warn!("Seeding remote snapshot failed: {}", err);
				}
			}
			let places = inner.places.write().await;
			inner.persist_and_notify(&places).await;
			places.clone()
		}
		Some(remote) => {
			// Merging under the writer lock: a local write that landed
			// after the fetch started is part of `places` here and can
			// never be overwritten by the stale remote.
			let mut places = inner.places.write().await;
			let merged = merge_places(remote.places, &places);
			*places = merged;
			inner.persist_and_notify(&places).await;
			places.clone()
		}
	}
}

// vim: ts=4
