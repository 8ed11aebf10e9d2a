//! In-memory test adapters
//!
//! Deterministic stand-ins for the real adapters: a cache over one string
//! slot, a blob store that records uploads, and a shared document slot with
//! change fan-out. Failure modes are switchable so tests can exercise the
//! degraded paths.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use stagedoc_store::{PlaceStore, StoreOpts};
use stagedoc_types::access::StaticGate;
use stagedoc_types::blob_adapter::{BlobAdapter, BlobPath};
use stagedoc_types::cache_adapter::CacheAdapter;
use stagedoc_types::doc_adapter::{ChangeNotice, ChangeStream, DocAdapter, SharedDoc, DOC_ID};
use stagedoc_types::error::{Error, SdResult};
use stagedoc_types::types::Place;

#[derive(Debug, Default)]
pub struct MemCacheAdapter {
	pub slot: Mutex<Option<String>>,
	pub fail_saves: AtomicBool,
	pub save_count: AtomicUsize,
}

impl MemCacheAdapter {
	pub fn with_slot(raw: &str) -> Self {
		Self { slot: Mutex::new(Some(raw.to_string())), ..Self::default() }
	}
}

#[async_trait]
impl CacheAdapter for MemCacheAdapter {
	async fn load(&self) -> SdResult<Vec<Place>> {
		match self.slot.lock().as_deref() {
			// Corrupt data loads as empty, like the real adapters.
			Some(raw) => Ok(serde_json::from_str(raw).unwrap_or_default()),
			None => Ok(Vec::new()),
		}
	}

	async fn save(&self, places: &[Place]) -> SdResult<()> {
		if self.fail_saves.load(Ordering::SeqCst) {
			return Err(Error::DbError);
		}
		*self.slot.lock() = Some(serde_json::to_string(places)?);
		self.save_count.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

#[derive(Debug, Default)]
pub struct MemBlobAdapter {
	pub fail_uploads: AtomicBool,
	pub uploads: Mutex<Vec<String>>,
}

#[async_trait]
impl BlobAdapter for MemBlobAdapter {
	async fn upload(&self, path: &BlobPath, _name: &str, _data: &[u8]) -> Option<Box<str>> {
		if self.fail_uploads.load(Ordering::SeqCst) {
			return None;
		}
		let key = path.key();
		self.uploads.lock().push(key.clone());
		Some(key.into_boxed_str())
	}

	async fn resolve(&self, blob_id: &str) -> Box<str> {
		format!("https://blobs.test/{}", blob_id).into_boxed_str()
	}
}

#[derive(Debug, Default)]
pub struct MemDocAdapter {
	pub doc: Mutex<Option<SharedDoc>>,
	pub replace_count: AtomicUsize,
	subscribers: Mutex<Vec<flume::Sender<ChangeNotice>>>,
}

impl MemDocAdapter {
	pub fn subscriber_count(&self) -> usize {
		self.subscribers.lock().len()
	}
}

#[async_trait]
impl DocAdapter for MemDocAdapter {
	async fn fetch_snapshot(&self) -> Option<SharedDoc> {
		self.doc.lock().clone()
	}

	async fn replace_snapshot(&self, doc: &SharedDoc) -> SdResult<()> {
		*self.doc.lock() = Some(doc.clone());
		self.replace_count.fetch_add(1, Ordering::SeqCst);
		self.subscribers
			.lock()
			.retain(|tx| tx.send(ChangeNotice { doc_id: DOC_ID.into() }).is_ok());
		Ok(())
	}

	async fn subscribe_changes(&self) -> SdResult<ChangeStream> {
		let (tx, rx) = flume::unbounded();
		self.subscribers.lock().push(tx);
		Ok(Box::pin(rx.into_stream()))
	}
}

/// Local-only store: no doc adapter, no blob adapter.
pub async fn open_local_store(cache: Arc<MemCacheAdapter>, privileged: bool) -> PlaceStore {
	PlaceStore::open(StoreOpts {
		cache,
		blobs: None,
		docs: None,
		gate: Arc::new(StaticGate(privileged)),
	})
	.await
	.expect("open local store")
}

/// Shared-mode store: its own cache, shared blob and doc backends.
pub async fn open_shared_store(
	cache: Arc<MemCacheAdapter>,
	blobs: Arc<MemBlobAdapter>,
	docs: Arc<MemDocAdapter>,
	privileged: bool,
) -> PlaceStore {
	PlaceStore::open(StoreOpts {
		cache,
		blobs: Some(blobs as Arc<dyn BlobAdapter>),
		docs: Some(docs as Arc<dyn DocAdapter>),
		gate: Arc::new(StaticGate(privileged)),
	})
	.await
	.expect("open shared store")
}

/// Poll until `check` passes or the timeout elapses.
pub async fn wait_until(check: impl Fn() -> bool) {
	for _ in 0..200 {
		if check() {
			return;
		}
		tokio::time::sleep(std::time::Duration::from_millis(10)).await;
	}
	panic!("condition not reached within timeout");
}

// vim: ts=4
