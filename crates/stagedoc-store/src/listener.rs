//! Remote change listener
//!
//! Consumes the document adapter's push channel and turns every notice into
//! a refresh job on the sync queue. The payload of a notice is ignored —
//! only the fact that the shared document changed matters.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::StreamExt;
use stagedoc_types::prelude::*;

use crate::store::StoreInner;
use crate::sync::SyncJob;

/// Start listening. Idempotent: a second call while the listener is active
/// is a no-op. Refuses to start when shared mode is disabled.
pub(crate) fn start(inner: &Arc<StoreInner>) -> SdResult<()> {
	let Some(docs) = inner.docs.clone() else {
		return Err(Error::Disabled);
	};

	if inner.listener_active.swap(true, Ordering::SeqCst) {
		return Ok(());
	}

	let inner = Arc::clone(inner);
	tokio::spawn(async move {
		let mut stream = match docs.subscribe_changes().await {
			Ok(stream) => stream,
			Err(err) => {
				error!("Change subscription failed: {}", err);
				inner.listener_active.store(false, Ordering::SeqCst);
				return;
			}
		};

		info!("Remote change listener started");
		while let Some(notice) = stream.next().await {
			debug!("Remote change notice for document {}", notice.doc_id);
			inner.enqueue(SyncJob::Refresh);
		}

		info!("Remote change stream ended");
		inner.listener_active.store(false, Ordering::SeqCst);
	});

	Ok(())
}

// vim: ts=4
