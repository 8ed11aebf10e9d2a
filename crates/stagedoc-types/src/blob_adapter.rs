//! Adapter that stores binary image payloads outside the synchronized document
use async_trait::async_trait;
use std::fmt::Debug;
use uuid::Uuid;

use crate::types::SectionKind;

/// Hierarchical blob address: place, section kind, owning item (for
/// item-scoped images), image id. Keeps locators collision-free without
/// any central allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobPath {
	pub place_id: Uuid,
	pub kind: SectionKind,
	pub item_id: Option<Uuid>,
	pub image_id: Uuid,
}

impl BlobPath {
	/// Relative storage key, e.g. `places/<place>/tasks/<item>/<image>`.
	pub fn key(&self) -> String {
		match self.item_id {
			Some(item_id) => {
				format!("places/{}/{}/{}/{}", self.place_id, self.kind, item_id, self.image_id)
			}
			None => format!("places/{}/{}/{}", self.place_id, self.kind, self.image_id),
		}
	}
}

#[async_trait]
pub trait BlobAdapter: Debug + Send + Sync {
	/// Uploads image bytes, returning a stable locator.
	///
	/// `None` means the upload did not happen (network, quota, disabled
	/// backend). Callers keep the payload embedded and retry on a later
	/// sync cycle.
	async fn upload(&self, path: &BlobPath, name: &str, data: &[u8]) -> Option<Box<str>>;

	/// Re-derives an accessible URL for a previously issued locator.
	///
	/// When re-derivation fails the locator is returned unchanged so the
	/// caller can retry on a later access.
	async fn resolve(&self, blob_id: &str) -> Box<str>;
}


// vim: ts=4
