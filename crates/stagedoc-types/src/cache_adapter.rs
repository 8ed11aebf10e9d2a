//! Adapter that persists the local working copy of the document set
use async_trait::async_trait;
use std::fmt::Debug;

use crate::prelude::*;
use crate::types::Place;

#[async_trait]
pub trait CacheAdapter: Debug + Send + Sync {
	/// Loads the persisted document set.
	///
	/// Nothing persisted loads as an empty set. Corrupt persisted data also
	/// loads as empty (logged inside the adapter) — the cache never makes
	/// a reader fail over recoverable state.
	async fn load(&self) -> SdResult<Vec<Place>>;

	/// Persists the full document set to the single local slot.
	///
	/// Best-effort: the store logs and swallows failures so in-memory state
	/// and subscriber notification still proceed.
	async fn save(&self, places: &[Place]) -> SdResult<()>;
}

// vim: ts=4
