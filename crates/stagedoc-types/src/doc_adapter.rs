//! Adapter that holds the single shared remote snapshot of the document set
//!
//! The remote store holds exactly one JSON document at a fixed well-known
//! identifier, fetched and replaced wholesale. There is no versioning or
//! optimistic-concurrency token: the latest replace always wins.

use async_trait::async_trait;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, pin::Pin};

use crate::prelude::*;
use crate::types::Place;

/// Fixed identifier of the single shared document.
pub const DOC_ID: &str = "default";

/// Snapshot format version. Reserved for future migrations, always 1.
pub const DOC_VERSION: u32 = 1;

/// The remote snapshot payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedDoc {
	pub version: u32,
	pub places: Vec<Place>,
}

impl SharedDoc {
	pub fn new(places: Vec<Place>) -> Self {
		Self { version: DOC_VERSION, places }
	}
}

/// A push notification that the shared document changed.
///
/// Carries no payload beyond the document identifier: consumers only care
/// that *a* change occurred and refetch.
#[derive(Debug, Clone)]
pub struct ChangeNotice {
	pub doc_id: Box<str>,
}

pub type ChangeStream = Pin<Box<dyn Stream<Item = ChangeNotice> + Send>>;

#[async_trait]
pub trait DocAdapter: Debug + Send + Sync {
	/// Fetches the current shared snapshot.
	///
	/// `None` covers both "no document exists yet" and "fetch failed" —
	/// callers treat them identically as "no usable remote data". Errors are
	/// logged inside the adapter.
	async fn fetch_snapshot(&self) -> Option<SharedDoc>;

	/// Replaces the shared snapshot wholesale. Best-effort.
	async fn replace_snapshot(&self, doc: &SharedDoc) -> SdResult<()>;

	/// Subscribes to change notifications for the shared document.
	async fn subscribe_changes(&self) -> SdResult<ChangeStream>;
}

// vim: ts=4
