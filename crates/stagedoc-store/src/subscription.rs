//! In-process subscriber registry
//!
//! External collaborators (UI layers) register callbacks and receive the
//! full document set on every save, whether the change came from a local
//! write or a remote merge. The registry is owned by its store instance —
//! independent stores share no subscriber state.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use stagedoc_types::prelude::*;
use stagedoc_types::types::Place;

type Listener = Arc<dyn Fn(&[Place]) + Send + Sync>;

/// Handle returned by [`SubscriptionRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

pub struct SubscriptionRegistry {
	next_id: AtomicU64,
	/// Kept in registration order; notification iterates in this order.
	listeners: RwLock<Vec<(u64, Listener)>>,
}

impl SubscriptionRegistry {
	pub fn new() -> Self {
		Self { next_id: AtomicU64::new(1), listeners: RwLock::new(Vec::new()) }
	}

	pub fn subscribe(&self, listener: impl Fn(&[Place]) + Send + Sync + 'static) -> SubscriberId {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		self.listeners.write().push((id, Arc::new(listener)));
		SubscriberId(id)
	}

	/// Removes a subscriber. Unknown ids are ignored.
	pub fn unsubscribe(&self, id: SubscriberId) {
		self.listeners.write().retain(|(lid, _)| *lid != id.0);
	}

	/// Invokes every subscriber, in registration order, with the full set.
	///
	/// A panicking subscriber is isolated: the remaining subscribers still
	/// run and the caller never observes the failure.
	pub fn notify(&self, places: &[Place]) {
		// Snapshot the list so subscribers may (un)subscribe from within
		// their callback without deadlocking.
		let listeners: Vec<(u64, Listener)> = self.listeners.read().clone();
		for (id, listener) in listeners {
			if catch_unwind(AssertUnwindSafe(|| listener(places))).is_err() {
				warn!("Subscriber {} panicked during notification", id);
			}
		}
	}

	pub fn subscriber_count(&self) -> usize {
		self.listeners.read().len()
	}
}

impl Default for SubscriptionRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for SubscriptionRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.debug_struct("SubscriptionRegistry")
			.field("subscribers", &self.subscriber_count())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Mutex;

	#[test]
	fn notifies_in_registration_order() {
		let registry = SubscriptionRegistry::new();
		let order = Arc::new(Mutex::new(Vec::new()));

		for tag in ["first", "second", "third"] {
			let order = Arc::clone(&order);
			registry.subscribe(move |_| order.lock().unwrap().push(tag));
		}

		registry.notify(&[]);
		assert_eq!(*order.lock().unwrap(), ["first", "second", "third"]);
	}

	#[test]
	fn panicking_subscriber_is_isolated() {
		let registry = SubscriptionRegistry::new();
		let reached = Arc::new(Mutex::new(false));

		registry.subscribe(|_| panic!("broken subscriber"));
		let flag = Arc::clone(&reached);
		registry.subscribe(move |_| *flag.lock().unwrap() = true);

		registry.notify(&[]);
		assert!(*reached.lock().unwrap());
	}

	#[test]
	fn unsubscribe_stops_delivery() {
		let registry = SubscriptionRegistry::new();
		let count = Arc::new(Mutex::new(0));

		let counter = Arc::clone(&count);
		let id = registry.subscribe(move |_| *counter.lock().unwrap() += 1);

		registry.notify(&[]);
		registry.unsubscribe(id);
		registry.notify(&[]);

		assert_eq!(*count.lock().unwrap(), 1);
	}
}

// vim: ts=4
