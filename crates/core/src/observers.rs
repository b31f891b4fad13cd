//! Observer registry and revocable subscriptions.
//!
//! Observers live in an [`IndexMap`] keyed by [`ObserverId`]: dispatch follows
//! registration order and removal is O(1) without disturbing that order.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::events::SessionEvent;

/// Unique identifier for a registered observer.
pub type ObserverId = u64;

/// Observer callback. Called synchronously on the dispatching task.
pub type ObserverFn = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

type ObserverMap = Arc<Mutex<IndexMap<ObserverId, ObserverFn>>>;

#[derive(Default)]
pub(crate) struct ObserverRegistry {
	observers: ObserverMap,
	next_id: AtomicU64,
}

impl ObserverRegistry {
	pub(crate) fn register(&self, observer: ObserverFn) -> Subscription {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
		self.observers.lock().insert(id, observer);
		Subscription {
			id,
			observers: Some(Arc::downgrade(&self.observers)),
		}
	}

	/// Calls every observer in registration order.
	///
	/// Works on a snapshot, so observers may subscribe or unsubscribe from
	/// inside the callback. Those changes apply from the next dispatch.
	pub(crate) fn dispatch(&self, event: &SessionEvent) {
		let snapshot: Vec<ObserverFn> = self.observers.lock().values().cloned().collect();
		tracing::trace!(event = event.name(), observers = snapshot.len(), "dispatch");
		for observer in snapshot {
			observer(event);
		}
	}

	pub(crate) fn len(&self) -> usize {
		self.observers.lock().len()
	}
}

/// RAII handle that unregisters its observer on drop.
///
/// Holds a weak reference to the registry, so dropping it after the
/// controller is gone is a no-op.
#[must_use = "dropping a Subscription unregisters the observer immediately"]
pub struct Subscription {
	id: ObserverId,
	observers: Option<Weak<Mutex<IndexMap<ObserverId, ObserverFn>>>>,
}

impl Subscription {
	pub fn id(&self) -> ObserverId {
		self.id
	}

	/// Explicitly unsubscribes. Equivalent to dropping.
	pub fn unsubscribe(mut self) {
		self.remove();
	}

	/// Keeps the observer registered for the lifetime of the controller.
	pub fn detach(mut self) {
		self.observers = None;
	}

	fn remove(&mut self) {
		if let Some(map) = self.observers.take().and_then(|weak| weak.upgrade()) {
			map.lock().shift_remove(&self.id);
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.remove();
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("active", &self.observers.is_some())
			.finish()
	}
}
