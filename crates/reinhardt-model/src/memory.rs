//! In-memory [`Store`] implementation.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

use reinhardt_deferred::runtime;
use serde_json::Value;

use crate::store::{ChangeCallback, Store, Subscription};
use crate::value::ModelValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct ObserverId(usize);

impl ObserverId {
	fn new() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

#[derive(Default)]
struct Inner {
	values: RefCell<HashMap<String, Value>>,
	observers: RefCell<HashMap<String, BTreeMap<ObserverId, ChangeCallback>>>,
}

impl Inner {
	fn callback(&self, key: &str, id: ObserverId) -> Option<ChangeCallback> {
		self.observers.borrow().get(key)?.get(&id).cloned()
	}
}

/// A cloneable in-memory store. Clones share the same data and observers.
///
/// Change notifications are queued on the [runtime](reinhardt_deferred::runtime) and
/// delivered in subscription order. An observer removed before its notification runs is
/// skipped.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use reinhardt_deferred::runtime;
/// use reinhardt_model::{MemoryStore, Store};
/// use serde_json::json;
///
/// let store = MemoryStore::new();
/// let seen = Rc::new(Cell::new(0));
/// let counter = seen.clone();
/// let _subscription = store.observe("count", Rc::new(move || counter.set(counter.get() + 1)));
///
/// store.set("count", json!(1));
/// assert_eq!(seen.get(), 0);
/// runtime::run_until_idle();
/// assert_eq!(seen.get(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
	inner: Rc<Inner>,
}

impl MemoryStore {
	/// Create an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a store holding `entries`. No notifications are sent.
	pub fn with_values<I, K>(entries: I) -> Self
	where
		I: IntoIterator<Item = (K, Value)>,
		K: Into<String>,
	{
		let store = Self::new();
		store
			.inner
			.values
			.borrow_mut()
			.extend(entries.into_iter().map(|(key, value)| (key.into(), value)));
		store
	}

	/// Set `key` and notify its observers.
	pub fn set(&self, key: &str, value: Value) {
		self.inner
			.values
			.borrow_mut()
			.insert(key.to_string(), value);
		self.notify(key);
	}

	/// Modify the value of `key` in place (starting from `null` when absent) and notify.
	pub fn update<F>(&self, key: &str, f: F)
	where
		F: FnOnce(&mut Value),
	{
		{
			let mut values = self.inner.values.borrow_mut();
			let value = values.entry(key.to_string()).or_insert(Value::Null);
			f(value);
		}
		self.notify(key);
	}

	/// Remove `key`, notifying observers when it was present.
	pub fn remove(&self, key: &str) -> Option<Value> {
		let removed = self.inner.values.borrow_mut().remove(key);
		if removed.is_some() {
			self.notify(key);
		}
		removed
	}

	/// The current value of `key` wrapped as a [`ModelValue`].
	pub fn model_value(&self, key: &str) -> ModelValue {
		ModelValue::read(self, key)
	}

	/// Number of live observers for `key`.
	pub fn observer_count(&self, key: &str) -> usize {
		self.inner
			.observers
			.borrow()
			.get(key)
			.map_or(0, BTreeMap::len)
	}

	fn notify(&self, key: &str) {
		let ids: Vec<ObserverId> = self
			.inner
			.observers
			.borrow()
			.get(key)
			.map(|observers| observers.keys().copied().collect())
			.unwrap_or_default();
		if ids.is_empty() {
			return;
		}

		tracing::trace!(key, observers = ids.len(), "store change queued");
		let inner: Weak<Inner> = Rc::downgrade(&self.inner);
		let key = key.to_string();
		runtime::queue_microtask(move || {
			let Some(inner) = inner.upgrade() else {
				return;
			};
			for id in ids {
				// Looked up at delivery time so unsubscribed observers are skipped
				if let Some(callback) = inner.callback(&key, id) {
					callback();
				}
			}
		});
	}
}

impl Store for MemoryStore {
	fn get(&self, key: &str) -> Option<Value> {
		self.inner.values.borrow().get(key).cloned()
	}

	fn observe(&self, key: &str, callback: ChangeCallback) -> Subscription {
		let id = ObserverId::new();
		self.inner
			.observers
			.borrow_mut()
			.entry(key.to_string())
			.or_default()
			.insert(id, callback);

		let inner = Rc::downgrade(&self.inner);
		let owned_key = key.to_string();
		Subscription::new(key, move || {
			let Some(inner) = inner.upgrade() else {
				return;
			};
			let mut observers = inner.observers.borrow_mut();
			if let Some(entries) = observers.get_mut(&owned_key) {
				entries.remove(&id);
				if entries.is_empty() {
					observers.remove(&owned_key);
				}
			}
		})
	}
}

impl fmt::Debug for MemoryStore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryStore")
			.field("values", &*self.inner.values.borrow())
			.field("observed_keys", &self.inner.observers.borrow().len())
			.finish()
	}
}
