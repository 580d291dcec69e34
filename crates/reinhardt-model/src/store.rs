//! Store interface and subscription handles.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

/// Callback invoked when an observed key changes. It carries no payload; observers re-read
/// the key through [`Store::get`].
pub type ChangeCallback = Rc<dyn Fn()>;

/// Observable key-value store.
///
/// Implementations must deliver change callbacks asynchronously, never from inside the call
/// that performed the change.
pub trait Store {
	/// Current value for `key`.
	fn get(&self, key: &str) -> Option<Value>;

	/// Observe future changes to `key` until the returned [`Subscription`] is dropped.
	fn observe(&self, key: &str, callback: ChangeCallback) -> Subscription;
}

/// Handle to a store observer. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
	key: String,
	dispose: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
	/// Wrap the disposer that removes an observer for `key`.
	pub fn new<F>(key: impl Into<String>, dispose: F) -> Self
	where
		F: FnOnce() + 'static,
	{
		Self {
			key: key.into(),
			dispose: Some(Box::new(dispose)),
		}
	}

	/// A subscription with nothing to release.
	pub fn empty(key: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			dispose: None,
		}
	}

	/// The observed key.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Remove the observer now.
	pub fn unsubscribe(mut self) {
		self.release();
	}

	fn release(&mut self) {
		if let Some(dispose) = self.dispose.take() {
			tracing::trace!(key = %self.key, "store subscription released");
			dispose();
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.release();
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("key", &self.key)
			.field("active", &self.dispose.is_some())
			.finish()
	}
}
