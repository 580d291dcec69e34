//! Reactive value wrapper.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::Store;

/// A value read from a [`Store`], tagged with the key it came from.
///
/// Returning one from a data source subscribes the controller to changes of that key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelValue {
	key: String,
	value: Value,
}

impl ModelValue {
	/// Tag `value` with its store key.
	pub fn new(key: impl Into<String>, value: Value) -> Self {
		Self {
			key: key.into(),
			value,
		}
	}

	/// Read `key` from `store`; a missing key wraps `null`.
	pub fn read(store: &dyn Store, key: &str) -> Self {
		Self::new(key, store.get(key).unwrap_or(Value::Null))
	}

	/// The store key.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// The wrapped value.
	pub fn value(&self) -> &Value {
		&self.value
	}

	/// Unwrap into the plain value.
	pub fn into_value(self) -> Value {
		self.value
	}
}
