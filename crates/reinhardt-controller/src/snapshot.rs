//! Immutable data snapshots handed to markup functions.

use std::fmt;
use std::rc::Rc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// The `name -> value` mapping produced by one complete resolution pass.
///
/// Snapshots are immutable and cheap to clone; every successful render replaces the
/// controller's snapshot wholesale.
#[derive(Clone, Default, PartialEq)]
pub struct Snapshot(Rc<Map<String, Value>>);

impl Snapshot {
	/// An empty snapshot.
	pub fn new() -> Self {
		Self::default()
	}

	/// Value for `name`.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.0.get(name)
	}

	/// Whether `name` is present.
	pub fn contains_key(&self, name: &str) -> bool {
		self.0.contains_key(name)
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Whether the snapshot has no entries.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Entry names.
	pub fn keys(&self) -> impl Iterator<Item = &String> {
		self.0.keys()
	}

	/// Entries.
	pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
		self.0.iter()
	}

	/// Borrow the underlying map.
	pub fn as_map(&self) -> &Map<String, Value> {
		&self.0
	}

	/// Copy into a JSON object.
	pub fn to_value(&self) -> Value {
		Value::Object((*self.0).clone())
	}

	/// A snapshot holding only the entries whose names satisfy `keep`.
	pub(crate) fn retain<F>(&self, keep: F) -> Self
	where
		F: Fn(&str) -> bool,
	{
		let map = self
			.0
			.iter()
			.filter(|(name, _)| keep(name.as_str()))
			.map(|(name, value)| (name.clone(), value.clone()))
			.collect();
		Self(Rc::new(map))
	}
}

impl From<Map<String, Value>> for Snapshot {
	fn from(map: Map<String, Value>) -> Self {
		Self(Rc::new(map))
	}
}

impl<K: Into<String>> FromIterator<(K, Value)> for Snapshot {
	fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
		Self(Rc::new(
			iter.into_iter().map(|(name, value)| (name.into(), value)).collect(),
		))
	}
}

impl Serialize for Snapshot {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.0.serialize(serializer)
	}
}

impl fmt::Debug for Snapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.0.iter()).finish()
	}
}
