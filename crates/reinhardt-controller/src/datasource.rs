//! Data source declarations.
//!
//! A component's data comes from ordered [`DatasourceGroup`]s of named producers. Every
//! producer of a group receives the snapshot built from the groups before it, and returns an
//! [`Outcome`]: a plain value, a value read from the store, or a value that arrives later.

use std::fmt;
use std::rc::Rc;

use reinhardt_deferred::Deferred;
use reinhardt_model::ModelValue;
use serde::Serialize;
use serde_json::Value;

use crate::error::ComponentError;
use crate::snapshot::Snapshot;

/// A named data producer.
pub type Producer = Rc<dyn Fn(&Snapshot) -> Result<Outcome, ComponentError>>;

/// What a producer returned.
#[derive(Clone)]
pub enum Outcome {
	/// A value ready now.
	Plain(Value),
	/// A store value; the controller re-renders the producer's group when the key changes.
	Reactive(ModelValue),
	/// A value that settles later, possibly into another reactive outcome.
	Pending(Deferred<Outcome, ComponentError>),
}

impl Outcome {
	/// A plain value from anything serializable.
	pub fn json<T: Serialize>(value: &T) -> Result<Self, ComponentError> {
		Ok(Self::Plain(serde_json::to_value(value)?))
	}

	/// A plain value that settles later.
	pub fn later(value: Deferred<Value, ComponentError>) -> Self {
		Self::Pending(value.map(Outcome::Plain))
	}
}

impl From<Value> for Outcome {
	fn from(value: Value) -> Self {
		Self::Plain(value)
	}
}

impl From<ModelValue> for Outcome {
	fn from(value: ModelValue) -> Self {
		Self::Reactive(value)
	}
}

impl From<Deferred<Outcome, ComponentError>> for Outcome {
	fn from(value: Deferred<Outcome, ComponentError>) -> Self {
		Self::Pending(value)
	}
}

impl fmt::Debug for Outcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
			Self::Reactive(value) => f.debug_tuple("Reactive").field(value).finish(),
			Self::Pending(value) => f
				.debug_tuple("Pending")
				.field(&value.is_settled())
				.finish(),
		}
	}
}

/// Producers resolved together. Sibling producers run concurrently and cannot see each
/// other's values.
#[derive(Clone, Default)]
pub struct DatasourceGroup {
	producers: Vec<(String, Producer)>,
}

impl DatasourceGroup {
	/// An empty group.
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a producer. A producer registered under the same name is replaced.
	pub fn with<F>(mut self, name: impl Into<String>, producer: F) -> Self
	where
		F: Fn(&Snapshot) -> Result<Outcome, ComponentError> + 'static,
	{
		self.insert(name, producer);
		self
	}

	/// Add a producer in place.
	pub fn insert<F>(&mut self, name: impl Into<String>, producer: F)
	where
		F: Fn(&Snapshot) -> Result<Outcome, ComponentError> + 'static,
	{
		let name = name.into();
		let producer: Producer = Rc::new(producer);
		match self.producers.iter_mut().find(|(existing, _)| *existing == name) {
			Some((_, slot)) => *slot = producer,
			None => self.producers.push((name, producer)),
		}
	}

	/// Producer names in declaration order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.producers.iter().map(|(name, _)| name.as_str())
	}

	/// Number of producers.
	pub fn len(&self) -> usize {
		self.producers.len()
	}

	/// Whether the group has no producers.
	pub fn is_empty(&self) -> bool {
		self.producers.is_empty()
	}

	pub(crate) fn producers(&self) -> &[(String, Producer)] {
		&self.producers
	}
}

impl fmt::Debug for DatasourceGroup {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.names()).finish()
	}
}

/// Ordered data source groups of a component.
#[derive(Clone, Default, Debug)]
pub struct Datasources {
	groups: Vec<DatasourceGroup>,
}

impl Datasources {
	/// Groups resolved in the given order.
	pub fn new(groups: Vec<DatasourceGroup>) -> Self {
		Self { groups }
	}

	/// The groups.
	pub fn groups(&self) -> &[DatasourceGroup] {
		&self.groups
	}

	/// Number of groups.
	pub fn len(&self) -> usize {
		self.groups.len()
	}

	/// Whether there are no groups.
	pub fn is_empty(&self) -> bool {
		self.groups.is_empty()
	}

	/// Whether `name` is produced by one of the first `count` groups.
	pub(crate) fn declared_before(&self, count: usize, name: &str) -> bool {
		self.groups
			.iter()
			.take(count)
			.any(|group| group.names().any(|candidate| candidate == name))
	}
}

impl From<DatasourceGroup> for Datasources {
	fn from(group: DatasourceGroup) -> Self {
		Self::new(vec![group])
	}
}

impl From<Vec<DatasourceGroup>> for Datasources {
	fn from(groups: Vec<DatasourceGroup>) -> Self {
		Self::new(groups)
	}
}
