//! Caller-registered cleanup closures.

use std::fmt;

/// A cleanup closure owned by a controller.
pub type Teardown = Box<dyn FnOnce()>;

/// Identifies a teardown registered with [`Controller::own`](crate::Controller::own).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TeardownId(u64);

#[derive(Default)]
pub(crate) struct Teardowns {
	next_id: u64,
	entries: Vec<(TeardownId, Teardown)>,
}

impl Teardowns {
	pub(crate) fn next_id(&mut self) -> TeardownId {
		let id = TeardownId(self.next_id);
		self.next_id += 1;
		id
	}

	pub(crate) fn push(&mut self, id: TeardownId, teardown: Teardown) {
		self.entries.push((id, teardown));
	}

	pub(crate) fn remove(&mut self, id: TeardownId) -> Option<Teardown> {
		let index = self.entries.iter().position(|(entry, _)| *entry == id)?;
		Some(self.entries.remove(index).1)
	}

	/// Every teardown in registration order, leaving the list empty.
	pub(crate) fn take_all(&mut self) -> Vec<Teardown> {
		self.entries.drain(..).map(|(_, teardown)| teardown).collect()
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}
}

impl fmt::Debug for Teardowns {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list()
			.entries(self.entries.iter().map(|(id, _)| id))
			.finish()
	}
}
