//! DOM events: listeners, bubbling dispatch and RAII listener handles.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::node::{Node, NodeInner};

/// Callback invoked for a dispatched event.
pub type EventCallback = Rc<dyn Fn(&Event)>;

pub(crate) struct ListenerEntry {
	id: u64,
	event_type: String,
	callback: EventCallback,
}

/// An event travelling from its target up through the target's ancestors.
pub struct Event {
	event_type: String,
	bubbles: bool,
	target: RefCell<Option<Node>>,
	current_target: RefCell<Option<Node>>,
	propagation_stopped: Cell<bool>,
	default_prevented: Cell<bool>,
}

impl Event {
	/// Create a bubbling event of the given type.
	pub fn new(event_type: impl Into<String>) -> Self {
		Self {
			event_type: event_type.into(),
			bubbles: true,
			target: RefCell::new(None),
			current_target: RefCell::new(None),
			propagation_stopped: Cell::new(false),
			default_prevented: Cell::new(false),
		}
	}

	/// Create an event that is only delivered to its target.
	pub fn non_bubbling(event_type: impl Into<String>) -> Self {
		Self {
			bubbles: false,
			..Self::new(event_type)
		}
	}

	/// The event type, e.g. `"click"`.
	pub fn event_type(&self) -> &str {
		&self.event_type
	}

	/// Whether the event bubbles.
	pub fn bubbles(&self) -> bool {
		self.bubbles
	}

	/// The node the event was dispatched on.
	pub fn target(&self) -> Option<Node> {
		self.target.borrow().clone()
	}

	/// The node whose listeners are currently running.
	pub fn current_target(&self) -> Option<Node> {
		self.current_target.borrow().clone()
	}

	/// Stop delivery to ancestors of the current target.
	pub fn stop_propagation(&self) {
		self.propagation_stopped.set(true);
	}

	/// Whether [`Event::stop_propagation`] was called.
	pub fn is_propagation_stopped(&self) -> bool {
		self.propagation_stopped.get()
	}

	/// Mark the default action as cancelled.
	pub fn prevent_default(&self) {
		self.default_prevented.set(true);
	}

	/// Whether [`Event::prevent_default`] was called.
	pub fn default_prevented(&self) -> bool {
		self.default_prevented.get()
	}
}

impl std::fmt::Debug for Event {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Event")
			.field("event_type", &self.event_type)
			.field("bubbles", &self.bubbles)
			.field("propagation_stopped", &self.propagation_stopped.get())
			.finish()
	}
}

/// Handle to an attached listener. Dropping it removes the listener.
#[must_use = "dropping an EventHandle removes the listener"]
pub struct EventHandle {
	node: Weak<NodeInner>,
	id: u64,
	event_type: String,
}

impl EventHandle {
	/// The event type this listener was attached for.
	pub fn event_type(&self) -> &str {
		&self.event_type
	}

	/// Remove the listener now.
	pub fn remove(self) {}
}

impl Drop for EventHandle {
	fn drop(&mut self) {
		if let Some(node) = self.node.upgrade() {
			node.listeners
				.borrow_mut()
				.retain(|entry| entry.id != self.id);
		}
	}
}

impl std::fmt::Debug for EventHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EventHandle")
			.field("id", &self.id)
			.field("event_type", &self.event_type)
			.finish()
	}
}

impl Node {
	/// Attach a listener for `event_type`.
	pub fn add_event_listener<F>(&self, event_type: &str, callback: F) -> EventHandle
	where
		F: Fn(&Event) + 'static,
	{
		static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(0);
		let id = NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed);

		self.inner.listeners.borrow_mut().push(ListenerEntry {
			id,
			event_type: event_type.to_string(),
			callback: Rc::new(callback),
		});

		EventHandle {
			node: Rc::downgrade(&self.inner),
			id,
			event_type: event_type.to_string(),
		}
	}

	/// Number of listeners attached for `event_type`.
	pub fn listener_count(&self, event_type: &str) -> usize {
		self.inner
			.listeners
			.borrow()
			.iter()
			.filter(|entry| entry.event_type == event_type)
			.count()
	}

	/// Dispatch `event` with this node as target.
	///
	/// Listeners on the target run first, then those on each ancestor while the event
	/// bubbles. Returns `false` when a listener prevented the default action.
	pub fn dispatch_event(&self, event: &Event) -> bool {
		*event.target.borrow_mut() = Some(self.clone());

		let mut current = Some(self.clone());
		while let Some(node) = current {
			*event.current_target.borrow_mut() = Some(node.clone());

			let callbacks: Vec<EventCallback> = node
				.inner
				.listeners
				.borrow()
				.iter()
				.filter(|entry| entry.event_type == event.event_type)
				.map(|entry| Rc::clone(&entry.callback))
				.collect();
			for callback in callbacks {
				callback(event);
			}

			if !event.bubbles || event.is_propagation_stopped() {
				break;
			}
			current = node.parent();
		}

		*event.current_target.borrow_mut() = None;
		!event.default_prevented()
	}
}
