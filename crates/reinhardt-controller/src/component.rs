//! The component trait: what a controller renders.
//!
//! A component supplies data sources, a markup function, child declarations and event
//! declarations. [`Controller`] implements the render cycle around it.

use std::fmt;
use std::rc::Rc;

use reinhardt_dom::Node;

use crate::context::ControllerContext;
use crate::controller::Controller;
use crate::datasource::Datasources;
use crate::delegation::DelegatedEvent;
use crate::error::{ComponentError, ControllerError};
use crate::snapshot::Snapshot;

/// Builds the child controller mounted at a matched element.
pub type ChildFactory = Rc<dyn Fn(Node, &ControllerContext) -> Result<Controller, ControllerError>>;

/// Handles a delegated event.
pub type EventHandler = Rc<dyn Fn(&Controller, &DelegatedEvent<'_>)>;

/// Data, markup and structure of a controller.
///
/// # Example
///
/// ```
/// use reinhardt_controller::{Component, ComponentError, DatasourceGroup, Datasources, Snapshot};
/// use serde_json::json;
///
/// struct Counter;
///
/// impl Component for Counter {
///     fn datasources(&self) -> Option<Datasources> {
///         Some(DatasourceGroup::new().with("count", |_| Ok(json!(3).into())).into())
///     }
///
///     fn generate_html(&self, snapshot: &Snapshot) -> Result<String, ComponentError> {
///         Ok(format!("<div>{}</div>", snapshot.get("count").unwrap_or(&json!(0))))
///     }
/// }
/// ```
pub trait Component {
	/// Data sources resolved before every render. `None` makes `start` fail.
	fn datasources(&self) -> Option<Datasources> {
		None
	}

	/// Markup for the controller element's content.
	fn generate_html(&self, snapshot: &Snapshot) -> Result<String, ComponentError>;

	/// Child controllers mounted inside the rendered markup.
	fn children(&self) -> Vec<ChildDeclaration> {
		Vec::new()
	}

	/// Delegated event handlers.
	fn events(&self) -> Vec<EventDeclaration> {
		Vec::new()
	}

	/// Name used in logs and errors.
	fn name(&self) -> &str {
		std::any::type_name::<Self>()
	}
}

/// A child controller mounted at the first element matching `selector`.
#[derive(Clone)]
pub struct ChildDeclaration {
	selector: String,
	factory: ChildFactory,
}

impl ChildDeclaration {
	/// Mount children built by `factory`.
	pub fn new<F>(selector: impl Into<String>, factory: F) -> Self
	where
		F: Fn(Node, &ControllerContext) -> Result<Controller, ControllerError> + 'static,
	{
		Self {
			selector: selector.into(),
			factory: Rc::new(factory),
		}
	}

	/// Mount a fresh controller for a clone of `component`.
	pub fn component<C>(selector: impl Into<String>, component: C) -> Self
	where
		C: Component + Clone + 'static,
	{
		Self::new(selector, move |element, context| {
			Controller::new(component.clone(), element, context.clone())
		})
	}

	/// The child selector, relative to the parent element.
	pub fn selector(&self) -> &str {
		&self.selector
	}

	pub(crate) fn factory(&self) -> &ChildFactory {
		&self.factory
	}
}

impl fmt::Debug for ChildDeclaration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ChildDeclaration")
			.field("selector", &self.selector)
			.finish_non_exhaustive()
	}
}

/// A delegated handler keyed by `"<event type> <selector>"`.
#[derive(Clone)]
pub struct EventDeclaration {
	key: String,
	handler: EventHandler,
}

impl EventDeclaration {
	/// Declare `handler` for `key`, e.g. `"click .remove"`.
	pub fn new<F>(key: impl Into<String>, handler: F) -> Self
	where
		F: Fn(&Controller, &DelegatedEvent<'_>) + 'static,
	{
		Self {
			key: key.into(),
			handler: Rc::new(handler),
		}
	}

	/// The declaration key.
	pub fn key(&self) -> &str {
		&self.key
	}

	pub(crate) fn handler(&self) -> &EventHandler {
		&self.handler
	}
}

impl fmt::Debug for EventDeclaration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventDeclaration")
			.field("key", &self.key)
			.finish_non_exhaustive()
	}
}
