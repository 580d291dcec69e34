//! # Reinhardt Controllers
//!
//! Data-bound UI controllers for long-lived, server-rendered pages.
//!
//! A controller owns one element. Each render resolves the component's data sources group
//! by group, renders markup from the resulting snapshot and patches it into the live
//! element in place, so focus, listeners and nested controllers survive. Nested
//! controllers are mounted at selector matches, events are delegated from the controller
//! element, and a newer render always supersedes an older one.
//!
//! ## Crates
//!
//! - [`deferred`]: settle-once values and the cooperative runtime every render runs on
//! - [`dom`]: live node tree, markup parser, selectors, events and the reconciler
//! - [`model`]: the observable store interface and an in-memory store
//! - [`controller`]: components, controllers, data sources and delegation
//!
//! ## Feature Flags
//!
//! - `full` (default): everything below
//! - `deferred`, `dom`, `model`, `controller`: the individual crates
//! - `templates`: Tera-backed template components
//!
//! ## Quick Example
//!
//! ```rust
//! # #[cfg(feature = "templates")]
//! # {
//! use reinhardt_controllers::prelude::*;
//! use serde_json::json;
//!
//! let store = MemoryStore::with_values([("count", json!(3))]);
//! let counter = store.clone();
//! let component = TemplateComponent::new("<div>{{ count }}</div>")
//!     .unwrap()
//!     .with_datasources(
//!         DatasourceGroup::new().with("count", move |_| Ok(counter.model_value("count").into())),
//!     );
//!
//! let document = Document::from_html("<body><section id=\"counter\"></section></body>");
//! let controller =
//!     Controller::from_selector(component, &document, "#counter", ControllerContext::new(store.clone()))
//!         .unwrap();
//! controller.start().unwrap();
//! run_until_idle();
//! assert_eq!(controller.element().inner_html(), "<div>3</div>");
//!
//! store.set("count", json!(4));
//! run_until_idle();
//! assert_eq!(controller.element().inner_html(), "<div>4</div>");
//! # }
//! ```

#![warn(missing_docs)]

pub mod controller;
pub mod deferred;
pub mod dom;
pub mod model;

/// Commonly used types.
pub mod prelude {
	#[cfg(feature = "deferred")]
	pub use reinhardt_deferred::{Deferred, Step, runtime::run_until_idle};

	#[cfg(feature = "dom")]
	pub use reinhardt_dom::{Document, Event, Node, Selector, reconcile};

	#[cfg(feature = "model")]
	pub use reinhardt_model::{MemoryStore, ModelValue, Store, Subscription};

	#[cfg(feature = "controller")]
	pub use reinhardt_controller::{
		ChildDeclaration, Component, ComponentError, Controller, ControllerContext,
		ControllerError, ControllerSettings, DatasourceGroup, Datasources, DelegatedEvent,
		EventDeclaration, Outcome, Phase, RenderError, Snapshot,
	};

	#[cfg(feature = "templates")]
	pub use reinhardt_controller::TemplateComponent;
}
