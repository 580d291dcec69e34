//! # Reinhardt Controller
//!
//! Data-bound UI controllers. A [`Controller`] owns one element and a [`Component`] that
//! describes it:
//!
//! - **Data sources**: ordered groups of named producers. Groups resolve one after the
//!   other, producers within a group in parallel, and every producer sees the values of the
//!   groups before its own. Reactive values re-render their group when the store changes.
//! - **Markup**: rendered from the resolved [`Snapshot`] and patched into the live element,
//!   so unchanged nodes keep their identity and listeners.
//! - **Children**: controllers mounted at selector matches inside the rendered markup and
//!   kept across renders while their element survives.
//! - **Events**: `"<type> <selector>"` handlers delegated from the controller element.
//!
//! ## Example
//!
//! ```
//! use reinhardt_controller::{
//!     Component, ComponentError, Controller, ControllerContext, DatasourceGroup, Datasources,
//!     MemoryStore, Snapshot,
//! };
//! use reinhardt_dom::Node;
//! use serde_json::json;
//!
//! struct Counter;
//!
//! impl Component for Counter {
//!     fn datasources(&self) -> Option<Datasources> {
//!         Some(DatasourceGroup::new().with("count", |_| Ok(json!(3).into())).into())
//!     }
//!
//!     fn generate_html(&self, snapshot: &Snapshot) -> Result<String, ComponentError> {
//!         Ok(format!("<div>{}</div>", snapshot.get("count").unwrap_or(&json!(0))))
//!     }
//! }
//!
//! let element = Node::element("section");
//! let context = ControllerContext::new(MemoryStore::new());
//! let controller = Controller::new(Counter, element.clone(), context).unwrap();
//! let rendered = controller.start().unwrap();
//! reinhardt_deferred::runtime::run_until_idle();
//!
//! assert!(matches!(rendered.peek(), Some(Ok(()))));
//! assert_eq!(element.inner_html(), "<div>3</div>");
//! ```
//!
//! ## Feature Flags
//!
//! - `templates` (default): [`TemplateComponent`], backed by Tera

#![warn(missing_docs)]

mod component;
mod context;
mod controller;
mod datasource;
mod delegation;
mod error;
mod resolver;
mod settings;
mod snapshot;
mod teardown;
#[cfg(feature = "templates")]
mod template;

pub use component::{ChildDeclaration, ChildFactory, Component, EventDeclaration, EventHandler};
pub use context::ControllerContext;
pub use controller::{Controller, Phase};
pub use datasource::{DatasourceGroup, Datasources, Outcome, Producer};
pub use delegation::DelegatedEvent;
pub use error::{ComponentError, ControllerError, RenderError};
pub use resolver::{CancellationToken, ChangeHandler, Resolver};
pub use settings::{ControllerSettings, ENV_PREFIX, SettingsError};
pub use snapshot::Snapshot;
pub use teardown::{Teardown, TeardownId};
#[cfg(feature = "templates")]
pub use template::TemplateComponent;

pub use reinhardt_model::{MemoryStore, ModelValue, Store, Subscription};
