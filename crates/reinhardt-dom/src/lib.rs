//! Reinhardt DOM - live node tree for controller rendering
//!
//! An in-process DOM with the operations controllers rely on:
//!
//! - [`Node`]: shared handles to elements, text, comments and fragments
//! - Markup: a lenient `nom` parser ([`parse_fragment`]) and serializer
//!   ([`Node::outer_html`], [`Node::inner_html`])
//! - [`Selector`]: CSS selector matching, `closest` and queries
//! - [`Event`]: listener registration with RAII [`EventHandle`]s and bubbling dispatch
//! - [`reconcile`]: in-place patching of a live subtree against generated nodes
//!
//! ## Example
//!
//! ```
//! use reinhardt_dom::{Document, Node, reconcile};
//!
//! let document = Document::from_html("<div id=\"app\"><p>old</p></div>");
//! let app = document.query_selector("#app").unwrap().unwrap();
//! let paragraph = app.first_element_child().unwrap();
//!
//! let generated = app.shallow_clone();
//! generated.set_inner_html("<p>new</p>");
//! reconcile(&generated, &app, &[]);
//!
//! assert_eq!(app.inner_html(), "<p>new</p>");
//! assert!(app.first_element_child().unwrap().is_same_node(&paragraph));
//! ```

#![warn(missing_docs)]

mod document;
mod error;
mod event;
mod html;
mod node;
mod parser;
mod reconcile;
mod selector;

pub use document::Document;
pub use error::{DomError, SelectorError};
pub use event::{Event, EventCallback, EventHandle};
pub use html::{decode_entities, escape_attribute, escape_text};
pub use node::{Node, NodeType};
pub use parser::parse_fragment;
pub use reconcile::{ReconcileStats, reconcile};
pub use selector::{AttrOp, Combinator, ComplexSelector, CompoundSelector, Selector};
