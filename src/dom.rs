//! Live DOM tree, markup parsing, selectors and in-place reconciliation.
//!
//! # Examples
//!
//! ```rust
//! # #[cfg(feature = "dom")]
//! # {
//! use reinhardt_controllers::dom::{Node, reconcile};
//!
//! let live = Node::element("ul");
//! live.set_inner_html("<li>a</li>");
//! let generated = live.shallow_clone();
//! generated.set_inner_html("<li>a</li><li>b</li>");
//!
//! let stats = reconcile(&generated, &live, &[]);
//! assert_eq!(stats.inserted, 1);
//! assert_eq!(live.inner_html(), "<li>a</li><li>b</li>");
//! # }
//! ```

#[cfg(feature = "dom")]
pub use reinhardt_dom::*;
