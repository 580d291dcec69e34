//! Reinhardt Model - observable store for controllers
//!
//! Controllers never own application state. They read it from a [`Store`] and subscribe to
//! the keys they render. A data source signals that dependency by returning a
//! [`ModelValue`], which pairs the value with its store key.

#![warn(missing_docs)]

mod memory;
mod store;
mod value;

pub use memory::MemoryStore;
pub use store::{ChangeCallback, Store, Subscription};
pub use value::ModelValue;
