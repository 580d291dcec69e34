//! Observable key-value stores.

#[cfg(feature = "model")]
pub use reinhardt_model::*;
