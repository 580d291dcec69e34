//! Controllers and components.
//!
//! See [`reinhardt_controller`] for the render cycle.

#[cfg(feature = "controller")]
pub use reinhardt_controller::*;
