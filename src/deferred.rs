//! Deferred values and the cooperative runtime.
//!
//! # Examples
//!
//! ```rust
//! # #[cfg(feature = "deferred")]
//! # {
//! use reinhardt_controllers::deferred::{Deferred, runtime};
//!
//! let value: Deferred<i32, String> = Deferred::new();
//! let doubled = value.map(|n| n * 2);
//! value.fulfill(21).unwrap();
//! runtime::run_until_idle();
//! assert_eq!(doubled.peek(), Some(Ok(42)));
//! # }
//! ```

#[cfg(feature = "deferred")]
pub use reinhardt_deferred::*;
