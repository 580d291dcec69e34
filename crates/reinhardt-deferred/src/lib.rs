//! Reinhardt Deferred - settle-once values on a cooperative runtime
//!
//! Controllers never block: data sources, store notifications and child renders all
//! suspend by handing back a [`Deferred`] that settles on a later turn of the
//! [`runtime`].
//!
//! ## Modules
//!
//! - [`runtime`]: thread-local microtask queue and local executor
//! - [`Deferred`]: fulfill/reject once, chain with `then`, `map`, `and_then`
//! - Combinators: [`Deferred::all`] (parallel) and [`Deferred::sequence`] (ordered)
//!
//! ## Example
//!
//! ```
//! use reinhardt_deferred::{Deferred, Step, runtime};
//!
//! let steps: Vec<Step<i32, String>> = vec![
//!     Box::new(|| Deferred::fulfilled(1)),
//!     Box::new(|| Deferred::fulfilled(2)),
//! ];
//! let all = Deferred::sequence(steps);
//! runtime::run_until_idle();
//!
//! assert_eq!(all.peek(), Some(Ok(vec![1, 2])));
//! ```

#![warn(missing_docs)]

mod combinators;
mod deferred;
pub mod runtime;

pub use combinators::Step;
pub use deferred::{AlreadySettled, Deferred, DeferredFuture};
