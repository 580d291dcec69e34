//! Cooperative Runtime
//!
//! A single-threaded, event-loop style runtime shared by every deferred value,
//! store notification and controller render on the current thread.
//!
//! ## Architecture
//!
//! 1. **Microtask Queue**: FIFO queue of continuations. Nothing queued here ever runs
//!    synchronously with the call that queued it.
//! 2. **Local Executor**: non-`Send` futures are driven on a thread-local
//!    `LocalPool` on native targets and by `wasm_bindgen_futures` in the browser.
//! 3. **Drain Scheduling**: when the queue goes from empty to non-empty, the runtime asks
//!    the host scheduler (if any) to call [`run_until_idle`].
//!
//! ## Example
//!
//! ```
//! use reinhardt_deferred::runtime::{queue_microtask, run_until_idle};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let ran = Rc::new(Cell::new(false));
//! let flag = ran.clone();
//! queue_microtask(move || flag.set(true));
//!
//! assert!(!ran.get());
//! run_until_idle();
//! assert!(ran.get());
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::OnceLock;

#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
use futures::executor::{LocalPool, LocalSpawner};
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
use futures::task::LocalSpawnExt;

type Microtask = Box<dyn FnOnce()>;

/// Type for the host scheduler hook
type SchedulerFn = Box<dyn Fn(Box<dyn FnOnce() + Send>) + Send + Sync>;

/// Global scheduler function
static SCHEDULER: OnceLock<SchedulerFn> = OnceLock::new();

/// Set the host scheduler used to drain the runtime automatically.
///
/// The scheduler receives a task that calls [`run_until_idle`]. It must run that task on
/// the thread that queued the work, because the runtime state is thread-local. Only the
/// first call takes effect.
///
/// # Example
///
/// ```ignore
/// reinhardt_deferred::runtime::set_scheduler(|drain| {
///     tokio::task::spawn_local(async move { drain() });
/// });
/// ```
pub fn set_scheduler<F>(scheduler: F)
where
	F: Fn(Box<dyn FnOnce() + Send>) + Send + Sync + 'static,
{
	let _ = SCHEDULER.set(Box::new(scheduler));
}

struct Runtime {
	microtasks: RefCell<VecDeque<Microtask>>,
	/// A drain was requested from the host and has not run yet
	drain_requested: Cell<bool>,
	draining: Cell<bool>,
	#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
	pool: RefCell<LocalPool>,
	#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
	spawner: LocalSpawner,
}

impl Runtime {
	fn new() -> Self {
		#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
		let pool = LocalPool::new();
		Self {
			microtasks: RefCell::new(VecDeque::new()),
			drain_requested: Cell::new(false),
			draining: Cell::new(false),
			#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
			spawner: pool.spawner(),
			#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
			pool: RefCell::new(pool),
		}
	}
}

thread_local! {
	static RUNTIME: Runtime = Runtime::new();
}

/// Queue a task to run on a later turn of the runtime.
///
/// Tasks run in the order they were queued.
pub fn queue_microtask<F>(task: F)
where
	F: FnOnce() + 'static,
{
	let request = RUNTIME.with(|rt| {
		rt.microtasks.borrow_mut().push_back(Box::new(task));
		!rt.draining.get() && !rt.drain_requested.replace(true)
	});
	if request {
		request_drain();
	}
}

/// Spawn a `'static` future on the thread's local executor.
///
/// The future makes progress whenever the runtime is drained.
pub fn spawn_local<F>(future: F)
where
	F: Future<Output = ()> + 'static,
{
	#[cfg(all(target_family = "wasm", target_os = "unknown"))]
	wasm_bindgen_futures::spawn_local(future);

	#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
	{
		let request = RUNTIME.with(|rt| {
			if let Err(err) = rt.spawner.spawn_local(future) {
				tracing::error!(%err, "local executor rejected a task");
			}
			!rt.draining.get() && !rt.drain_requested.replace(true)
		});
		if request {
			request_drain();
		}
	}
}

/// Number of microtasks waiting to run.
pub fn pending_microtasks() -> usize {
	RUNTIME.with(|rt| rt.microtasks.borrow().len())
}

fn request_drain() {
	if let Some(scheduler) = SCHEDULER.get() {
		scheduler(Box::new(|| {
			run_until_idle();
		}));
		return;
	}

	#[cfg(all(target_family = "wasm", target_os = "unknown"))]
	wasm_bindgen_futures::spawn_local(async {
		run_until_idle();
	});
}

/// Resets the draining flags even if a task panics.
struct DrainGuard;

impl Drop for DrainGuard {
	fn drop(&mut self) {
		RUNTIME.with(|rt| {
			rt.draining.set(false);
			rt.drain_requested.set(false);
		});
	}
}

/// Run queued microtasks and local futures until no work is left.
///
/// Returns the number of microtasks executed. A call made while the runtime is already
/// draining returns `0` immediately.
pub fn run_until_idle() -> usize {
	if RUNTIME.with(|rt| rt.draining.replace(true)) {
		return 0;
	}
	let _guard = DrainGuard;

	let mut executed = 0;
	loop {
		while let Some(task) = RUNTIME.with(|rt| rt.microtasks.borrow_mut().pop_front()) {
			task();
			executed += 1;
		}

		stall_local_executor();

		if RUNTIME.with(|rt| rt.microtasks.borrow().is_empty()) {
			break;
		}
	}

	tracing::trace!(executed, "runtime idle");
	executed
}

#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
fn stall_local_executor() {
	RUNTIME.with(|rt| {
		if let Ok(mut pool) = rt.pool.try_borrow_mut() {
			pool.run_until_stalled();
		}
	});
}

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
fn stall_local_executor() {}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::rc::Rc;

	#[rstest]
	fn test_microtasks_run_in_fifo_order() {
		let log = Rc::new(RefCell::new(Vec::new()));
		for i in 0..3 {
			let log = log.clone();
			queue_microtask(move || log.borrow_mut().push(i));
		}

		assert!(log.borrow().is_empty());
		assert_eq!(run_until_idle(), 3);
		assert_eq!(*log.borrow(), vec![0, 1, 2]);
	}

	#[rstest]
	fn test_nested_microtasks_are_drained() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let outer = log.clone();
		queue_microtask(move || {
			outer.borrow_mut().push("outer");
			let inner = outer.clone();
			queue_microtask(move || inner.borrow_mut().push("inner"));
		});

		run_until_idle();
		assert_eq!(*log.borrow(), vec!["outer", "inner"]);
		assert_eq!(pending_microtasks(), 0);
	}

	#[rstest]
	fn test_reentrant_drain_is_ignored() {
		let nested = Rc::new(Cell::new(usize::MAX));
		let slot = nested.clone();
		queue_microtask(move || slot.set(run_until_idle()));

		run_until_idle();
		assert_eq!(nested.get(), 0);
	}

	#[rstest]
	fn test_spawned_future_runs_on_drain() {
		let done = Rc::new(Cell::new(false));
		let flag = done.clone();
		spawn_local(async move { flag.set(true) });

		assert!(!done.get());
		run_until_idle();
		assert!(done.get());
	}
}
