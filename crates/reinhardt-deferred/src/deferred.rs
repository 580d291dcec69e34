//! Deferred - settle-once asynchronous value container
//!
//! `Deferred<T, E>` holds a value that becomes available later. It is fulfilled or rejected
//! exactly once, and continuations registered with [`Deferred::on_settled`] (or the
//! combinators built on it) run afterwards in registration order, always on a later turn of
//! the [runtime](crate::runtime).
//!
//! ## Example
//!
//! ```
//! use reinhardt_deferred::{Deferred, runtime};
//!
//! let value = Deferred::<i32, String>::new();
//! let doubled = value.map(|n| n * 2);
//!
//! value.fulfill(21).unwrap();
//! runtime::run_until_idle();
//!
//! assert_eq!(doubled.peek(), Some(Ok(42)));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::runtime;

type Continuation<T, E> = Box<dyn FnOnce(Result<T, E>)>;

enum State<T, E> {
	Pending {
		continuations: Vec<Continuation<T, E>>,
		wakers: Vec<Waker>,
	},
	Settled(Result<T, E>),
}

/// Returned when settling a [`Deferred`] that already holds a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deferred value is already settled")]
pub struct AlreadySettled;

/// A settle-once asynchronous value.
///
/// Clones share the same underlying state.
pub struct Deferred<T, E> {
	inner: Rc<RefCell<State<T, E>>>,
}

impl<T, E> Clone for Deferred<T, E> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T, E> Deferred<T, E>
where
	T: Clone + 'static,
	E: Clone + 'static,
{
	/// Create an unsettled deferred value.
	pub fn new() -> Self {
		Self {
			inner: Rc::new(RefCell::new(State::Pending {
				continuations: Vec::new(),
				wakers: Vec::new(),
			})),
		}
	}

	/// Create a deferred value that is already fulfilled.
	pub fn fulfilled(value: T) -> Self {
		Self::settled(Ok(value))
	}

	/// Create a deferred value that is already rejected.
	pub fn rejected(error: E) -> Self {
		Self::settled(Err(error))
	}

	fn settled(result: Result<T, E>) -> Self {
		Self {
			inner: Rc::new(RefCell::new(State::Settled(result))),
		}
	}

	/// Settle the value by running a future to completion on the local executor.
	pub fn from_future<F>(future: F) -> Self
	where
		F: Future<Output = Result<T, E>> + 'static,
	{
		let deferred = Self::new();
		let target = deferred.clone();
		runtime::spawn_local(async move {
			let _ = target.settle(future.await);
		});
		deferred
	}

	/// Fulfill with `value`.
	pub fn fulfill(&self, value: T) -> Result<(), AlreadySettled> {
		self.settle(Ok(value))
	}

	/// Reject with `error`.
	pub fn reject(&self, error: E) -> Result<(), AlreadySettled> {
		self.settle(Err(error))
	}

	/// Settle with either outcome.
	///
	/// Continuations registered so far are queued as a single microtask so they keep their
	/// registration order.
	pub fn settle(&self, result: Result<T, E>) -> Result<(), AlreadySettled> {
		let previous = {
			let mut state = self.inner.borrow_mut();
			if let State::Settled(_) = &*state {
				return Err(AlreadySettled);
			}
			std::mem::replace(&mut *state, State::Settled(result.clone()))
		};

		if let State::Pending {
			continuations,
			wakers,
		} = previous
		{
			wakers.into_iter().for_each(Waker::wake);
			if !continuations.is_empty() {
				runtime::queue_microtask(move || {
					for continuation in continuations {
						continuation(result.clone());
					}
				});
			}
		}
		Ok(())
	}

	/// Whether the value has been fulfilled or rejected.
	pub fn is_settled(&self) -> bool {
		matches!(&*self.inner.borrow(), State::Settled(_))
	}

	/// The settled result, if any.
	pub fn peek(&self) -> Option<Result<T, E>> {
		match &*self.inner.borrow() {
			State::Settled(result) => Some(result.clone()),
			State::Pending { .. } => None,
		}
	}

	/// Register a continuation that receives the settled result exactly once.
	///
	/// The continuation never runs before this call returns, even if the value is already
	/// settled.
	pub fn on_settled<F>(&self, continuation: F)
	where
		F: FnOnce(Result<T, E>) + 'static,
	{
		let result = match &mut *self.inner.borrow_mut() {
			State::Pending { continuations, .. } => {
				continuations.push(Box::new(continuation));
				return;
			}
			State::Settled(result) => result.clone(),
		};
		runtime::queue_microtask(move || continuation(result));
	}

	/// Chain handlers for both outcomes.
	///
	/// Each handler returns the result that settles the returned value, so a handler can
	/// recover from a rejection or turn a fulfilment into one.
	pub fn then<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Deferred<U, E>
	where
		U: Clone + 'static,
		F: FnOnce(T) -> Result<U, E> + 'static,
		R: FnOnce(E) -> Result<U, E> + 'static,
	{
		let next = Deferred::new();
		let target = next.clone();
		self.on_settled(move |result| {
			let outcome = match result {
				Ok(value) => on_fulfilled(value),
				Err(error) => on_rejected(error),
			};
			let _ = target.settle(outcome);
		});
		next
	}

	/// Transform the fulfilled value.
	pub fn map<U, F>(&self, f: F) -> Deferred<U, E>
	where
		U: Clone + 'static,
		F: FnOnce(T) -> U + 'static,
	{
		self.then(move |value| Ok(f(value)), Err)
	}

	/// Transform the rejection.
	pub fn map_err<E2, F>(&self, f: F) -> Deferred<T, E2>
	where
		E2: Clone + 'static,
		F: FnOnce(E) -> E2 + 'static,
	{
		let next = Deferred::new();
		let target = next.clone();
		self.on_settled(move |result| {
			let _ = target.settle(result.map_err(f));
		});
		next
	}

	/// Chain another deferred computation on fulfilment.
	pub fn and_then<U, F>(&self, f: F) -> Deferred<U, E>
	where
		U: Clone + 'static,
		F: FnOnce(T) -> Deferred<U, E> + 'static,
	{
		let next = Deferred::new();
		let target = next.clone();
		self.on_settled(move |result| match result {
			Ok(value) => f(value).on_settled(move |inner| {
				let _ = target.settle(inner);
			}),
			Err(error) => {
				let _ = target.reject(error);
			}
		});
		next
	}
}

impl<T, E> Default for Deferred<T, E>
where
	T: Clone + 'static,
	E: Clone + 'static,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Deferred<T, E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &*self.inner.borrow() {
			State::Pending { continuations, .. } => f
				.debug_struct("Deferred")
				.field("state", &"pending")
				.field("continuations", &continuations.len())
				.finish(),
			State::Settled(result) => f
				.debug_struct("Deferred")
				.field("state", result)
				.finish(),
		}
	}
}

/// Future returned by awaiting a [`Deferred`].
pub struct DeferredFuture<T, E> {
	deferred: Deferred<T, E>,
}

impl<T, E> Future for DeferredFuture<T, E>
where
	T: Clone + 'static,
	E: Clone + 'static,
{
	type Output = Result<T, E>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match &mut *self.deferred.inner.borrow_mut() {
			State::Settled(result) => Poll::Ready(result.clone()),
			State::Pending { wakers, .. } => {
				if !wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
					wakers.push(cx.waker().clone());
				}
				Poll::Pending
			}
		}
	}
}

impl<T, E> IntoFuture for Deferred<T, E>
where
	T: Clone + 'static,
	E: Clone + 'static,
{
	type Output = Result<T, E>;
	type IntoFuture = DeferredFuture<T, E>;

	fn into_future(self) -> Self::IntoFuture {
		DeferredFuture { deferred: self }
	}
}
