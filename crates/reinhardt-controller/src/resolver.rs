//! Data source resolution.
//!
//! [`Resolver::resolve`] runs the groups of a [`Datasources`] strictly in order from a start
//! index. Producers of one group are invoked together with the snapshot accumulated so far,
//! their outcomes are awaited in parallel, and the first failure aborts the pass. Reactive
//! outcomes are unwrapped and their store keys observed; a change re-resolves from the
//! group that read the key.
//!
//! Each pass carries a [`CancellationToken`]. Once the token is cancelled the pass stops
//! starting groups and throws away results that are still arriving, so a superseded pass
//! never publishes values or touches subscriptions.
//!
//! A group's subscriptions are swapped only when its results are accepted, not when it
//! starts resolving. Until then the previous observers stay live: a change to one of their
//! keys while the group is resolving triggers a new render that supersedes the current pass.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use reinhardt_deferred::{Deferred, Step};
use reinhardt_model::{Store, Subscription};
use serde_json::{Map, Value};

use crate::datasource::{Datasources, Outcome};
use crate::error::{ComponentError, RenderError};
use crate::snapshot::Snapshot;

/// Invoked with the index of the group whose reactive dependency changed.
pub type ChangeHandler = Rc<dyn Fn(usize)>;

/// Shared flag marking a resolution pass as superseded.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
	/// A fresh, uncancelled token.
	pub fn new() -> Self {
		Self::default()
	}

	/// Cancel every pass holding this token.
	pub fn cancel(&self) {
		self.0.set(true);
	}

	/// Whether [`CancellationToken::cancel`] was called.
	pub fn is_cancelled(&self) -> bool {
		self.0.get()
	}

	pub(crate) fn same(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

/// A resolved producer value and the store key it came from.
type Resolved = (Value, Option<String>);

struct ResolverInner {
	store: Rc<dyn Store>,
	/// Store subscriptions per group index
	subscriptions: RefCell<Vec<Vec<Subscription>>>,
}

/// Resolves data sources into snapshots and owns the resulting store subscriptions.
#[derive(Clone)]
pub struct Resolver {
	inner: Rc<ResolverInner>,
}

impl Resolver {
	/// A resolver reading reactive keys from `store`.
	pub fn new(store: Rc<dyn Store>) -> Self {
		Self {
			inner: Rc::new(ResolverInner {
				store,
				subscriptions: RefCell::new(Vec::new()),
			}),
		}
	}

	/// Resolve `datasources` starting at group `start`.
	///
	/// `base` must hold the values of groups `0..start`. The returned value fulfills with
	/// the complete snapshot, or rejects with the first producer failure, or with
	/// [`RenderError::Cancelled`] once `token` is cancelled.
	///
	/// Subscriptions of a group are swapped when that group's results are accepted: the
	/// previous ones are dropped and the reactive keys of the new results observed. Groups
	/// that a pass never reaches keep their subscriptions.
	pub fn resolve(
		&self,
		datasources: &Datasources,
		start: usize,
		base: Snapshot,
		token: CancellationToken,
		on_change: ChangeHandler,
	) -> Deferred<Snapshot, RenderError> {
		let accumulated = Rc::new(RefCell::new(base.as_map().clone()));

		let steps: Vec<Step<(), RenderError>> = datasources
			.groups()
			.iter()
			.enumerate()
			.skip(start)
			.map(|(index, group)| {
				let resolver = self.clone();
				let producers = group.producers().to_vec();
				let accumulated = Rc::clone(&accumulated);
				let token = token.clone();
				let on_change = Rc::clone(&on_change);
				Box::new(move || {
					resolver.resolve_group(index, producers, accumulated, token, on_change)
				}) as Step<(), RenderError>
			})
			.collect();

		let result_token = token.clone();
		Deferred::sequence(steps).then(
			move |_| {
				if result_token.is_cancelled() {
					return Err(RenderError::Cancelled);
				}
				Ok(Snapshot::from(accumulated.take()))
			},
			Err,
		)
	}

	fn resolve_group(
		&self,
		index: usize,
		producers: Vec<(String, crate::datasource::Producer)>,
		accumulated: Rc<RefCell<Map<String, Value>>>,
		token: CancellationToken,
		on_change: ChangeHandler,
	) -> Deferred<(), RenderError> {
		if token.is_cancelled() {
			return Deferred::rejected(RenderError::Cancelled);
		}

		let input = Snapshot::from(accumulated.borrow().clone());
		tracing::trace!(group = index, producers = producers.len(), "resolving datasource group");

		let mut pending = Vec::with_capacity(producers.len());
		let mut names = Vec::with_capacity(producers.len());
		for (name, producer) in &producers {
			let outcome = match producer(&input) {
				Ok(outcome) => outcome,
				Err(source) => {
					return Deferred::rejected(RenderError::Resolve {
						group: index,
						key: name.clone(),
						source,
					});
				}
			};
			let key = name.clone();
			pending.push(settle(outcome).map_err(move |source| RenderError::Resolve {
				group: index,
				key,
				source,
			}));
			names.push(name.clone());
		}

		let resolver = self.clone();
		Deferred::all(pending).then(
			move |results| {
				if token.is_cancelled() {
					tracing::trace!(group = index, "discarding results of a cancelled pass");
					return Err(RenderError::Cancelled);
				}
				let mut observed = Vec::new();
				{
					let mut accumulated = accumulated.borrow_mut();
					for (name, (value, store_key)) in names.into_iter().zip(results) {
						if let Some(store_key) = store_key {
							if !observed.contains(&store_key) {
								observed.push(store_key);
							}
						}
						accumulated.insert(name, value);
					}
				}
				resolver.replace_subscriptions(index, observed, on_change);
				Ok(())
			},
			Err,
		)
	}

	fn replace_subscriptions(&self, index: usize, keys: Vec<String>, on_change: ChangeHandler) {
		let previous = {
			let mut subscriptions = self.inner.subscriptions.borrow_mut();
			if subscriptions.len() <= index {
				subscriptions.resize_with(index + 1, Vec::new);
			}
			std::mem::take(&mut subscriptions[index])
		};
		// Old observers go before the new ones are installed
		drop(previous);

		let fresh: Vec<Subscription> = keys
			.iter()
			.map(|key| {
				let on_change = Rc::clone(&on_change);
				self.inner
					.store
					.observe(key, Rc::new(move || on_change(index)))
			})
			.collect();
		if !fresh.is_empty() {
			tracing::trace!(group = index, keys = ?keys, "observing store keys");
		}
		self.inner.subscriptions.borrow_mut()[index] = fresh;
	}

	/// Number of live store subscriptions held for `group`.
	pub fn subscription_count(&self, group: usize) -> usize {
		self.inner
			.subscriptions
			.borrow()
			.get(group)
			.map_or(0, Vec::len)
	}

	/// Drop every store subscription.
	pub fn clear(&self) {
		let subscriptions = std::mem::take(&mut *self.inner.subscriptions.borrow_mut());
		drop(subscriptions);
	}
}

/// Await an outcome down to its plain value.
fn settle(outcome: Outcome) -> Deferred<Resolved, ComponentError> {
	match outcome {
		Outcome::Plain(value) => Deferred::fulfilled((value, None)),
		Outcome::Reactive(model_value) => {
			let key = model_value.key().to_string();
			Deferred::fulfilled((model_value.into_value(), Some(key)))
		}
		Outcome::Pending(later) => later.and_then(settle),
	}
}
