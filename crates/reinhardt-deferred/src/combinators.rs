//! Aggregate combinators: parallel [`Deferred::all`] and ordered [`Deferred::sequence`].

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::deferred::Deferred;

/// A lazily started step of a [`Deferred::sequence`].
pub type Step<T, E> = Box<dyn FnOnce() -> Deferred<T, E>>;

impl<T, E> Deferred<T, E>
where
	T: Clone + 'static,
	E: Clone + 'static,
{
	/// Wait for every input in parallel.
	///
	/// Fulfills with the results in input order once all inputs are fulfilled, or rejects
	/// with the first rejection observed. Remaining inputs are not cancelled. An empty input
	/// fulfills with an empty list.
	pub fn all<I>(deferreds: I) -> Deferred<Vec<T>, E>
	where
		I: IntoIterator<Item = Deferred<T, E>>,
	{
		let deferreds: Vec<_> = deferreds.into_iter().collect();
		if deferreds.is_empty() {
			return Deferred::fulfilled(Vec::new());
		}

		let combined = Deferred::new();
		let slots: Rc<RefCell<Vec<Option<T>>>> =
			Rc::new(RefCell::new((0..deferreds.len()).map(|_| None).collect()));
		let remaining = Rc::new(Cell::new(deferreds.len()));

		for (index, deferred) in deferreds.into_iter().enumerate() {
			let combined = combined.clone();
			let slots = Rc::clone(&slots);
			let remaining = Rc::clone(&remaining);
			deferred.on_settled(move |result| match result {
				Ok(value) => {
					slots.borrow_mut()[index] = Some(value);
					remaining.set(remaining.get() - 1);
					if remaining.get() == 0 {
						let values = slots.borrow_mut().drain(..).flatten().collect();
						let _ = combined.fulfill(values);
					}
				}
				Err(error) => {
					let _ = combined.reject(error);
				}
			});
		}

		combined
	}

	/// Run steps one at a time.
	///
	/// The first step is invoked immediately; each following step is invoked only after the
	/// previous one fulfilled. The first rejection stops the sequence and rejects the result.
	pub fn sequence<I>(steps: I) -> Deferred<Vec<T>, E>
	where
		I: IntoIterator<Item = Step<T, E>>,
	{
		let combined = Deferred::new();
		run_steps(steps.into_iter().collect(), Vec::new(), combined.clone());
		combined
	}
}

fn run_steps<T, E>(mut steps: VecDeque<Step<T, E>>, mut results: Vec<T>, combined: Deferred<Vec<T>, E>)
where
	T: Clone + 'static,
	E: Clone + 'static,
{
	let Some(step) = steps.pop_front() else {
		let _ = combined.fulfill(results);
		return;
	};

	step().on_settled(move |result| match result {
		Ok(value) => {
			results.push(value);
			run_steps(steps, results, combined);
		}
		Err(error) => {
			let _ = combined.reject(error);
		}
	});
}
