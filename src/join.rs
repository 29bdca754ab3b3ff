use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};

use crate::{deferred::Deferred, scheduler::Scheduler};

/// Resolves with every input's value, in input order, once all of them resolved.
///
/// Rejects with the first rejection observed, later outcomes are dropped quietly. With no inputs the
/// returned value is resolved right away with an empty `Vec`.
pub fn all<T, E, I>(scheduler: &Scheduler, deferreds: I) -> Deferred<Vec<T>, E>
where
	T: Clone + 'static,
	E: Clone + 'static,
	I: IntoIterator<Item = Deferred<T, E>>,
{
	let deferreds: Vec<_> = deferreds.into_iter().collect();
	let joined = Deferred::new(scheduler);

	if deferreds.is_empty() {
		joined.resolve(Vec::new());
		return joined;
	}

	let slots: Rc<RefCell<Vec<Option<T>>>> = Rc::new(RefCell::new(vec![None; deferreds.len()]));
	let remaining = Rc::new(Cell::new(deferreds.len()));

	for (index, deferred) in deferreds.into_iter().enumerate() {
		let on_resolve = {
			let (joined, slots, remaining) = (joined.clone(), Rc::clone(&slots), Rc::clone(&remaining));

			move |value: T| {
				slots.borrow_mut()[index] = Some(value);
				remaining.set(remaining.get() - 1);

				if remaining.get() == 0 {
					let values = slots.borrow_mut().drain(..).flatten().collect();
					let _ = joined.try_resolve(values);
				}
			}
		};

		let on_reject = {
			let joined = joined.clone();
			move |error: E| {
				let _ = joined.try_reject(error);
			}
		};

		deferred.observe(Box::new(on_resolve), Box::new(on_reject));
	}

	joined
}

/// Settles like whichever input settles first, by either outcome.
///
/// Later settlements are dropped quietly. With no inputs the returned value stays pending forever.
pub fn race<T, E, I>(scheduler: &Scheduler, deferreds: I) -> Deferred<T, E>
where
	T: Clone + 'static,
	E: Clone + 'static,
	I: IntoIterator<Item = Deferred<T, E>>,
{
	let first = Deferred::new(scheduler);

	for deferred in deferreds {
		let (on_resolve, on_reject) = (first.clone(), first.clone());

		deferred.observe(
			Box::new(move |value| {
				let _ = on_resolve.try_resolve(value);
			}),
			Box::new(move |error| {
				let _ = on_reject.try_reject(error);
			}),
		);
	}

	first
}
