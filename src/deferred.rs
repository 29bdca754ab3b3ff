use std::{
	cell::{Cell, RefCell},
	fmt,
	rc::Rc,
};

use crate::{future::Settled, scheduler::Scheduler};

type OnResolve<T> = Box<dyn FnOnce(T)>;
type OnReject<E> = Box<dyn FnOnce(E)>;

/// Observable state of a [`Deferred`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
	/// Not settled yet
	Pending,
	/// Settled with a success value
	Resolved,
	/// Settled with a failure value
	Rejected,
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let msg = match self {
			Status::Pending => "pending",
			Status::Resolved => "resolved",
			Status::Rejected => "rejected",
		};

		fmt::Display::fmt(msg, f)
	}
}

enum State<T, E> {
	Pending { on_resolve: Vec<OnResolve<T>>, on_reject: Vec<OnReject<E>> },
	Resolved(T),
	Rejected(E),
}

impl<T, E> State<T, E> {
	fn status(&self) -> Status {
		match self {
			State::Pending { .. } => Status::Pending,
			State::Resolved(_) => Status::Resolved,
			State::Rejected(_) => Status::Rejected,
		}
	}
}

/// Anything that can report a single eventual outcome to a pair of observers.
///
/// Handlers passed to [`Deferred::then`] may return an [`Outcome::Follow`] wrapping a thenable, the
/// derived value then settles the way the thenable does.
pub trait Thenable<T, E> {
	/// Registers observers, exactly one of which eventually runs
	fn subscribe(self: Box<Self>, on_resolve: Box<dyn FnOnce(T)>, on_reject: Box<dyn FnOnce(E)>);
}

/// What a chain handler decided for the derived [`Deferred`]
pub enum Outcome<T, E> {
	/// Resolve the derived value
	Resolve(T),
	/// Reject the derived value
	Reject(E),
	/// Settle the derived value like this thenable eventually settles
	Follow(Box<dyn Thenable<T, E>>),
}

impl<T, E> Outcome<T, E> {
	/// Wraps `thenable` into [`Outcome::Follow`]
	pub fn follow<Th: Thenable<T, E> + 'static>(thenable: Th) -> Self {
		Outcome::Follow(Box::new(thenable))
	}
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
	fn from(result: Result<T, E>) -> Self {
		match result {
			Ok(value) => Outcome::Resolve(value),
			Err(error) => Outcome::Reject(error),
		}
	}
}

impl<T: Clone + 'static, E: Clone + 'static> From<Deferred<T, E>> for Outcome<T, E> {
	fn from(deferred: Deferred<T, E>) -> Self {
		Outcome::follow(deferred)
	}
}

impl<T, E> fmt::Debug for Outcome<T, E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let variant = match self {
			Outcome::Resolve(_) => "Resolve",
			Outcome::Reject(_) => "Reject",
			Outcome::Follow(_) => "Follow",
		};

		f.write_str(variant)
	}
}

/// A single-assignment value that becomes available later, either as a success `T` or a failure `E`.
///
/// Handles are cheap to clone and all point to the same value. Every observer runs on a later turn of
/// the [`EventLoop`](crate::rt::EventLoop), through the [`Scheduler`] the value was created with.
pub struct Deferred<T, E> {
	state: Rc<RefCell<State<T, E>>>,
	scheduler: Scheduler,
}

impl<T, E> Clone for Deferred<T, E> {
	fn clone(&self) -> Self {
		Self { state: Rc::clone(&self.state), scheduler: self.scheduler.clone() }
	}
}

impl<T: Clone + 'static, E: Clone + 'static> Deferred<T, E> {
	/// Creates a pending value
	pub fn new(scheduler: &Scheduler) -> Self {
		let state = State::Pending { on_resolve: Vec::new(), on_reject: Vec::new() };
		Self { state: Rc::new(RefCell::new(state)), scheduler: scheduler.clone() }
	}

	/// Creates a pending value and hands its settling capabilities to `initializer`, which runs
	/// synchronously, exactly once.
	///
	/// A panic inside `initializer` is not turned into a rejection, it propagates to the caller.
	pub fn with_initializer<F>(scheduler: &Scheduler, initializer: F) -> Self
	where
		F: FnOnce(Resolver<T, E>, Rejecter<T, E>),
	{
		let deferred = Self::new(scheduler);
		initializer(Resolver { deferred: deferred.clone() }, Rejecter { deferred: deferred.clone() });
		deferred
	}

	/// Creates a value already resolved with `value`
	pub fn resolved(scheduler: &Scheduler, value: T) -> Self {
		let deferred = Self::new(scheduler);
		let _ = deferred.try_resolve(value);
		deferred
	}

	/// Creates a value already rejected with `error`. Nothing observes it yet, so this is reported
	/// like any other unhandled rejection
	pub fn rejected(scheduler: &Scheduler, error: E) -> Self {
		let deferred = Self::new(scheduler);
		let _ = deferred.try_reject(error);
		deferred
	}

	/// Current state, settled values never change
	pub fn status(&self) -> Status {
		self.state.borrow().status()
	}

	/// The settled outcome, `None` while pending
	pub fn settled(&self) -> Option<Result<T, E>> {
		match &*self.state.borrow() {
			State::Pending { .. } => None,
			State::Resolved(value) => Some(Ok(value.clone())),
			State::Rejected(error) => Some(Err(error.clone())),
		}
	}

	/// The scheduler observers of this value are dispatched through
	pub fn scheduler(&self) -> &Scheduler {
		&self.scheduler
	}

	/// Settles the value with `value`, if still pending. Later calls are ignored with a warning
	pub fn resolve(&self, value: T) {
		if let Err(status) = self.try_resolve(value) {
			tracing::warn!(%status, "tried to resolve a deferred value that already settled");
		}
	}

	/// Settles the value with `error`, if still pending. Later calls are ignored with a warning
	pub fn reject(&self, error: E) {
		if let Err(status) = self.try_reject(error) {
			tracing::warn!(%status, "tried to reject a deferred value that already settled");
		}
	}

	/// Resolves without warning, reporting the status that prevented settling
	pub(crate) fn try_resolve(&self, value: T) -> Result<(), Status> {
		let observers = {
			let mut state = self.state.borrow_mut();
			match &mut *state {
				State::Pending { on_resolve, .. } => {
					let observers = std::mem::take(on_resolve);
					// observer lists are dropped with the old state
					*state = State::Resolved(value.clone());
					observers
				}
				settled => return Err(settled.status()),
			}
		};

		tracing::trace!(observers = observers.len(), "resolved deferred value");
		for observer in observers {
			let value = value.clone();
			self.scheduler.schedule_later(move || observer(value));
		}

		Ok(())
	}

	/// Rejects without warning, reporting the status that prevented settling
	pub(crate) fn try_reject(&self, error: E) -> Result<(), Status> {
		let observers = {
			let mut state = self.state.borrow_mut();
			match &mut *state {
				State::Pending { on_reject, .. } => {
					let observers = std::mem::take(on_reject);
					*state = State::Rejected(error.clone());
					observers
				}
				settled => return Err(settled.status()),
			}
		};

		if observers.is_empty() && self.scheduler.config().report_unhandled_rejections {
			tracing::warn!("deferred value rejected while nothing observes its failure");
		}

		tracing::trace!(observers = observers.len(), "rejected deferred value");
		for observer in observers {
			let error = error.clone();
			self.scheduler.schedule_later(move || observer(error));
		}

		Ok(())
	}

	/// Registers one observer per outcome. Already settled values schedule the matching observer right
	/// away, still on a later turn
	pub(crate) fn observe(&self, on_resolve: OnResolve<T>, on_reject: OnReject<E>) {
		let settled = {
			let mut state = self.state.borrow_mut();
			match &mut *state {
				State::Pending { on_resolve: resolves, on_reject: rejects } => {
					resolves.push(on_resolve);
					rejects.push(on_reject);
					return;
				}
				State::Resolved(value) => Ok(value.clone()),
				State::Rejected(error) => Err(error.clone()),
			}
		};

		match settled {
			Ok(value) => self.scheduler.schedule_later(move || on_resolve(value)),
			Err(error) => self.scheduler.schedule_later(move || on_reject(error)),
		};
	}

	/// Chains a handler per outcome, returning a new value settled by whichever handler runs.
	///
	/// Handlers never run during this call. Their [`Outcome`] resolves, rejects, or makes the returned
	/// value follow another [`Thenable`].
	pub fn then<U, E2, F, G>(&self, on_success: F, on_failure: G) -> Deferred<U, E2>
	where
		U: Clone + 'static,
		E2: Clone + 'static,
		F: FnOnce(T) -> Outcome<U, E2> + 'static,
		G: FnOnce(E) -> Outcome<U, E2> + 'static,
	{
		let next = Deferred::new(&self.scheduler);

		let on_resolve = {
			let next = next.clone();
			Box::new(move |value| drive(on_success(value), &next))
		};
		let on_reject = {
			let next = next.clone();
			Box::new(move |error| drive(on_failure(error), &next))
		};

		self.observe(on_resolve, on_reject);
		next
	}

	/// Chains a success handler, failures are forwarded to the returned value unchanged
	pub fn and_then<U, F>(&self, on_success: F) -> Deferred<U, E>
	where
		U: Clone + 'static,
		F: FnOnce(T) -> Outcome<U, E> + 'static,
	{
		self.then(on_success, Outcome::Reject)
	}

	/// Chains a failure handler, successes are forwarded to the returned value unchanged
	pub fn or_else<E2, G>(&self, on_failure: G) -> Deferred<T, E2>
	where
		E2: Clone + 'static,
		G: FnOnce(E) -> Outcome<T, E2> + 'static,
	{
		self.then(Outcome::Resolve, on_failure)
	}

	/// Transforms the success value
	pub fn map<U, F>(&self, f: F) -> Deferred<U, E>
	where
		U: Clone + 'static,
		F: FnOnce(T) -> U + 'static,
	{
		self.and_then(move |value| Outcome::Resolve(f(value)))
	}

	/// Transforms the failure value
	pub fn map_err<E2, G>(&self, g: G) -> Deferred<T, E2>
	where
		E2: Clone + 'static,
		G: FnOnce(E) -> E2 + 'static,
	{
		self.or_else(move |error| Outcome::Reject(g(error)))
	}

	/// A [`Future`](std::future::Future) completing once this value settles. It does not turn the event loop
	pub fn into_future(&self) -> Settled<T, E> {
		let (sender, receiver) = oneshot::channel();
		let on_resolve = Rc::new(Cell::new(Some(sender)));
		let on_reject = Rc::clone(&on_resolve);

		// a dropped receiver just means nobody awaits the outcome anymore
		self.observe(
			Box::new(move |value| {
				if let Some(sender) = on_resolve.take() {
					let _ = sender.send(Ok(value));
				}
			}),
			Box::new(move |error| {
				if let Some(sender) = on_reject.take() {
					let _ = sender.send(Err(error));
				}
			}),
		);

		Settled::new(receiver)
	}
}

/// Applies a handler's decision to the derived value
fn drive<U: Clone + 'static, E: Clone + 'static>(outcome: Outcome<U, E>, next: &Deferred<U, E>) {
	match outcome {
		Outcome::Resolve(value) => next.resolve(value),
		Outcome::Reject(error) => next.reject(error),
		Outcome::Follow(thenable) => {
			let (on_resolve, on_reject) = (next.clone(), next.clone());
			thenable.subscribe(
				Box::new(move |value| on_resolve.resolve(value)),
				Box::new(move |error| on_reject.reject(error)),
			);
		}
	}
}

impl<T: Clone + 'static, E: Clone + 'static> Thenable<T, E> for Deferred<T, E> {
	fn subscribe(self: Box<Self>, on_resolve: Box<dyn FnOnce(T)>, on_reject: Box<dyn FnOnce(E)>) {
		self.observe(on_resolve, on_reject);
	}
}

impl<T, E> fmt::Debug for Deferred<T, E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Deferred").field("status", &self.state.borrow().status()).finish()
	}
}

/// Capability to resolve a [`Deferred`], handed to [`Deferred::with_initializer`]
pub struct Resolver<T, E> {
	deferred: Deferred<T, E>,
}

impl<T: Clone + 'static, E: Clone + 'static> Resolver<T, E> {
	/// See [`Deferred::resolve`]
	pub fn resolve(&self, value: T) {
		self.deferred.resolve(value);
	}
}

impl<T, E> Clone for Resolver<T, E> {
	fn clone(&self) -> Self {
		Self { deferred: self.deferred.clone() }
	}
}

/// Capability to reject a [`Deferred`], handed to [`Deferred::with_initializer`]
pub struct Rejecter<T, E> {
	deferred: Deferred<T, E>,
}

impl<T: Clone + 'static, E: Clone + 'static> Rejecter<T, E> {
	/// See [`Deferred::reject`]
	pub fn reject(&self, error: E) {
		self.deferred.reject(error);
	}
}

impl<T, E> Clone for Rejecter<T, E> {
	fn clone(&self) -> Self {
		Self { deferred: self.deferred.clone() }
	}
}
