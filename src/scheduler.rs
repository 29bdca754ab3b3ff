use std::{cell::RefCell, collections, fmt, rc::Rc, sync};

use crate::{config::Config, deferred::Deferred};

/// A callback waiting for its message to be delivered
pub(crate) type Callback = Box<dyn FnOnce()>;

/// Identifies one [`Scheduler::schedule_later`] call until its callback fires or is cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(u64);

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "deferral#{}", self.0)
	}
}

/// Pending callbacks, keyed by the token travelling through the mailbox
#[derive(Default)]
struct Registry {
	next: u64,
	pending: collections::HashMap<Token, Callback>,
}

struct Shared {
	registry: RefCell<Registry>,

	/// posting end of the event loop's message channel
	mailbox: sync::mpsc::Sender<Token>,

	config: Config,
}

/// Defers closures to a later turn of the [`EventLoop`](crate::rt::EventLoop) that created it.
///
/// Each scheduled closure gets a fresh [`Token`], which is posted to the loop's message channel.
/// When the loop delivers that message, the callback registered under the token runs. Delivery
/// follows posting order, so callbacks run first-in first-out. Cloning is cheap, clones share one registry.
#[derive(Clone)]
pub struct Scheduler {
	shared: Rc<Shared>,
}

impl Scheduler {
	pub(crate) fn new(mailbox: sync::mpsc::Sender<Token>, config: Config) -> Self {
		let shared = Shared { registry: RefCell::new(Registry::default()), mailbox, config };
		Self { shared: Rc::new(shared) }
	}

	/// Runs `callback` on a later turn of the event loop, never during the current call.
	///
	/// Arguments are passed by capturing them in the closure. A panicking callback is not caught,
	/// it unwinds out of [`EventLoop::turn`](crate::rt::EventLoop::turn).
	pub fn schedule_later<F: FnOnce() + 'static>(&self, callback: F) -> Token {
		let token = {
			let mut registry = self.shared.registry.borrow_mut();
			let token = Token(registry.next);
			registry.next += 1;
			token
		};

		// a closed mailbox means the event loop is gone, nobody would ever deliver the token
		if self.shared.mailbox.send(token).is_err() {
			tracing::debug!(%token, "event loop is gone, dropping callback");
			return token;
		}

		self.shared.registry.borrow_mut().pending.insert(token, Box::new(callback));
		tracing::trace!(%token, "scheduled callback");
		token
	}

	/// Prevents the callback for `token` from running. Returns `false` if it already ran, was
	/// already cancelled or never existed
	pub fn cancel(&self, token: Token) -> bool {
		let removed = self.shared.registry.borrow_mut().pending.remove(&token).is_some();

		if removed {
			tracing::trace!(%token, "cancelled callback");
		}

		removed
	}

	/// Number of callbacks still waiting to run
	pub fn pending(&self) -> usize {
		self.shared.registry.borrow().pending.len()
	}

	/// Settings shared with the owning event loop
	pub fn config(&self) -> &Config {
		&self.shared.config
	}

	/// Creates a pending [`Deferred`] bound to this scheduler
	pub fn deferred<T: Clone + 'static, E: Clone + 'static>(&self) -> Deferred<T, E> {
		Deferred::new(self)
	}

	/// Drops every pending callback, returning how many there were. Callbacks may hold handles to this
	/// scheduler, so they are released outside of the registry borrow
	pub(crate) fn clear(&self) -> usize {
		let mut cleared = 0;

		loop {
			let pending = std::mem::take(&mut self.shared.registry.borrow_mut().pending);
			if pending.is_empty() {
				return cleared;
			}

			cleared += pending.len();
			drop(pending);
		}
	}

	/// Removes the callback registered under a delivered token. Cancelled tokens yield `None`
	pub(crate) fn take(&self, token: Token) -> Option<Callback> {
		self.shared.registry.borrow_mut().pending.remove(&token)
	}
}

impl fmt::Debug for Scheduler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scheduler").field("pending", &self.pending()).field("config", &self.shared.config).finish()
	}
}
