use std::{collections, sync};

use crate::{
	config::{Config, ConfigError},
	deferred::Deferred,
	error::Error,
	scheduler::{Scheduler, Token},
};

/// A minimal single-threaded event loop, the host every [`Scheduler`] posts its messages to
pub struct EventLoop {
	/// queue of tokens posted by the scheduler
	mailbox: sync::mpsc::Receiver<Token>,

	/// tokens pulled out of the mailbox for the current turn, but not dispatched yet
	backlog: collections::VecDeque<Token>,

	scheduler: Scheduler,
}

impl EventLoop {
	/// Instantiate a new EventLoop with the default [`Config`]
	pub fn new() -> Self {
		Self::build(Config::default())
	}

	/// Instantiate a new EventLoop, rejecting configurations that fail [`Config::validate`]
	pub fn with_config(config: Config) -> Result<Self, ConfigError> {
		config.validate()?;
		Ok(Self::build(config))
	}

	fn build(config: Config) -> Self {
		let (sender, mailbox) = sync::mpsc::channel();
		let scheduler = Scheduler::new(sender, config);

		Self { mailbox, backlog: collections::VecDeque::new(), scheduler }
	}

	/// Handle used to defer callbacks and create deferred values on this loop
	pub fn scheduler(&self) -> &Scheduler {
		&self.scheduler
	}

	/// Delivers every message posted before this call, returning how many callbacks ran.
	///
	/// Messages posted by the callbacks themselves are left for the next turn.
	pub fn turn(&mut self) -> usize {
		self.backlog.extend(self.mailbox.try_iter());

		let mut dispatched = 0;
		for _ in 0..self.backlog.len() {
			let Some(token) = self.backlog.pop_front() else { break };

			// cancelled tokens still travel through the mailbox, they just find nothing registered
			if let Some(callback) = self.scheduler.take(token) {
				tracing::trace!(%token, "dispatching callback");
				callback();
				dispatched += 1;
			}
		}

		dispatched
	}

	/// Turns the loop until no callback is pending, returning the number of turns taken
	pub fn run(&mut self) -> Result<usize, Error> {
		let mut turns = 0;

		while self.scheduler.pending() > 0 {
			self.check_limit(turns)?;
			self.turn();
			turns += 1;
		}

		tracing::debug!(turns, "event loop is idle");
		Ok(turns)
	}

	/// Blocks execution, continuously turning the loop and waiting for `deferred` to settle
	pub fn block_on<T: Clone + 'static, E: Clone + 'static>(
		&mut self,
		deferred: &Deferred<T, E>,
	) -> Result<Result<T, E>, Error> {
		let mut turns = 0;

		loop {
			if let Some(settled) = deferred.settled() {
				return Ok(settled);
			}

			if self.scheduler.pending() == 0 {
				tracing::debug!(turns, "nothing left to dispatch, deferred value can't settle");
				return Err(Error::Stalled);
			}

			self.check_limit(turns)?;
			self.turn();
			turns += 1;
		}
	}

	fn check_limit(&self, turns: usize) -> Result<(), Error> {
		match self.scheduler.config().turn_limit {
			Some(limit) if turns >= limit => Err(Error::TurnLimit { limit }),
			_ => Ok(()),
		}
	}
}

impl Drop for EventLoop {
	fn drop(&mut self) {
		// pending callbacks may own handles to the scheduler, which would keep the registry alive forever
		let cleared = self.scheduler.clear();
		if cleared > 0 {
			tracing::debug!(cleared, "dropped callbacks that never ran");
		}
	}
}

impl Default for EventLoop {
	fn default() -> Self {
		Self::new()
	}
}
