use thiserror::Error;

/// Run time settings of an [`EventLoop`](crate::rt::EventLoop) and its [`Scheduler`](crate::scheduler::Scheduler)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
	/// Upper bound on the turns a single `run` or `block_on` call may take. `None` is unbounded
	pub turn_limit: Option<usize>,

	/// Log a warning when a deferred value is rejected while nothing observes its failure
	pub report_unhandled_rejections: bool,
}

impl Config {
	/// Bounds every `run` / `block_on` call to `limit` turns
	#[must_use]
	pub fn with_turn_limit(mut self, limit: usize) -> Self {
		self.turn_limit = Some(limit);
		self
	}

	/// Enables or disables the unhandled rejection warning
	#[must_use]
	pub fn report_unhandled_rejections(mut self, enabled: bool) -> Self {
		self.report_unhandled_rejections = enabled;
		self
	}

	/// Checks the configuration for values the event loop can't honour
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.turn_limit == Some(0) {
			return Err(ConfigError::ZeroTurnLimit);
		}

		Ok(())
	}
}

/// Error returned by [`Config::validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
	/// A turn limit of zero would never dispatch anything
	#[error("turn limit must be at least 1")]
	ZeroTurnLimit,
}
