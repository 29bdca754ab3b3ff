use thiserror::Error;

/// Failures of [`EventLoop`](crate::rt::EventLoop) driving methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
	/// The awaited deferred value is still pending, but no callback is left to settle it
	#[error("deferred value is still pending and the event loop has nothing left to dispatch")]
	Stalled,

	/// The configured [`turn_limit`](crate::config::Config::turn_limit) ran out
	#[error("event loop exceeded its limit of {limit} turns")]
	TurnLimit {
		/// The limit that was hit
		limit: usize,
	},
}
