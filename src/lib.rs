#![deny(missing_docs)]
#![doc = include_str!("../README.md")]


/// [`Config`](config::Config) for the event loop and its scheduler
pub mod config;
/// [`Deferred`](deferred::Deferred) values, their chaining and settling capabilities
pub mod deferred;
/// Errors returned while driving the [`EventLoop`](rt::EventLoop)
pub mod error;
/// [`Settled`](future::Settled), bridging deferred values into `std::future`
pub mod future;
/// Join combinators: [`all`](join::all) and [`race`](join::race)
pub mod join;
/// [`EventLoop`](rt::EventLoop) implementation
pub mod rt;
/// The deferral [`Scheduler`](scheduler::Scheduler) and its [`Token`](scheduler::Token)s
pub mod scheduler;

/// HTTP helper resolving [`Deferred`](deferred::Deferred) values with responses
#[cfg(feature = "http")]
pub mod http;

/// `%{...}` template interpolation with pluggable per-type formats
#[cfg(feature = "format")]
pub mod format;

pub use deferred::{Deferred, Outcome, Status};
pub use rt::EventLoop;
pub use scheduler::{Scheduler, Token};
