use std::{collections::BTreeMap, fmt, rc::Rc};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
	deferred::{Deferred, Rejecter, Resolver},
	scheduler::Scheduler,
};

/// Request headers, sorted by name
pub type Headers = BTreeMap<String, String>;

/// HTTP verbs the [`Client`] issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
}

impl fmt::Display for Method {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let msg = match self {
			Method::Get => "GET",
			Method::Post => "POST",
		};

		fmt::Display::fmt(msg, f)
	}
}

/// A request handed to a [`Transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
	/// Verb to issue
	pub method: Method,
	/// Target URL, passed through untouched
	pub url: String,
	/// Headers to send
	pub headers: Headers,
	/// Encoded body, `None` for `GET`
	pub body: Option<String>,
}

/// What a [`Transport`] received, before status classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
	/// Numeric status code
	pub status: u16,
	/// Reason phrase
	pub status_text: String,
	/// Response text
	pub body: String,
}

/// A successful (2xx) response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
	/// Numeric status code, always within `200..300`
	pub status_code: u16,
	/// Reason phrase
	pub status_text: String,
	/// Response text
	pub body: String,
}

impl Response {
	/// Decodes the body as JSON
	pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
		serde_json::from_str(&self.body).map_err(|e| HttpError::Decode(e.to_string()))
	}
}

/// Why a request's deferred value was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
	/// The server answered outside of `200..300`
	#[error("request failed with status {status_code} {status_text}")]
	Status {
		/// Numeric status code
		status_code: u16,
		/// Reason phrase
		status_text: String,
	},
	/// The transport couldn't complete the exchange
	#[error("transport error: {0}")]
	Transport(String),
	/// The request body couldn't be serialized
	#[error("failed to encode request body: {0}")]
	Encode(String),
	/// The response body isn't the expected JSON
	#[error("failed to decode response body: {0}")]
	Decode(String),
}

/// Completion handle of one request. Dropping it unused leaves the request's deferred value pending
pub struct Reply {
	resolve: Resolver<Response, HttpError>,
	reject: Rejecter<Response, HttpError>,
}

impl Reply {
	/// Completes the request with what the server answered
	pub fn respond(self, raw: RawResponse) {
		let RawResponse { status, status_text, body } = raw;

		if (200..300).contains(&status) {
			self.resolve.resolve(Response { status_code: status, status_text, body });
		} else {
			tracing::debug!(status, %status_text, "request failed");
			self.reject.reject(HttpError::Status { status_code: status, status_text });
		}
	}

	/// Completes the request with a transport failure
	pub fn fail(self, reason: impl Into<String>) {
		let reason = reason.into();
		tracing::debug!(%reason, "transport failed");
		self.reject.reject(HttpError::Transport(reason));
	}
}

/// Carries [`Request`]s to a server. Implementations may complete the [`Reply`] synchronously or keep
/// it around and complete it on a later turn
pub trait Transport {
	/// Starts the exchange
	fn send(&self, request: Request, reply: Reply);
}

impl<Tr: Transport + ?Sized> Transport for Rc<Tr> {
	fn send(&self, request: Request, reply: Reply) {
		(**self).send(request, reply)
	}
}

/// Issues requests whose results are delivered as [`Deferred`] values
pub struct Client<Tr> {
	scheduler: Scheduler,
	transport: Tr,
	default_headers: Headers,
}

impl<Tr: Transport> Client<Tr> {
	/// Creates a client sending through `transport`
	pub fn new(scheduler: &Scheduler, transport: Tr) -> Self {
		Self { scheduler: scheduler.clone(), transport, default_headers: Headers::new() }
	}

	/// Adds a header sent with every request, unless a call overrides it
	#[must_use]
	pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		set_header(&mut self.default_headers, &name.into(), value);
		self
	}

	/// Issues a `GET`
	pub fn get(&self, url: &str, headers: Headers) -> Deferred<Response, HttpError> {
		let request = Request { method: Method::Get, url: url.to_owned(), headers: self.merge(headers), body: None };
		self.dispatch(request)
	}

	/// Issues a `POST` with `body` encoded as JSON
	pub fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B, headers: Headers) -> Deferred<Response, HttpError> {
		let body = match serde_json::to_string(body) {
			Ok(body) => body,
			Err(e) => return Deferred::rejected(&self.scheduler, HttpError::Encode(e.to_string())),
		};

		let mut headers = self.merge(headers);
		set_header(&mut headers, "Content-Type", "application/json");

		let request = Request { method: Method::Post, url: url.to_owned(), headers, body: Some(body) };
		self.dispatch(request)
	}

	fn merge(&self, headers: Headers) -> Headers {
		let mut merged = self.default_headers.clone();
		for (name, value) in headers {
			set_header(&mut merged, &name, value);
		}
		merged
	}

	fn dispatch(&self, request: Request) -> Deferred<Response, HttpError> {
		tracing::trace!(method = %request.method, url = %request.url, "sending request");

		Deferred::with_initializer(&self.scheduler, |resolve, reject| {
			self.transport.send(request, Reply { resolve, reject });
		})
	}
}

/// Header names are case-insensitive, an existing entry under any casing is replaced
fn set_header(headers: &mut Headers, name: &str, value: impl Into<String>) {
	headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
	headers.insert(name.to_owned(), value.into());
}
