use std::{future::Future, pin::Pin, task};

/// Future that stays pending until its [`Deferred`](crate::deferred::Deferred) settles.
///
/// Resolves to `None` if the deferred value was dropped while still pending. Polling doesn't turn the
/// [`EventLoop`](crate::rt::EventLoop), someone else has to.
pub struct Settled<T, E> {
	pub(crate) result_rx: oneshot::Receiver<Result<T, E>>,
}

impl<T, E> Settled<T, E> {
	pub(crate) fn new(result_rx: oneshot::Receiver<Result<T, E>>) -> Self {
		Self { result_rx }
	}
}

impl<T, E> Unpin for Settled<T, E> {}

impl<T, E> Future for Settled<T, E> {
	type Output = Option<Result<T, E>>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> task::Poll<Self::Output> {
		match Pin::new(&mut self.result_rx).poll(cx) {
			task::Poll::Ready(Ok(settled)) => task::Poll::Ready(Some(settled)),
			// every observer holding the sender was dropped unsettled
			task::Poll::Ready(Err(oneshot::RecvError)) => task::Poll::Ready(None),
			task::Poll::Pending => task::Poll::Pending,
		}
	}
}
