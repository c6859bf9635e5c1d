//! Awaitable handles for work running on the worker pool.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::sync::oneshot;

/// Failure of the worker itself, as opposed to the job's own error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("worker job panicked: {0}")]
    Panicked(String),

    #[error("worker pool dropped the job before it completed")]
    Closed,
}

/// A pending worker-pool job.
/// This wraps a oneshot receiver and implements Future so it can be awaited.
pub struct JobHandle<T> {
    receiver: oneshot::Receiver<Result<T, WorkerError>>,
}

impl<T> JobHandle<T> {
    /// Create a new `JobHandle` from a oneshot receiver
    #[must_use]
    pub fn new(receiver: oneshot::Receiver<Result<T, WorkerError>>) -> Self {
        Self { receiver }
    }
}

/// Implement Future so callers can simply .await the `JobHandle`
impl<T> Future for JobHandle<T> {
    type Output = Result<T, WorkerError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(WorkerError::Closed)),
            Poll::Pending => Poll::Pending,
        }
    }
}
