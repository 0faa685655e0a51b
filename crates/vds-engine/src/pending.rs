use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{DataStoreError, DataStoreResult};

/// Completion handle for a queued request.
///
/// The request is already queued when this is returned, so dropping the
/// handle discards the result without cancelling the work. Resolves to
/// [`DataStoreError::Shutdown`] if the worker went away before replying.
#[must_use = "the result of a queued request is only observed by awaiting it"]
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<DataStoreResult<T>>,
}

impl<T> Pending<T> {
    pub(crate) fn new(rx: oneshot::Receiver<DataStoreResult<T>>) -> Self {
        Self { rx }
    }
}

impl<T> Future for Pending<T> {
    type Output = DataStoreResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(DataStoreError::Shutdown)))
    }
}
