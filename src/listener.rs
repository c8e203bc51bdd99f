//! Callback-style delivery for callers that do not want to `.await`.
//!
//! Every operation in this crate is an `async fn` returning [`Result`]. For
//! fire-and-forget use, [`dispatch`] spawns the operation on the tokio
//! runtime and hands its outcome to a [`ResponseListener`]. The listener is
//! a required argument, so a failure always reaches someone.

use crate::errors::{Error, Result};
use std::future::Future;
use tokio::task::JoinHandle;

/// Receives exactly one of `on_success` or `on_failure`.
pub trait ResponseListener<T>: Send + 'static {
    fn on_success(self, value: T);
    fn on_failure(self, error: Error);
}

impl<T, F> ResponseListener<T> for F
where
    F: FnOnce(Result<T>) + Send + 'static,
{
    fn on_success(self, value: T) {
        self(Ok(value))
    }

    fn on_failure(self, error: Error) {
        self(Err(error))
    }
}

/// Listener assembled from a success closure and a failure closure.
pub struct Callbacks<S, F> {
    on_success: S,
    on_failure: F,
}

pub fn callbacks<T, S, F>(on_success: S, on_failure: F) -> Callbacks<S, F>
where
    S: FnOnce(T) + Send + 'static,
    F: FnOnce(Error) + Send + 'static,
{
    Callbacks {
        on_success,
        on_failure,
    }
}

impl<T, S, F> ResponseListener<T> for Callbacks<S, F>
where
    S: FnOnce(T) + Send + 'static,
    F: FnOnce(Error) + Send + 'static,
{
    fn on_success(self, value: T) {
        (self.on_success)(value)
    }

    fn on_failure(self, error: Error) {
        (self.on_failure)(error)
    }
}

/// Run `operation` in the background and report its outcome to `listener`.
///
/// Returns immediately. Must be called from within a tokio runtime.
pub fn dispatch<T, Fut, L>(operation: Fut, listener: L) -> JoinHandle<()>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    L: ResponseListener<T>,
{
    tokio::spawn(async move {
        match operation.await {
            Ok(value) => listener.on_success(value),
            Err(error) => listener.on_failure(error),
        }
    })
}
