//! Transport abstraction injected into the upload manager.
//!
//! A strategy starts one transfer per call and hands back a completion
//! future plus a cancellation function. The manager never performs I/O
//! itself.

use super::errors::TransportError;
use super::types::{UploadFile, UploadOutcome};
use futures::future::{BoxFuture, FutureExt};
use std::{future::Future, sync::Arc};
use tokio::sync::{Notify, Semaphore};

/// Progress observer, called with `(loaded, total)` bytes
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Requests that an in-flight transfer stop. Consumed on use.
pub type CancelHandle = Box<dyn FnOnce() + Send>;

/// Resolves once the transfer succeeds or fails
pub type Completion = BoxFuture<'static, Result<UploadOutcome, TransportError>>;

/// A started transfer
pub struct UploadHandle {
    pub completion: Completion,
    pub cancel: CancelHandle,
}

impl UploadHandle {
    pub fn new<F, C>(completion: F, cancel: C) -> Self
    where
        F: Future<Output = Result<UploadOutcome, TransportError>> + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        Self {
            completion: completion.boxed(),
            cancel: Box::new(cancel),
        }
    }
}

/// Trait for upload transports
pub trait UploadStrategy: Send + Sync + 'static {
    /// Begin uploading `file`, reporting progress through `on_progress`
    fn upload(&self, file: &UploadFile, on_progress: ProgressCallback) -> UploadHandle;
}

impl<S: UploadStrategy + ?Sized> UploadStrategy for Arc<S> {
    fn upload(&self, file: &UploadFile, on_progress: ProgressCallback) -> UploadHandle {
        (**self).upload(file, on_progress)
    }
}

impl UploadStrategy for Box<dyn UploadStrategy> {
    fn upload(&self, file: &UploadFile, on_progress: ProgressCallback) -> UploadHandle {
        (**self).upload(file, on_progress)
    }
}

/// Wraps a strategy so that at most `limit` transfers run at once.
///
/// The upload manager itself starts every accepted file immediately; callers
/// that need backpressure opt in by wrapping their transport in this type.
/// Queued transfers report nothing until a slot frees up, and cancelling a
/// queued transfer removes it from the queue.
pub struct ConcurrencyLimit<S> {
    inner: Arc<S>,
    permits: Arc<Semaphore>,
}

impl<S: UploadStrategy> ConcurrencyLimit<S> {
    pub fn new(inner: S, limit: usize) -> Self {
        Self {
            inner: Arc::new(inner),
            permits: Arc::new(Semaphore::new(limit.max(1))),
        }
    }

    /// Free transfer slots right now
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl<S: UploadStrategy> UploadStrategy for ConcurrencyLimit<S> {
    fn upload(&self, file: &UploadFile, on_progress: ProgressCallback) -> UploadHandle {
        let inner = self.inner.clone();
        let permits = self.permits.clone();
        let file = file.clone();
        let cancelled = Arc::new(Notify::new());
        let cancel_signal = cancelled.clone();

        let completion = async move {
            let _permit = tokio::select! {
                permit = permits.acquire_owned() => permit
                    .map_err(|_| TransportError::failed("Upload queue closed"))?,
                _ = cancelled.notified() => return Err(TransportError::Cancelled),
            };

            let handle = inner.upload(&file, on_progress);
            let cancel = handle.cancel;

            tokio::select! {
                result = handle.completion => result,
                _ = cancelled.notified() => {
                    cancel();
                    Err(TransportError::Cancelled)
                }
            }
        };

        // notify_one stores a permit, so a cancel that lands before the
        // future is first polled is still observed
        UploadHandle::new(completion, move || cancel_signal.notify_one())
    }
}
