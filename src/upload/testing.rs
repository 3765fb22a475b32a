//! Scriptable transport for tests

use super::errors::TransportError;
use super::strategy::{ProgressCallback, UploadHandle, UploadStrategy};
use super::types::{UploadFile, UploadOutcome};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use tokio::sync::oneshot;

type Reply = oneshot::Sender<Result<UploadOutcome, TransportError>>;

struct Call {
    file: UploadFile,
    on_progress: ProgressCallback,
    reply: Option<Reply>,
    cancels: Arc<AtomicUsize>,
}

/// Records every transfer and lets the test decide how each one ends
#[derive(Clone, Default)]
pub struct ManualStrategy {
    calls: Arc<Mutex<Vec<Call>>>,
    echo_cancel: bool,
}

impl ManualStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject with `Cancelled` as soon as `cancel()` is invoked, like a real
    /// transport whose request is torn down
    pub fn echoing_cancellation() -> Self {
        Self {
            echo_cancel: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn file_name(&self, index: usize) -> String {
        self.calls.lock().unwrap()[index].file.name().to_string()
    }

    pub fn cancel_count(&self, index: usize) -> usize {
        self.calls.lock().unwrap()[index].cancels.load(Ordering::SeqCst)
    }

    pub fn progress(&self, index: usize, loaded: u64, total: u64) {
        let on_progress = self.calls.lock().unwrap()[index].on_progress.clone();
        on_progress(loaded, total);
    }

    pub fn resolve(&self, index: usize, outcome: UploadOutcome) {
        self.reply(index, Ok(outcome));
    }

    pub fn reject(&self, index: usize, error: TransportError) {
        self.reply(index, Err(error));
    }

    pub async fn wait_for_calls(&self, count: usize) {
        for _ in 0..1000 {
            if self.call_count() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {} transport calls, saw {}", count, self.call_count());
    }

    fn reply(&self, index: usize, result: Result<UploadOutcome, TransportError>) {
        let reply = self.calls.lock().unwrap()[index].reply.take();
        if let Some(reply) = reply {
            let _ = reply.send(result);
        }
    }
}

impl UploadStrategy for ManualStrategy {
    fn upload(&self, file: &UploadFile, on_progress: ProgressCallback) -> UploadHandle {
        let (reply, receiver) = oneshot::channel();
        let cancels = Arc::new(AtomicUsize::new(0));

        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                file: file.clone(),
                on_progress,
                reply: Some(reply),
                cancels: cancels.clone(),
            });
            calls.len() - 1
        };

        let completion = async move { receiver.await.unwrap_or(Err(TransportError::Cancelled)) };

        let calls = self.calls.clone();
        let echo_cancel = self.echo_cancel;
        let cancel = move || {
            cancels.fetch_add(1, Ordering::SeqCst);
            if echo_cancel {
                let reply = calls.lock().unwrap()[index].reply.take();
                if let Some(reply) = reply {
                    let _ = reply.send(Err(TransportError::Cancelled));
                }
            }
        };

        UploadHandle::new(completion, cancel)
    }
}

/// Let spawned upload tasks run until `condition` holds
pub async fn settle<F: Fn() -> bool>(condition: F) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
