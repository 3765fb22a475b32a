//! Notifications published by the upload manager

use super::types::{JobSnapshot, UploadOutcome};
use tokio::sync::broadcast;
use tracing::warn;

/// Events that can occur in the upload manager
#[derive(Debug, Clone)]
pub enum UploaderEvent {
    /// The job collection changed; carries the full snapshot list
    FilesChanged(Vec<JobSnapshot>),

    /// A transport reported progress for one job
    Progress { job: JobSnapshot },

    /// A job reached `completed`
    UploadCompleted { job: JobSnapshot, result: UploadOutcome },

    /// A job reached `error`
    UploadFailed { job: JobSnapshot, error: String },
}

impl UploaderEvent {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            UploaderEvent::FilesChanged(_) => "files_changed",
            UploaderEvent::Progress { .. } => "progress",
            UploaderEvent::UploadCompleted { .. } => "upload_completed",
            UploaderEvent::UploadFailed { .. } => "upload_failed",
        }
    }
}

/// Receiver side of the manager's event channel
pub struct UploadSubscription {
    receiver: broadcast::Receiver<UploaderEvent>,
}

impl UploadSubscription {
    pub(crate) fn new(receiver: broadcast::Receiver<UploaderEvent>) -> Self {
        Self { receiver }
    }

    /// Receive the next event. Returns `None` once the manager is gone.
    ///
    /// A subscriber that falls behind skips the missed events; the next
    /// `FilesChanged` carries the complete state again.
    pub async fn recv(&mut self) -> Option<UploaderEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Upload subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<UploaderEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
