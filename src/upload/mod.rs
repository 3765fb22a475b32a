//! Upload job management.
//!
//! [`UploadManager`] tracks a collection of jobs, each moving through
//! `idle -> uploading -> completed | error | aborted`. Transfers are
//! delegated to an injected [`UploadStrategy`].

pub mod accept;
pub mod errors;
pub mod events;
pub mod manager;
pub mod strategy;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use accept::{describe_constraints, format_file_size, AcceptList, AcceptPattern, FileFilter};
pub use errors::{TransportError, UploadError, UploadResult};
pub use events::{UploadSubscription, UploaderEvent};
pub use manager::{UploadManager, UploaderOptions};
pub use strategy::{CancelHandle, Completion, ConcurrencyLimit, ProgressCallback, UploadHandle, UploadStrategy};
pub use types::{
    guess_content_type, FileSource, JobId, JobSnapshot, JobStatus, UploadFile, UploadOutcome, UploadSummary,
};
