//! Error types for the upload engine

use thiserror::Error;

/// Message some transports use instead of a dedicated cancellation error
pub const ABORTED_MESSAGE: &str = "Upload aborted";

/// Failure reported by an upload strategy's completion future
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Upload aborted")]
    Cancelled,

    #[error("{0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Whether this failure is the echo of a cancellation request
    pub fn is_cancellation(&self) -> bool {
        match self {
            TransportError::Cancelled => true,
            TransportError::Failed(message) => message == ABORTED_MESSAGE,
            TransportError::Io(err) => err.kind() == std::io::ErrorKind::Interrupted,
        }
    }

    /// Message stored on a failed job
    pub fn job_message(&self) -> String {
        match self {
            TransportError::Failed(message) if message.trim().is_empty() => "Upload failed".to_string(),
            other => other.to_string(),
        }
    }
}

/// Errors raised by the upload manager itself
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Upload manager must be created inside a Tokio runtime")]
    NoRuntime,

    #[error("Invalid accept pattern: {0:?}")]
    InvalidAcceptPattern(String),
}

pub type UploadResult<T> = Result<T, UploadError>;
