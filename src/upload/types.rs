//! Upload job records and the read-only snapshots handed to callers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};
use uuid::Uuid;

/// Opaque, unique identifier of an upload job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the bytes of a file live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Memory(Arc<[u8]>),
    Disk(PathBuf),
}

/// A file offered to the uploader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    name: String,
    content_type: String,
    size: u64,
    source: FileSource,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, size: u64, source: FileSource) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size,
            source,
        }
    }

    /// In-memory file; the size is the length of `bytes`
    pub fn from_bytes(name: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        let bytes: Arc<[u8]> = Arc::from(bytes);
        let size = bytes.len() as u64;
        Self::new(name, content_type, size, FileSource::Memory(bytes))
    }

    /// File on disk; the content type is guessed from the extension
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content_type = guess_content_type(&name);

        Ok(Self::new(name, content_type, metadata.len(), FileSource::Disk(path.to_path_buf())))
    }

    /// Same file under a different name, e.g. a path relative to a walk root
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }
}

/// Guess a MIME type from a file name, falling back to `application/octet-stream`
pub fn guess_content_type(name: &str) -> &'static str {
    let extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "zip" => "application/zip",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// Lifecycle state of an upload job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Idle,
    Uploading,
    Completed,
    Error,
    Aborted,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error | JobStatus::Aborted)
    }

    /// Only failed or aborted jobs may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, JobStatus::Error | JobStatus::Aborted)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Idle => "idle",
            JobStatus::Uploading => "uploading",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// What a transport reports on success: an optional URL plus any extra fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UploadOutcome {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            extra: serde_json::Map::new(),
        }
    }

    pub fn insert(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Read-only view of one job, as exposed outside the manager
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub id: JobId,
    pub file: UploadFile,
    pub status: JobStatus,
    /// Percentage, 0-100
    pub progress: u8,
    pub loaded: u64,
    pub total: u64,
    pub error: Option<String>,
    pub result: Option<UploadOutcome>,
    pub added_at: DateTime<Utc>,
}

/// Per-status counts and byte totals over a list of snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub idle: usize,
    pub uploading: usize,
    pub completed: usize,
    pub failed: usize,
    pub aborted: usize,
    pub loaded_bytes: u64,
    pub total_bytes: u64,
}

impl UploadSummary {
    pub fn from_snapshots(snapshots: &[JobSnapshot]) -> Self {
        snapshots.iter().fold(Self::default(), |mut summary, job| {
            match job.status {
                JobStatus::Idle => summary.idle += 1,
                JobStatus::Uploading => summary.uploading += 1,
                JobStatus::Completed => summary.completed += 1,
                JobStatus::Error => summary.failed += 1,
                JobStatus::Aborted => summary.aborted += 1,
            }
            summary.loaded_bytes += job.loaded;
            summary.total_bytes += job.total;
            summary
        })
    }

    pub fn job_count(&self) -> usize {
        self.idle + self.uploading + self.completed + self.failed + self.aborted
    }

    /// True when no job is waiting or in flight
    pub fn is_settled(&self) -> bool {
        self.idle == 0 && self.uploading == 0
    }
}

impl fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} completed, {} failed, {} aborted, {} in progress",
            self.completed,
            self.failed,
            self.aborted,
            self.idle + self.uploading
        )
    }
}
