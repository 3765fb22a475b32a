//! Upload job manager.
//!
//! The manager exclusively owns the job collection. Every change goes
//! through a named transition on [`JobTable`] that checks the job's current
//! state first; callers only ever see [`JobSnapshot`]s.
//!
//! Each accepted file uploads independently and immediately. There is no
//! queue and no concurrency cap here; wrap the strategy in
//! [`ConcurrencyLimit`](super::strategy::ConcurrencyLimit) when backpressure
//! is needed.

use super::accept::{AcceptList, FileFilter};
use super::errors::{TransportError, UploadError, UploadResult};
use super::events::{UploadSubscription, UploaderEvent};
use super::strategy::{CancelHandle, ProgressCallback, UploadStrategy};
use super::types::{JobId, JobSnapshot, JobStatus, UploadFile, UploadOutcome, UploadSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak},
};
use tokio::{runtime::Handle, sync::broadcast};
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Uploader behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploaderOptions {
    /// Comma-separated accept list: `.pdf`, `image/*`, `application/json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,

    /// Largest accepted file in bytes; zero means no limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,

    /// Most jobs the collection may hold; zero means no limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_files: Option<usize>,

    /// Start uploading as soon as a file is accepted
    #[serde(default = "default_true")]
    pub auto_upload: bool,

    /// Accept more than one file per batch
    #[serde(default = "default_true")]
    pub multiple: bool,

    /// Ignore new files entirely
    #[serde(default)]
    pub disabled: bool,
}

impl Default for UploaderOptions {
    fn default() -> Self {
        Self {
            accept: None,
            max_size: None,
            max_files: None,
            auto_upload: true,
            multiple: true,
            disabled: false,
        }
    }
}

impl UploaderOptions {
    /// Build the type/size filter described by these options. A zero size
    /// limit means no limit.
    pub fn file_filter(&self) -> UploadResult<FileFilter> {
        let accept = match &self.accept {
            Some(accept) => AcceptList::parse(accept)?,
            None => AcceptList::default(),
        };
        Ok(FileFilter::new(accept, self.max_size.filter(|max| *max > 0)))
    }

    /// Most jobs the collection may hold; zero means no limit
    pub fn file_limit(&self) -> Option<usize> {
        self.max_files.filter(|max| *max > 0)
    }
}

fn default_true() -> bool {
    true
}

/// Internal job record. Unlike [`JobSnapshot`] it owns the cancel handle.
struct JobRecord {
    id: JobId,
    file: UploadFile,
    status: JobStatus,
    progress: u8,
    loaded: u64,
    total: u64,
    error: Option<String>,
    result: Option<UploadOutcome>,
    added_at: DateTime<Utc>,
    cancel: Option<CancelHandle>,
    /// Bumped on retry so callbacks from an earlier transfer are ignored
    attempt: u64,
}

impl JobRecord {
    fn new(file: UploadFile) -> Self {
        let total = file.size();
        Self {
            id: JobId::new(),
            file,
            status: JobStatus::Idle,
            progress: 0,
            loaded: 0,
            total,
            error: None,
            result: None,
            added_at: Utc::now(),
            cancel: None,
            attempt: 0,
        }
    }

    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            file: self.file.clone(),
            status: self.status,
            progress: self.progress,
            loaded: self.loaded,
            total: self.total,
            error: self.error.clone(),
            result: self.result.clone(),
            added_at: self.added_at,
        }
    }

    fn is_current(&self, attempt: u64) -> bool {
        self.attempt == attempt
    }
}

fn percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((loaded as f64 / total as f64) * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Ordered job collection with guarded transitions
#[derive(Default)]
struct JobTable {
    jobs: Vec<JobRecord>,
}

impl JobTable {
    fn len(&self) -> usize {
        self.jobs.len()
    }

    fn get(&self, id: JobId) -> Option<&JobRecord> {
        self.jobs.iter().find(|job| job.id == id)
    }

    fn get_mut(&mut self, id: JobId) -> Option<&mut JobRecord> {
        self.jobs.iter_mut().find(|job| job.id == id)
    }

    fn snapshots(&self) -> Vec<JobSnapshot> {
        self.jobs.iter().map(JobRecord::snapshot).collect()
    }

    fn insert(&mut self, records: Vec<JobRecord>) {
        self.jobs.extend(records);
    }

    /// idle -> uploading. Hands the cancel handle back if the job moved on.
    fn begin(&mut self, id: JobId, attempt: u64, cancel: CancelHandle) -> Result<(), CancelHandle> {
        match self.get_mut(id) {
            Some(job) if job.status == JobStatus::Idle && job.is_current(attempt) => {
                job.status = JobStatus::Uploading;
                job.cancel = Some(cancel);
                Ok(())
            }
            _ => Err(cancel),
        }
    }

    /// Overwrite progress for the current transfer of a live job
    fn progress(&mut self, id: JobId, attempt: u64, loaded: u64, total: u64) -> Option<JobSnapshot> {
        let job = self.get_mut(id)?;
        if !job.is_current(attempt) || !matches!(job.status, JobStatus::Idle | JobStatus::Uploading) {
            return None;
        }
        job.total = total;
        job.loaded = loaded.min(total);
        job.progress = percent(job.loaded, job.total);
        Some(job.snapshot())
    }

    /// uploading -> completed
    fn complete(&mut self, id: JobId, attempt: u64, outcome: UploadOutcome) -> Option<JobSnapshot> {
        let job = self.get_mut(id)?;
        if job.status != JobStatus::Uploading || !job.is_current(attempt) {
            return None;
        }
        job.status = JobStatus::Completed;
        job.progress = 100;
        job.loaded = job.total;
        job.result = Some(outcome);
        job.cancel = None;
        Some(job.snapshot())
    }

    /// uploading -> error
    fn fail(&mut self, id: JobId, attempt: u64, message: String) -> Option<JobSnapshot> {
        let job = self.get_mut(id)?;
        if job.status != JobStatus::Uploading || !job.is_current(attempt) {
            return None;
        }
        job.status = JobStatus::Error;
        job.error = Some(message);
        job.cancel = None;
        Some(job.snapshot())
    }

    /// uploading -> aborted. Returns the cancel handle to invoke.
    fn abort(&mut self, id: JobId) -> Option<CancelHandle> {
        let job = self.get_mut(id)?;
        if job.status != JobStatus::Uploading {
            return None;
        }
        job.status = JobStatus::Aborted;
        job.progress = 0;
        job.loaded = 0;
        job.cancel.take()
    }

    /// error | aborted -> idle. Returns the new attempt number.
    fn reset_for_retry(&mut self, id: JobId) -> Option<u64> {
        let job = self.get_mut(id)?;
        if !job.status.is_retryable() {
            return None;
        }
        job.status = JobStatus::Idle;
        job.progress = 0;
        job.loaded = 0;
        job.error = None;
        job.result = None;
        job.cancel = None;
        job.attempt += 1;
        Some(job.attempt)
    }

    /// Take the cancel handle of an uploading job, leaving it in place
    fn take_cancel(&mut self, id: JobId) -> Option<CancelHandle> {
        let job = self.get_mut(id)?;
        if job.status != JobStatus::Uploading {
            return None;
        }
        job.cancel.take()
    }

    fn remove(&mut self, id: JobId) -> Option<JobRecord> {
        let index = self.jobs.iter().position(|job| job.id == id)?;
        Some(self.jobs.remove(index))
    }
}

type Callback = Box<dyn Fn(&UploaderEvent) + Send + Sync>;

struct Shared<S> {
    strategy: S,
    options: UploaderOptions,
    filter: FileFilter,
    jobs: Mutex<JobTable>,
    callbacks: RwLock<Vec<Callback>>,
    events: broadcast::Sender<UploaderEvent>,
    runtime: Handle,
}

impl<S: UploadStrategy> Shared<S> {
    fn jobs(&self) -> MutexGuard<'_, JobTable> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: UploaderEvent) {
        {
            let callbacks = self.callbacks.read().unwrap_or_else(PoisonError::into_inner);
            for callback in callbacks.iter() {
                callback(&event);
            }
        }
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn emit_files_changed(&self) {
        let snapshots = self.jobs().snapshots();
        self.emit(UploaderEvent::FilesChanged(snapshots));
    }

    fn record_progress(&self, id: JobId, attempt: u64, loaded: u64, total: u64) {
        let snapshot = self.jobs().progress(id, attempt, loaded, total);
        if let Some(job) = snapshot {
            self.emit(UploaderEvent::Progress { job });
            self.emit_files_changed();
        }
    }

    fn finish(&self, id: JobId, attempt: u64, result: Result<UploadOutcome, TransportError>) {
        match result {
            Ok(outcome) => {
                let snapshot = self.jobs().complete(id, attempt, outcome.clone());
                match snapshot {
                    Some(job) => {
                        info!("Upload completed: {} ({})", job.file.name(), id);
                        self.emit_files_changed();
                        self.emit(UploaderEvent::UploadCompleted { job, result: outcome });
                    }
                    None => debug!("Ignoring completion for inactive job {}", id),
                }
            }
            Err(err) if err.is_cancellation() => {
                // The abort or removal path already settled this job
                debug!("Transfer for job {} ended by cancellation", id);
            }
            Err(err) => {
                let message = err.job_message();
                let snapshot = self.jobs().fail(id, attempt, message.clone());
                match snapshot {
                    Some(job) => {
                        warn!("Upload failed: {} ({}): {}", job.file.name(), id, message);
                        self.emit_files_changed();
                        self.emit(UploaderEvent::UploadFailed { job, error: message });
                    }
                    None => debug!("Ignoring failure for inactive job {}: {}", id, message),
                }
            }
        }
    }

    fn start(self: &Arc<Self>, id: JobId) -> bool {
        let (file, attempt) = {
            let jobs = self.jobs();
            match jobs.get(id) {
                Some(job) if job.status == JobStatus::Idle => (job.file.clone(), job.attempt),
                _ => return false,
            }
        };

        let weak: Weak<Self> = Arc::downgrade(self);
        let on_progress: ProgressCallback = Arc::new(move |loaded, total| {
            if let Some(shared) = weak.upgrade() {
                shared.record_progress(id, attempt, loaded, total);
            }
        });

        debug!("Starting upload: {} ({})", file.name(), id);
        let handle = self.strategy.upload(&file, on_progress);

        let began = self.jobs().begin(id, attempt, handle.cancel);
        if let Err(cancel) = began {
            // Removed or aborted while the transport was starting
            cancel();
            return false;
        }
        self.emit_files_changed();

        let shared = self.clone();
        let completion = handle.completion;
        self.runtime.spawn(async move {
            let result = completion.await;
            shared.finish(id, attempt, result);
        });

        true
    }
}

/// Manages a collection of upload jobs over an injected transport
pub struct UploadManager<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for UploadManager<S> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<S> fmt::Debug for UploadManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadManager")
            .field("options", &self.shared.options)
            .finish_non_exhaustive()
    }
}

impl<S: UploadStrategy> UploadManager<S> {
    /// Create a manager. Must be called from within a Tokio runtime, which
    /// is where transfer completions will be awaited.
    pub fn new(strategy: S, options: UploaderOptions) -> UploadResult<Self> {
        let runtime = Handle::try_current().map_err(|_| UploadError::NoRuntime)?;
        let filter = options.file_filter()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            shared: Arc::new(Shared {
                strategy,
                options,
                filter,
                jobs: Mutex::new(JobTable::default()),
                callbacks: RwLock::new(Vec::new()),
                events,
                runtime,
            }),
        })
    }

    /// Add an event callback. Callbacks run synchronously right after the
    /// change they describe and must not register further callbacks.
    pub fn add_callback<F>(&self, callback: F)
    where
        F: Fn(&UploaderEvent) + Send + Sync + 'static,
    {
        self.shared
            .callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(callback));
    }

    /// Subscribe to events through a channel
    pub fn subscribe(&self) -> UploadSubscription {
        UploadSubscription::new(self.shared.events.subscribe())
    }

    pub fn options(&self) -> &UploaderOptions {
        &self.shared.options
    }

    /// Dropzone hint derived from the accept list and size limit
    pub fn describe(&self) -> Option<String> {
        self.shared.filter.describe()
    }

    /// Offer files to the uploader.
    ///
    /// Files failing the type or size filter, and files beyond `max_files`,
    /// are dropped without a trace. Returns the ids of the jobs created, in
    /// input order.
    pub fn add_files(&self, files: Vec<UploadFile>) -> Vec<JobId> {
        let options = &self.shared.options;
        if options.disabled {
            debug!("Uploader disabled, ignoring {} files", files.len());
            return Vec::new();
        }

        let offered = files.len();
        let batch_limit = if options.multiple { usize::MAX } else { 1 };
        let validated: Vec<UploadFile> = files
            .into_iter()
            .take(batch_limit)
            .filter(|file| self.shared.filter.allows(file))
            .collect();

        let ids: Vec<JobId> = {
            let mut jobs = self.shared.jobs();
            let available = options
                .file_limit()
                .map_or(usize::MAX, |max| max.saturating_sub(jobs.len()));
            let records: Vec<JobRecord> = validated.into_iter().take(available).map(JobRecord::new).collect();
            let ids = records.iter().map(|job| job.id).collect();
            jobs.insert(records);
            ids
        };

        debug!("Accepted {} of {} offered files", ids.len(), offered);
        if ids.is_empty() {
            return ids;
        }

        self.shared.emit_files_changed();

        if options.auto_upload {
            for id in &ids {
                self.shared.start(*id);
            }
        }

        ids
    }

    /// Start the transfer for an idle job. Returns whether it started.
    pub fn start_upload(&self, id: JobId) -> bool {
        self.shared.start(id)
    }

    /// Start every idle job, returning how many started
    pub fn upload_all(&self) -> usize {
        let idle: Vec<JobId> = self
            .shared
            .jobs()
            .jobs
            .iter()
            .filter(|job| job.status == JobStatus::Idle)
            .map(|job| job.id)
            .collect();

        idle.into_iter().filter(|id| self.shared.start(*id)).count()
    }

    /// Remove a job, cancelling its transfer if one is running
    pub fn remove_file(&self, id: JobId) -> bool {
        let (removed, cancel) = {
            let mut jobs = self.shared.jobs();
            let cancel = jobs.take_cancel(id);
            (jobs.remove(id), cancel)
        };

        if let Some(cancel) = cancel {
            cancel();
        }

        match removed {
            Some(job) => {
                info!("Removed upload: {} ({})", job.file.name(), id);
                self.shared.emit_files_changed();
                true
            }
            None => false,
        }
    }

    /// Restart a failed or aborted job from zero
    pub fn retry_file(&self, id: JobId) -> bool {
        let attempt = self.shared.jobs().reset_for_retry(id);
        match attempt {
            Some(attempt) => {
                debug!("Retrying upload {} (attempt {})", id, attempt);
                self.shared.emit_files_changed();
                self.shared.start(id)
            }
            None => false,
        }
    }

    /// Abort an uploading job. Whatever the transport reports afterwards is
    /// ignored.
    pub fn abort_file(&self, id: JobId) -> bool {
        let cancel = {
            let mut jobs = self.shared.jobs();
            if jobs.get(id).map(|job| job.status) != Some(JobStatus::Uploading) {
                return false;
            }
            jobs.abort(id)
        };

        if let Some(cancel) = cancel {
            cancel();
        }

        info!("Aborted upload {}", id);
        self.shared.emit_files_changed();
        true
    }

    /// Snapshot of every job in insertion order
    pub fn files(&self) -> Vec<JobSnapshot> {
        self.shared.jobs().snapshots()
    }

    pub fn get(&self, id: JobId) -> Option<JobSnapshot> {
        self.shared.jobs().get(id).map(JobRecord::snapshot)
    }

    pub fn summary(&self) -> UploadSummary {
        UploadSummary::from_snapshots(&self.files())
    }

    /// Wait until no job is uploading
    pub async fn wait_until_idle(&self) {
        let mut events = self.subscribe();
        loop {
            if self.summary().uploading == 0 {
                return;
            }
            if events.recv().await.is_none() {
                return;
            }
        }
    }
}
