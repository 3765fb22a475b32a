//! Transport that "uploads" by copying into a local directory.
//!
//! Useful for the CLI and for exercising the manager against real I/O.
//! Each transfer writes to its own `.part` file and renames it into place
//! once complete, so a cancelled transfer never touches the destination.

use crate::upload::{
    FileSource, ProgressCallback, TransportError, UploadFile, UploadHandle, UploadOutcome, UploadStrategy,
};
use std::path::{Component, Path, PathBuf};
use tokio::{
    fs,
    io::{AsyncReadExt, AsyncWriteExt},
    sync::watch,
};
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Copies each file into `dest_dir`, reporting progress per chunk
#[derive(Debug, Clone)]
pub struct LocalDirStrategy {
    dest_dir: PathBuf,
    chunk_size: usize,
}

impl LocalDirStrategy {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Destination for `name`, which may contain relative directories.
    /// Names that would escape `dest_dir` are refused.
    fn target_path(&self, name: &str) -> Result<PathBuf, TransportError> {
        let invalid = || TransportError::failed(format!("Invalid file name: {}", name));

        let mut relative = PathBuf::new();
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                _ => return Err(invalid()),
            }
        }

        if relative.as_os_str().is_empty() {
            return Err(invalid());
        }
        Ok(self.dest_dir.join(relative))
    }
}

/// Hidden sibling of `target` owned by a single transfer
fn part_path(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.{}.part", file_name, Uuid::new_v4()))
}

struct CopyJob {
    target: PathBuf,
    part: PathBuf,
    chunk_size: usize,
    on_progress: ProgressCallback,
    cancelled: watch::Receiver<bool>,
}

impl CopyJob {
    fn check_cancelled(&self) -> Result<(), TransportError> {
        if *self.cancelled.borrow() {
            Err(TransportError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn run(&self, file: &UploadFile) -> Result<u64, TransportError> {
        self.check_cancelled()?;

        if let Some(parent) = self.target.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut output = fs::File::create(&self.part).await?;

        let written = match file.source() {
            FileSource::Memory(bytes) => {
                let total = bytes.len() as u64;
                let mut written = 0u64;
                (self.on_progress)(0, total);
                for chunk in bytes.chunks(self.chunk_size) {
                    self.check_cancelled()?;
                    output.write_all(chunk).await?;
                    written += chunk.len() as u64;
                    (self.on_progress)(written, total);
                    tokio::task::yield_now().await;
                }
                written
            }
            FileSource::Disk(path) => {
                let mut input = fs::File::open(path).await?;
                let total = input.metadata().await?.len();
                let mut buffer = vec![0u8; self.chunk_size];
                let mut written = 0u64;
                (self.on_progress)(0, total);
                loop {
                    self.check_cancelled()?;
                    let read = input.read(&mut buffer).await?;
                    if read == 0 {
                        break;
                    }
                    output.write_all(&buffer[..read]).await?;
                    written += read as u64;
                    (self.on_progress)(written.min(total), total);
                }
                written
            }
        };

        output.flush().await?;
        drop(output);

        self.check_cancelled()?;
        fs::rename(&self.part, &self.target).await?;
        Ok(written)
    }

    async fn finish(self, file: &UploadFile) -> Result<UploadOutcome, TransportError> {
        match self.run(file).await {
            Ok(bytes) => {
                debug!("Copied {} bytes to {}", bytes, self.target.display());
                Ok(UploadOutcome::with_url(format!("file://{}", self.target.display()))
                    .insert("bytes", bytes)
                    .insert("path", self.target.display().to_string()))
            }
            Err(err) => {
                // Only this transfer's partial file; the target may belong to a newer one
                let _ = fs::remove_file(&self.part).await;
                Err(err)
            }
        }
    }
}

impl UploadStrategy for LocalDirStrategy {
    fn upload(&self, file: &UploadFile, on_progress: ProgressCallback) -> UploadHandle {
        let (cancel_tx, cancelled) = watch::channel(false);
        let file = file.clone();
        let target = self.target_path(file.name());
        let chunk_size = self.chunk_size;

        let copy = async move {
            let target = target?;
            let job = CopyJob {
                part: part_path(&target),
                target,
                chunk_size,
                on_progress,
                cancelled,
            };
            job.finish(&file).await
        };

        UploadHandle::new(copy, move || {
            let _ = cancel_tx.send(true);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::{JobStatus, UploadManager, UploaderOptions};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<(u64, u64)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: ProgressCallback = Arc::new(move |loaded, total| sink.lock().unwrap().push((loaded, total)));
        (callback, seen)
    }

    #[tokio::test]
    async fn test_copies_memory_file_in_chunks() {
        let dest = TempDir::new().unwrap();
        let strategy = LocalDirStrategy::new(dest.path()).with_chunk_size(4);
        let (on_progress, seen) = recorder();

        let file = UploadFile::from_bytes("notes.txt", "text/plain", b"hello world".to_vec());
        let outcome = strategy.upload(&file, on_progress).completion.await.unwrap();

        let copied = fs::read(dest.path().join("notes.txt")).await.unwrap();
        assert_eq!(copied, b"hello world");
        assert_eq!(outcome.extra.get("bytes").and_then(|v| v.as_u64()), Some(11));
        assert!(outcome.url.unwrap().starts_with("file://"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&(0, 11)));
        assert_eq!(seen.last(), Some(&(11, 11)));
        assert_eq!(seen.len(), 4);
    }

    #[tokio::test]
    async fn test_copies_disk_file() {
        let source_dir = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let source = source_dir.path().join("data.json");
        fs::write(&source, br#"{"ok":true}"#).await.unwrap();

        let file = UploadFile::from_path(&source).await.unwrap();
        let (on_progress, _) = recorder();
        let strategy = LocalDirStrategy::new(dest.path());
        strategy.upload(&file, on_progress).completion.await.unwrap();

        let copied = fs::read_to_string(dest.path().join("data.json")).await.unwrap();
        assert_eq!(copied, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_cancel_removes_partial_file() {
        let dest = TempDir::new().unwrap();
        let strategy = LocalDirStrategy::new(dest.path());
        let (on_progress, _) = recorder();

        let file = UploadFile::from_bytes("big.bin", "application/octet-stream", vec![7u8; 1024]);
        let handle = strategy.upload(&file, on_progress);
        (handle.cancel)();

        let result = handle.completion.await;
        assert!(matches!(result, Err(TransportError::Cancelled)));
        assert!(!dest.path().join("big.bin").exists());
        assert!(dir_entries(dest.path()).is_empty());
    }

    #[tokio::test]
    async fn test_superseded_transfer_keeps_newer_output() {
        let dest = TempDir::new().unwrap();
        let slow = LocalDirStrategy::new(dest.path()).with_chunk_size(1);
        let fast = LocalDirStrategy::new(dest.path());

        let first = slow.upload(
            &UploadFile::from_bytes("a.bin", "application/octet-stream", vec![1u8; 64 * 1024]),
            recorder().0,
        );
        let first_task = tokio::spawn(first.completion);
        wait_for_part_file(dest.path()).await;

        let second = fast.upload(
            &UploadFile::from_bytes("a.bin", "application/octet-stream", b"second".to_vec()),
            recorder().0,
        );
        second.completion.await.unwrap();

        (first.cancel)();
        assert!(matches!(first_task.await.unwrap(), Err(TransportError::Cancelled)));

        let copied = fs::read(dest.path().join("a.bin")).await.unwrap();
        assert_eq!(copied, b"second");
        assert_eq!(dir_entries(dest.path()), vec!["a.bin".to_string()]);
    }

    #[tokio::test]
    async fn test_name_is_confined_to_destination() {
        let dest = TempDir::new().unwrap();
        let strategy = LocalDirStrategy::new(dest.path());
        assert_eq!(
            strategy.target_path("sub/a.txt").unwrap(),
            dest.path().join("sub").join("a.txt")
        );
        assert_eq!(strategy.target_path("./a.txt").unwrap(), dest.path().join("a.txt"));
        assert!(strategy.target_path("../../etc/passwd").is_err());
        assert!(strategy.target_path("/etc/passwd").is_err());
        assert!(strategy.target_path("..").is_err());
        assert!(strategy.target_path("").is_err());
    }

    #[tokio::test]
    async fn test_nested_names_do_not_collide() {
        let dest = TempDir::new().unwrap();
        let strategy = LocalDirStrategy::new(dest.path());

        let top = UploadFile::from_bytes("a.txt", "text/plain", b"top".to_vec());
        let nested = UploadFile::from_bytes("sub/a.txt", "text/plain", b"nested".to_vec());
        strategy.upload(&top, recorder().0).completion.await.unwrap();
        strategy.upload(&nested, recorder().0).completion.await.unwrap();

        assert_eq!(fs::read(dest.path().join("a.txt")).await.unwrap(), b"top");
        assert_eq!(fs::read(dest.path().join("sub").join("a.txt")).await.unwrap(), b"nested");
    }

    #[tokio::test]
    async fn test_manager_round_trip() {
        let dest = TempDir::new().unwrap();
        let manager = UploadManager::new(LocalDirStrategy::new(dest.path()), UploaderOptions::default()).unwrap();

        let ids = manager.add_files(vec![
            UploadFile::from_bytes("a.txt", "text/plain", b"aaa".to_vec()),
            UploadFile::from_bytes("b.txt", "text/plain", b"bbbb".to_vec()),
        ]);
        manager.wait_until_idle().await;

        for id in ids {
            let job = manager.get(id).unwrap();
            assert_eq!(job.status, JobStatus::Completed);
            assert_eq!(job.loaded, job.total);
        }
        assert!(dest.path().join("a.txt").exists());
        assert!(dest.path().join("b.txt").exists());
    }

    #[tokio::test]
    async fn test_abort_then_retry_keeps_output() {
        let dest = TempDir::new().unwrap();
        let strategy = LocalDirStrategy::new(dest.path()).with_chunk_size(1);
        let manager = UploadManager::new(strategy, UploaderOptions::default()).unwrap();

        let id = manager.add_files(vec![UploadFile::from_bytes(
            "a.bin",
            "application/octet-stream",
            vec![3u8; 4096],
        )])[0];
        wait_for_part_file(dest.path()).await;

        assert!(manager.abort_file(id));
        assert!(manager.retry_file(id));
        manager.wait_until_idle().await;

        let job = manager.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        // Give the aborted transfer time to observe its cancellation
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }

        let copied = fs::read(dest.path().join("a.bin")).await.unwrap();
        assert_eq!(copied.len(), 4096);
        assert_eq!(dir_entries(dest.path()), vec!["a.bin".to_string()]);
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    async fn wait_for_part_file(dir: &Path) {
        for _ in 0..1000 {
            if dir_entries(dir).iter().any(|name| name.ends_with(".part")) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
        panic!("no transfer started in {}", dir.display());
    }
}
