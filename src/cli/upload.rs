//! `upload` command: run the upload manager over the local-directory transport

use anyhow::{Context, Result};
use clap::Args;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::transport::LocalDirStrategy;
use crate::upload::{
    format_file_size, ConcurrencyLimit, UploadFile, UploadManager, UploadStrategy, UploaderEvent, UploaderOptions,
};

/// Upload files into a local directory
#[derive(Debug, Args)]
pub struct UploadCommand {
    /// Files or directories to upload; directories are walked recursively
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Destination directory
    #[arg(long)]
    pub dest: PathBuf,

    /// Accept list, e.g. ".pdf,image/*"
    #[arg(long)]
    pub accept: Option<String>,

    /// Largest accepted file in bytes
    #[arg(long)]
    pub max_size: Option<u64>,

    /// Most files to accept
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Transfers running at once (unlimited when omitted)
    #[arg(long)]
    pub concurrency: Option<usize>,
}

impl UploadCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let options = self.options(config);

        let local = LocalDirStrategy::new(&self.dest);
        let strategy: Box<dyn UploadStrategy> = match self.concurrency {
            Some(limit) => Box::new(ConcurrencyLimit::new(local, limit)),
            None => Box::new(local),
        };

        let manager = UploadManager::new(strategy, options).context("Failed to create upload manager")?;
        if let Some(constraints) = manager.describe() {
            println!("Accepting {}", constraints);
        }

        manager.add_callback(|event| match event {
            UploaderEvent::Progress { job } => {
                debug!("{}: {}%", job.file.name(), job.progress);
            }
            UploaderEvent::UploadCompleted { job, result } => {
                println!(
                    "✓ {} ({}) -> {}",
                    job.file.name(),
                    format_file_size(job.total),
                    result.url.as_deref().unwrap_or("-")
                );
            }
            UploaderEvent::UploadFailed { job, error } => {
                println!("✗ {}: {}", job.file.name(), error);
            }
            UploaderEvent::FilesChanged(_) => {}
        });

        let files = collect_files(&self.paths).await?;
        let offered = files.len();
        let accepted = manager.add_files(files).len();
        if accepted < offered {
            println!("Skipped {} of {} files", offered - accepted, offered);
        }

        manager.wait_until_idle().await;

        let summary = manager.summary();
        println!("{}", summary);

        if summary.failed > 0 {
            return Err(anyhow::anyhow!("{} uploads failed", summary.failed));
        }
        Ok(())
    }

    /// Configured uploader options with command-line flags applied on top
    fn options(&self, config: &Config) -> UploaderOptions {
        let mut options = config.uploader.clone();
        if let Some(accept) = &self.accept {
            options.accept = Some(accept.clone());
        }
        if let Some(max_size) = self.max_size {
            options.max_size = Some(max_size);
        }
        if let Some(max_files) = self.max_files {
            options.max_files = Some(max_files);
        }
        options.auto_upload = true;
        options.disabled = false;
        options
    }
}

/// Expand directories into the regular files beneath them. Walked files
/// keep their path relative to the walk root; a name already taken is skipped.
async fn collect_files(paths: &[PathBuf]) -> Result<Vec<UploadFile>> {
    let mut files = Vec::new();
    let mut names = HashSet::new();

    for (path, name) in expand_paths(paths) {
        if !names.insert(name.clone()) {
            warn!("Skipping {}: another file is already uploading as {}", path.display(), name);
            continue;
        }
        match UploadFile::from_path(&path).await {
            Ok(file) => files.push(file.with_name(name)),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    Ok(files)
}

/// Files to upload, each paired with its destination name
fn expand_paths(paths: &[PathBuf]) -> Vec<(PathBuf, String)> {
    let mut expanded = Vec::new();

    for path in paths {
        if path.is_dir() {
            let entries = WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("Error walking {}: {}", path.display(), e);
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file())
                .filter_map(|entry| {
                    let name = relative_name(entry.path().strip_prefix(path).ok()?)?;
                    Some((entry.into_path(), name))
                });
            expanded.extend(entries);
        } else if let Some(name) = path.file_name() {
            expanded.push((path.clone(), name.to_string_lossy().into_owned()));
        }
    }

    expanded
}

fn relative_name(relative: &Path) -> Option<String> {
    let parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
