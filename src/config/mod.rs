use crate::pagination::PaginationOptions;
use crate::upload::{AcceptList, UploaderOptions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, str::FromStr};
use tokio::fs;
use tracing::{debug, info, warn};

/// Application configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Pagination defaults
    #[serde(default)]
    pub pagination: PaginationOptions,

    /// Uploader behaviour
    #[serde(default)]
    pub uploader: UploaderOptions,
}

impl Config {
    /// Apply `UIKIT_*` environment variables on top of the current values
    pub fn load_from_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Unparseable values are
    /// skipped.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(accept) = lookup("UIKIT_ACCEPT") {
            self.uploader.accept = Some(accept).filter(|accept| !accept.trim().is_empty());
        }

        if let Some(max_size) = parse_var(&lookup, "UIKIT_MAX_SIZE") {
            self.uploader.max_size = Some(max_size);
        }

        if let Some(max_files) = parse_var(&lookup, "UIKIT_MAX_FILES") {
            self.uploader.max_files = Some(max_files);
        }

        if let Some(auto_upload) = parse_var(&lookup, "UIKIT_AUTO_UPLOAD") {
            self.uploader.auto_upload = auto_upload;
        }

        if let Some(sibling_count) = parse_var(&lookup, "UIKIT_SIBLING_COUNT") {
            self.pagination.sibling_count = sibling_count;
        }

        if let Some(boundary_count) = parse_var(&lookup, "UIKIT_BOUNDARY_COUNT") {
            self.pagination.boundary_count = boundary_count;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let pagination = &self.pagination;

        if pagination.default_page == 0 {
            return Err(anyhow::anyhow!("pagination.default_page must be at least 1"));
        }

        if pagination.default_page_size == 0 {
            return Err(anyhow::anyhow!("pagination.default_page_size must be at least 1"));
        }

        if pagination.max_dots == 0 {
            return Err(anyhow::anyhow!("pagination.max_dots must be at least 1"));
        }

        if pagination.page_size_options.is_empty() {
            return Err(anyhow::anyhow!("pagination.page_size_options must not be empty"));
        }

        if let Some(accept) = &self.uploader.accept {
            AcceptList::parse(accept).context("uploader.accept is invalid")?;
        }

        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}: cannot parse {:?}", key, raw);
            None
        }
    }
}

/// Default configuration file location
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("uikit")
        .join("config.json")
}

/// Loads and persists [`Config`] as JSON
pub struct ConfigManager {
    config: Config,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new(config_path: PathBuf) -> Self {
        Self {
            config: Config::default(),
            config_path,
        }
    }

    /// Load configuration from file, writing defaults if it does not exist
    pub async fn load(&mut self) -> Result<()> {
        if !self.config_path.exists() {
            info!("Configuration file not found, creating default config");
            self.save().await?;
            return Ok(());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        self.config = serde_json::from_str(&content).context("Failed to parse configuration file")?;

        debug!("Loaded configuration from {:?}", self.config_path);
        Ok(())
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(&self.config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        debug!("Saved configuration to {:?}", self.config_path);
        Ok(())
    }

    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Get current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the manager, returning the configuration
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.config.validate()
    }
}
