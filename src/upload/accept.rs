//! File acceptance rules: type patterns, size limit and human-readable hints

use super::errors::{UploadError, UploadResult};
use super::types::UploadFile;
use std::{fmt, str::FromStr};

/// One entry of an `accept` list such as `.pdf,image/*,application/json`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptPattern {
    /// `.pdf` - case-insensitive file name suffix
    Extension(String),
    /// `image/*` - MIME type prefix (stored without the `/*`)
    MimePrefix(String),
    /// `application/json` - exact MIME type
    Mime(String),
}

impl AcceptPattern {
    pub fn matches(&self, file: &UploadFile) -> bool {
        match self {
            AcceptPattern::Extension(ext) => file.name().to_lowercase().ends_with(ext),
            AcceptPattern::MimePrefix(base) => file.content_type().starts_with(base.as_str()),
            AcceptPattern::Mime(mime) => file.content_type() == mime,
        }
    }

    /// Short label used in descriptions: `pdf`, `image`, `application/json`
    pub fn label(&self) -> &str {
        match self {
            AcceptPattern::Extension(ext) => ext.trim_start_matches('.'),
            AcceptPattern::MimePrefix(base) => base,
            AcceptPattern::Mime(mime) => mime,
        }
    }
}

impl FromStr for AcceptPattern {
    type Err = UploadError;

    fn from_str(s: &str) -> UploadResult<Self> {
        let pattern = s.trim();

        if let Some(ext) = pattern.strip_prefix('.') {
            if ext.is_empty() {
                return Err(UploadError::InvalidAcceptPattern(s.to_string()));
            }
            return Ok(AcceptPattern::Extension(pattern.to_lowercase()));
        }

        if let Some(base) = pattern.strip_suffix("/*") {
            if base.is_empty() || base.contains('/') {
                return Err(UploadError::InvalidAcceptPattern(s.to_string()));
            }
            return Ok(AcceptPattern::MimePrefix(base.to_string()));
        }

        match pattern.split_once('/') {
            Some((kind, subtype)) if !kind.is_empty() && !subtype.is_empty() => {
                Ok(AcceptPattern::Mime(pattern.to_string()))
            }
            _ => Err(UploadError::InvalidAcceptPattern(s.to_string())),
        }
    }
}

impl fmt::Display for AcceptPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceptPattern::Extension(ext) => f.write_str(ext),
            AcceptPattern::MimePrefix(base) => write!(f, "{}/*", base),
            AcceptPattern::Mime(mime) => f.write_str(mime),
        }
    }
}

/// A parsed `accept` list. An empty list accepts every file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptList(Vec<AcceptPattern>);

impl AcceptList {
    /// Parse a comma-separated list; blank entries are skipped
    pub fn parse(accept: &str) -> UploadResult<Self> {
        accept
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(str::parse)
            .collect::<UploadResult<Vec<_>>>()
            .map(Self)
    }

    pub fn accepts(&self, file: &UploadFile) -> bool {
        self.0.is_empty() || self.0.iter().any(|pattern| pattern.matches(file))
    }

    pub fn patterns(&self) -> &[AcceptPattern] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AcceptList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&entries.join(","))
    }
}

/// Type and size filter applied before a file becomes a job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilter {
    pub accept: AcceptList,
    pub max_size: Option<u64>,
}

impl FileFilter {
    pub fn new(accept: AcceptList, max_size: Option<u64>) -> Self {
        Self { accept, max_size }
    }

    pub fn allows(&self, file: &UploadFile) -> bool {
        self.accept.accepts(file) && self.max_size.map_or(true, |max| file.size() <= max)
    }

    /// Hint shown in a dropzone, e.g. `up to 50 MB · pdf, image`
    pub fn describe(&self) -> Option<String> {
        describe_constraints(&self.accept, self.max_size)
    }
}

/// Human-readable size with base-1024 units and at most one decimal
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    let rounded = format!("{:.1}", size);
    let rounded = rounded.strip_suffix(".0").unwrap_or(&rounded);
    format!("{} {}", rounded, UNITS[unit_index])
}

/// Describe accept/size constraints, or `None` when there are none
pub fn describe_constraints(accept: &AcceptList, max_size: Option<u64>) -> Option<String> {
    let mut parts = Vec::new();

    if let Some(max) = max_size {
        parts.push(format!("up to {}", format_file_size(max)));
    }

    if !accept.is_empty() {
        let labels: Vec<&str> = accept.patterns().iter().map(AcceptPattern::label).collect();
        parts.push(labels.join(", "));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" · "))
    }
}
