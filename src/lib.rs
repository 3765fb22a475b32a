//! Headless engines behind two UI components: a pagination range calculator
//! with its state controller, and an upload job manager driven by a
//! pluggable transport.

pub mod cli;
pub mod config;
pub mod pagination;
pub mod transport;
pub mod upload;
pub mod version;

pub use pagination::{compute_range, dot_window, PageToken, PaginationController, PaginationOptions};
pub use upload::{UploadManager, UploadStrategy, UploaderOptions};
