//! Builds a Tree Model from a directory on disk.

mod walker;

pub use walker::{ScanOptions, Scanner};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a scan before it starts. Problems with individual
/// entries are logged and skipped instead.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("path not found: {path}")]
    PathNotFound { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scan root exists but is a file.
    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },
}
