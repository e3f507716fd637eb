//! Usage tree model, visibility overlay and the filtered view derived from them.

mod filter;
mod node;
mod overlay;

pub use filter::{filtered_tree, SizeSummary};
pub use node::{aggregate, TreeModel, TreeNode};
pub use overlay::VisibilityOverlay;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a usage tree document.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The document could not be read
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// The path that could not be read
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid tree JSON
    #[error("invalid tree document: {source}")]
    Parse {
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = LoadError::Io {
            path: PathBuf::from("/data/file_data.json"),
            source: io_err,
        };
        assert!(err.to_string().contains("/data/file_data.json"));
        assert!(err.to_string().contains("gone"));

        let json_err = serde_json::from_str::<TreeNode>("[").unwrap_err();
        let err = LoadError::Parse { source: json_err };
        assert!(err.to_string().starts_with("invalid tree document"));
    }
}
