//! Optional JSON settings file. Command-line flags override these values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::{LayoutKind, LayoutOptions, PackOptions, TreemapOptions, Viewport};

/// Errors that can occur while reading the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub width: f64,
    pub height: f64,
    pub layout: LayoutKind,
    pub depth: u32,
    pub show_labels: bool,
    pub pack: PackOptions,
    pub treemap: TreemapOptions,
}

impl Default for Config {
    fn default() -> Self {
        let viewport = Viewport::default();
        Self {
            width: viewport.width,
            height: viewport.height,
            layout: LayoutKind::default(),
            depth: 1,
            show_labels: true,
            pack: PackOptions::default(),
            treemap: TreemapOptions::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }

    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            pack: self.pack,
            treemap: self.treemap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.depth, 1);
        assert_eq!(config.layout, LayoutKind::CirclePack);
        assert_eq!(config.pack.padding, 3.0);
        assert_eq!(config.treemap.padding_top, 19.0);
        assert_eq!(config.treemap.padding_outer, 3.0);
        assert_eq!(config.treemap.padding_inner, 1.0);
        assert!(config.treemap.round);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spacemap.json");
        fs::write(&path, r#"{"layout": "treemap", "treemap": {"padding_top": 24}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.layout, LayoutKind::Treemap);
        assert_eq!(config.treemap.padding_top, 24.0);
        assert_eq!(config.treemap.padding_inner, 1.0);
        assert_eq!(config.width, 960.0);
    }

    #[test]
    fn test_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ depth: ").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load_or_default(Some(Path::new("/nonexistent/spacemap.json")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
        assert_eq!(Config::load_or_default(None).unwrap(), Config::default());
    }
}
