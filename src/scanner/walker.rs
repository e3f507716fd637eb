//! Directory walker using walkdir for traversal and rayon for size lookups.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::tree::TreeNode;

use super::ScanError;

/// Configuration options for directory scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// The root path to start scanning from
    pub root_path: PathBuf,
    /// Keep only files with this extension (case-insensitive, dot optional)
    pub extension: Option<String>,
    /// Maximum depth to traverse (None for unlimited)
    pub max_depth: Option<usize>,
    /// Glob patterns to exclude from scanning
    pub exclude_patterns: Vec<String>,
    /// If true, use apparent size (metadata.len()); if false, use disk blocks
    pub apparent_size: bool,
}

impl ScanOptions {
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            extension: None,
            max_depth: None,
            exclude_patterns: Vec::new(),
            apparent_size: true,
        }
    }

    pub fn with_extension(mut self, extension: Option<String>) -> Self {
        self.extension = extension
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty());
        self
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    pub fn with_apparent_size(mut self, apparent: bool) -> Self {
        self.apparent_size = apparent;
        self
    }
}

/// What the walk found at one path, in walk order.
enum Entry {
    File { path: PathBuf, size: u64 },
    Dir { path: PathBuf },
}

/// Walks a directory and produces a Tree Model.
pub struct Scanner {
    options: ScanOptions,
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Scan the root directory. Directories without any kept file are
    /// dropped, except the root itself.
    pub fn scan(&self) -> Result<TreeNode, ScanError> {
        let started = Instant::now();
        let root_path = &self.options.root_path;

        if !root_path.exists() {
            return Err(ScanError::PathNotFound {
                path: root_path.clone(),
            });
        }

        let metadata = std::fs::metadata(root_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                ScanError::PermissionDenied {
                    path: root_path.clone(),
                }
            } else {
                ScanError::IoError {
                    path: root_path.clone(),
                    source: e,
                }
            }
        })?;

        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root_path.clone(),
            });
        }

        let mut walker = WalkDir::new(root_path)
            .follow_links(false)
            .sort_by_file_name();
        if let Some(max_depth) = self.options.max_depth {
            walker = walker.max_depth(max_depth);
        }

        // walkdir is sequential; collect first, then size files in parallel.
        let entries: Vec<walkdir::DirEntry> = walker
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.should_exclude(e.path()))
            .filter_map(|result| match result {
                Ok(entry) => Some(entry),
                Err(err) => {
                    let path = err.path().map(|p| p.display().to_string()).unwrap_or_default();
                    warn!(path = %path, error = %err, "skipping unreadable entry");
                    None
                }
            })
            .collect();

        let entries: Vec<Entry> = entries
            .par_iter()
            .filter_map(|entry| {
                let file_type = entry.file_type();
                if file_type.is_symlink() {
                    None
                } else if file_type.is_dir() {
                    Some(Entry::Dir {
                        path: entry.path().to_path_buf(),
                    })
                } else if self.keeps_file(entry.path()) {
                    let size = self.file_size(entry.path())?;
                    Some(Entry::File {
                        path: entry.path().to_path_buf(),
                        size,
                    })
                } else {
                    None
                }
            })
            .collect();

        let root = build_tree(root_path, entries);
        info!(
            root = %root_path.display(),
            nodes = root.node_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scan complete"
        );
        Ok(root)
    }

    fn keeps_file(&self, path: &Path) -> bool {
        match &self.options.extension {
            None => true,
            Some(ext) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_ascii_lowercase())
                .is_some_and(|n| n.len() > ext.len() && n.ends_with(&format!(".{}", ext))),
        }
    }

    /// Size of a file based on the apparent_size option. Unreadable files
    /// are skipped.
    fn file_size(&self, path: &Path) -> Option<u64> {
        match std::fs::metadata(path) {
            Ok(metadata) => {
                if self.options.apparent_size {
                    Some(metadata.len())
                } else {
                    #[cfg(unix)]
                    {
                        use std::os::unix::fs::MetadataExt;
                        // blocks() returns 512-byte blocks
                        Some(metadata.blocks() * 512)
                    }
                    #[cfg(not(unix))]
                    {
                        Some(metadata.len())
                    }
                }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot stat file");
                None
            }
        }
    }

    /// Check if a path should be excluded based on exclude patterns.
    fn should_exclude(&self, path: &Path) -> bool {
        if self.options.exclude_patterns.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy();

        for pattern in &self.options.exclude_patterns {
            if pattern.contains('*') {
                if glob_match(pattern, &path_str) {
                    return true;
                }
            } else if path_str.contains(pattern.as_str()) {
                return true;
            }
        }

        false
    }
}

/// Assemble nested nodes from entries in walk (pre-)order.
///
/// In reverse pre-order every node comes after all of its descendants, so a
/// directory's children are complete by the time the directory is reached.
fn build_tree(root_path: &Path, entries: Vec<Entry>) -> TreeNode {
    let mut pending: HashMap<PathBuf, Vec<TreeNode>> = HashMap::new();

    for entry in entries.into_iter().rev() {
        let (path, node) = match entry {
            Entry::File { path, size } => {
                let node = TreeNode::file(file_name(&path), size);
                (path, node)
            }
            Entry::Dir { path } => {
                if path == root_path {
                    continue;
                }
                let Some(mut children) = pending.remove(&path) else {
                    continue;
                };
                children.reverse();
                let node = TreeNode::dir(file_name(&path), children);
                (path, node)
            }
        };
        if let Some(parent) = path.parent() {
            pending.entry(parent.to_path_buf()).or_default().push(node);
        }
    }

    let mut children = pending.remove(root_path).unwrap_or_default();
    children.reverse();
    let name = root_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root_path.display().to_string());
    TreeNode::dir(name, children)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Match `text` against a pattern where `*` stands for any run of characters.
/// The pattern may match anywhere inside `text`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let mut remaining = text;
    for part in pattern.split('*').filter(|p| !p.is_empty()) {
        match remaining.find(part) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }
    // A pattern not ending in `*` must match at the end.
    match pattern.rsplit('*').next() {
        Some(last) if !pattern.ends_with('*') && !last.is_empty() => text.ends_with(last),
        _ => true,
    }
}
