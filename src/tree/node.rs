use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use super::LoadError;

/// A file or directory in the loaded usage tree.
///
/// A node is a directory iff `children` is present (even when empty). A
/// directory's own `value` is never counted; its size is always the sum of
/// its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default)]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "deserialize_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    pub fn file(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
            children: None,
        }
    }

    pub fn dir(name: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            name: name.into(),
            value: None,
            children: Some(children),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.children.is_some()
    }

    /// Children of a directory, or an empty slice for a file.
    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Look up a direct child by name.
    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children().iter().find(|c| c.name == name)
    }

    /// Count every node in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children());
        }
        count
    }
}

/// Recursive byte size of a subtree.
///
/// Leaves contribute their `value` (missing counts as zero), directories the
/// sum of their children. Uses an explicit stack so very deep trees cannot
/// exhaust the call stack.
pub fn aggregate(node: &TreeNode) -> u64 {
    let mut total = 0u64;
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        match &current.children {
            Some(children) => stack.extend(children.iter()),
            None => total = total.saturating_add(current.value.unwrap_or(0)),
        }
    }
    total
}

/// Accept any JSON number for a byte count. Negative values clamp to zero
/// and fractions are truncated.
fn deserialize_bytes<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(raw.map(|n| match n.as_u64() {
        Some(bytes) => bytes,
        None => match n.as_f64() {
            Some(v) if v.is_finite() && v > 0.0 => v as u64,
            _ => 0,
        },
    }))
}

/// The immutable tree loaded once at startup, with its total size cached.
#[derive(Debug, Clone)]
pub struct TreeModel {
    root: TreeNode,
    total_size: u64,
}

impl TreeModel {
    pub fn new(root: TreeNode) -> Self {
        let total_size = aggregate(&root);
        Self { root, total_size }
    }

    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let root: TreeNode =
            serde_json::from_str(json).map_err(|source| LoadError::Parse { source })?;
        Ok(Self::new(root))
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, LoadError> {
        let root: TreeNode =
            serde_json::from_reader(reader).map_err(|source| LoadError::Parse { source })?;
        Ok(Self::new(root))
    }

    /// Load a tree document from disk.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::from_reader(BufReader::new(file))?;
        info!(
            path = %path.display(),
            nodes = model.root.node_count(),
            total_size = model.total_size,
            "loaded usage tree"
        );
        Ok(model)
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Names of the root's direct children, in document order.
    pub fn top_level_names(&self) -> impl Iterator<Item = &str> {
        self.root.children().iter().map(|c| c.name.as_str())
    }
}
