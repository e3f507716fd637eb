use serde::Serialize;
use tracing::debug;

use super::{aggregate, TreeModel, TreeNode, VisibilityOverlay};

/// Build an independent copy of the model with hidden top-level directories
/// removed. Files at the root always stay. The model itself is untouched.
pub fn filtered_tree(model: &TreeModel, overlay: &VisibilityOverlay) -> TreeNode {
    let root = model.root();

    let children = root.children.as_ref().map(|children| {
        children
            .iter()
            .filter(|child| !(child.is_dir() && overlay.is_hidden(&child.name)))
            .cloned()
            .collect::<Vec<_>>()
    });

    let filtered = TreeNode {
        name: root.name.clone(),
        value: root.value,
        children,
    };

    debug!(
        kept = filtered.children().len(),
        total = root.children().len(),
        "filtered top-level entries"
    );
    filtered
}

/// Visible versus total bytes for the current overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizeSummary {
    pub visible: u64,
    pub total: u64,
    /// Share of `total` still visible, in `[0, 100]`.
    pub percentage: f64,
}

impl SizeSummary {
    pub fn new(visible: u64, total: u64) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            (100.0 * visible as f64 / total as f64).clamp(0.0, 100.0)
        };
        Self {
            visible,
            total,
            percentage,
        }
    }

    pub fn compute(model: &TreeModel, overlay: &VisibilityOverlay) -> Self {
        let visible = aggregate(&filtered_tree(model, overlay));
        Self::new(visible, model.total_size())
    }
}
