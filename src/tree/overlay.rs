use std::collections::BTreeSet;

use tracing::debug;

use super::TreeNode;

/// Names of hidden top-level directories.
///
/// Only direct children of the root can ever enter the set; every mutator
/// takes the root so it can check membership itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityOverlay {
    hidden: BTreeSet<String>,
}

impl VisibilityOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the hidden state of a direct child of `root`.
    ///
    /// Returns `false` (and changes nothing) when `name` is not one of the
    /// root's children.
    pub fn toggle(&mut self, root: &TreeNode, name: &str) -> bool {
        if root.child(name).is_none() {
            debug!(name, "ignoring toggle for unknown top-level entry");
            return false;
        }

        if !self.hidden.remove(name) {
            self.hidden.insert(name.to_string());
        }
        debug!(name, hidden = self.hidden.contains(name), "toggled visibility");
        true
    }

    /// Make everything visible again.
    pub fn reset(&mut self) {
        self.hidden.clear();
        debug!("visibility reset");
    }

    /// Flip every top-level directory. Files at the root are never added.
    pub fn invert(&mut self, root: &TreeNode) {
        for child in root.children().iter().filter(|c| c.is_dir()) {
            if !self.hidden.remove(&child.name) {
                self.hidden.insert(child.name.clone());
            }
        }
        debug!(hidden = self.hidden.len(), "visibility inverted");
    }

    pub fn is_hidden(&self, name: &str) -> bool {
        self.hidden.contains(name)
    }

    /// Hidden names in sorted order.
    pub fn hidden(&self) -> impl Iterator<Item = &str> {
        self.hidden.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.hidden.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hidden.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> TreeNode {
        TreeNode::dir(
            "root",
            vec![
                TreeNode::dir("src", vec![TreeNode::file("main.rs", 10)]),
                TreeNode::dir("docs", vec![TreeNode::file("guide.md", 20)]),
                TreeNode::file("README", 5),
            ],
        )
    }

    #[test]
    fn test_toggle_is_its_own_inverse() {
        let root = root();
        let mut overlay = VisibilityOverlay::new();

        assert!(overlay.toggle(&root, "docs"));
        assert!(overlay.is_hidden("docs"));
        assert!(overlay.toggle(&root, "docs"));
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_toggle_unknown_name_is_noop() {
        let root = root();
        let mut overlay = VisibilityOverlay::new();

        assert!(!overlay.toggle(&root, "nope"));
        // Grandchildren are not top-level entries.
        assert!(!overlay.toggle(&root, "main.rs"));
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_invert_skips_root_files() {
        let root = root();
        let mut overlay = VisibilityOverlay::new();
        overlay.toggle(&root, "src");

        overlay.invert(&root);

        let hidden: Vec<_> = overlay.hidden().collect();
        assert_eq!(hidden, vec!["docs"]);
        assert!(!overlay.is_hidden("README"));
    }

    #[test]
    fn test_invert_twice_restores() {
        let root = root();
        let mut overlay = VisibilityOverlay::new();
        overlay.toggle(&root, "docs");
        overlay.toggle(&root, "README");
        let before = overlay.clone();

        overlay.invert(&root);
        overlay.invert(&root);

        assert_eq!(overlay, before);
    }

    #[test]
    fn test_reset_clears_everything() {
        let root = root();
        let mut overlay = VisibilityOverlay::new();
        overlay.invert(&root);
        assert_eq!(overlay.len(), 2);

        overlay.reset();
        assert!(overlay.is_empty());
    }
}
