//! The single owner of view state: overlay, depth bound, layout kind and
//! viewport. Every mutation goes through here and bumps a generation counter
//! so a renderer can tell stale frames from current ones.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::format::format_mb;
use crate::layout::{parse_segment, Layout, LayoutKind, LayoutOptions, Viewport};
use crate::tree::{aggregate, filtered_tree, SizeSummary, TreeModel, TreeNode, VisibilityOverlay};
use crate::ui::Command;

/// One top-level directory row of the visibility checklist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub hidden: bool,
    pub size: u64,
}

impl DirectoryEntry {
    pub fn size_mb(&self) -> String {
        format_mb(self.size)
    }
}

/// Side-panel facts about the selected node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionDetails {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
    pub size_mb: String,
    /// Direct children, for directories.
    pub item_count: Option<usize>,
}

/// One row of the selected directory's nested listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingEntry {
    pub name: String,
    /// Nesting level below the selected directory (direct children = 0).
    pub level: usize,
    pub size: u64,
    pub size_mb: String,
}

/// A rendered view: layout output plus the size figures shown beside it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub generation: u64,
    pub depth_bound: u32,
    pub viewport: Viewport,
    pub show_labels: bool,
    pub layout: Layout,
    pub summary: SizeSummary,
}

/// Outcome of applying a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// State changed; re-render.
    Changed,
    /// Nothing to redraw.
    Unchanged,
    /// The caller asked for a render without changing anything.
    Render,
    Help,
    Quit,
}

pub struct Session {
    model: TreeModel,
    overlay: VisibilityOverlay,
    depth_bound: u32,
    kind: LayoutKind,
    viewport: Viewport,
    options: LayoutOptions,
    show_labels: bool,
    selected: Option<String>,
    generation: u64,
}

impl Session {
    pub fn new(model: TreeModel) -> Self {
        Self::with_config(model, &Config::default())
    }

    pub fn with_config(model: TreeModel, config: &Config) -> Self {
        Self {
            model,
            overlay: VisibilityOverlay::new(),
            depth_bound: config.depth,
            kind: config.layout,
            viewport: config.viewport(),
            options: config.layout_options(),
            show_labels: config.show_labels,
            selected: None,
            generation: 0,
        }
    }

    pub fn overlay(&self) -> &VisibilityOverlay {
        &self.overlay
    }

    pub fn depth_bound(&self) -> u32 {
        self.depth_bound
    }

    pub fn layout_kind(&self) -> LayoutKind {
        self.kind
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn show_labels(&self) -> bool {
        self.show_labels
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn bump(&mut self) {
        self.generation += 1;
    }

    /// Hide or show a top-level entry. Unknown names change nothing.
    pub fn toggle(&mut self, name: &str) -> bool {
        let changed = self.overlay.toggle(self.model.root(), name);
        if changed {
            self.bump();
        }
        changed
    }

    pub fn reset(&mut self) {
        self.overlay.reset();
        self.bump();
    }

    pub fn invert(&mut self) {
        self.overlay.invert(self.model.root());
        self.bump();
    }

    /// Set the maximum displayed depth. Zero or negative shows the root only.
    pub fn set_depth_bound(&mut self, depth: i64) {
        self.depth_bound = depth.clamp(0, u32::MAX as i64) as u32;
        debug!(depth_bound = self.depth_bound, "depth bound changed");
        self.bump();
    }

    pub fn set_layout_kind(&mut self, kind: LayoutKind) {
        self.kind = kind;
        self.bump();
    }

    pub fn toggle_layout_kind(&mut self) -> LayoutKind {
        self.set_layout_kind(self.kind.toggled());
        self.kind
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.bump();
    }

    pub fn toggle_labels(&mut self) -> bool {
        self.show_labels = !self.show_labels;
        self.bump();
        self.show_labels
    }

    /// Select a node by its layout path. Unknown paths clear the selection.
    pub fn select(&mut self, path: &str) -> bool {
        let found = self.find_in_filtered(path).is_some();
        self.selected = found.then(|| path.to_string());
        found
    }

    /// Select the deepest node drawn at viewport point `(x, y)` in the
    /// current frame.
    pub fn pick(&mut self, x: f64, y: f64) -> Option<String> {
        let frame = self.render();
        let path = frame.layout.node_at(x, y)?.path.clone();
        self.select(&path).then_some(path)
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The tree as currently visible.
    pub fn filtered(&self) -> TreeNode {
        filtered_tree(&self.model, &self.overlay)
    }

    pub fn summary(&self) -> SizeSummary {
        SizeSummary::compute(&self.model, &self.overlay)
    }

    /// Top-level directories that have content, in document order.
    pub fn directory_entries(&self) -> Vec<DirectoryEntry> {
        self.model
            .root()
            .children()
            .iter()
            .filter(|c| !c.children().is_empty())
            .map(|c| DirectoryEntry {
                name: c.name.clone(),
                hidden: self.overlay.is_hidden(&c.name),
                size: aggregate(c),
            })
            .collect()
    }

    /// Lay out the visible tree with the current settings.
    pub fn render(&self) -> Frame {
        let filtered = self.filtered();
        let summary = SizeSummary::new(aggregate(&filtered), self.model.total_size());
        let layout = self.kind.layout(&filtered, self.depth_bound, self.viewport, &self.options);

        info!(
            generation = self.generation,
            kind = %self.kind,
            placed = layout.nodes.len(),
            visible = summary.visible,
            "rendered frame"
        );

        Frame {
            generation: self.generation,
            depth_bound: self.depth_bound,
            viewport: self.viewport,
            show_labels: self.show_labels,
            layout,
            summary,
        }
    }

    /// Whether no mutation happened since `frame` was rendered.
    pub fn is_current(&self, frame: &Frame) -> bool {
        frame.generation == self.generation
    }

    pub fn selection_details(&self) -> Option<SelectionDetails> {
        let path = self.selected.as_deref()?;
        let node = self.find_in_filtered(path)?;
        let size = aggregate(&node);
        Some(SelectionDetails {
            name: node.name.clone(),
            path: path.to_string(),
            is_dir: node.is_dir(),
            size,
            size_mb: format_mb(size),
            item_count: node.children.as_ref().map(Vec::len),
        })
    }

    /// Nested contents of the selected directory, each level largest first.
    pub fn selection_listing(&self) -> Vec<ListingEntry> {
        let Some(node) = self.selected.as_deref().and_then(|p| self.find_in_filtered(p)) else {
            return Vec::new();
        };
        let mut entries = Vec::new();
        collect_listing(&node, 0, &mut entries);
        entries
    }

    /// Resolve a layout path (escaped names, `#n` suffixes for repeated
    /// names) against the visible tree.
    fn find_in_filtered(&self, path: &str) -> Option<TreeNode> {
        let filtered = self.filtered();
        let mut segments = path.split('/');
        if parse_segment(segments.next()?) != (filtered.name.clone(), 0) {
            return None;
        }

        let mut current = &filtered;
        for segment in segments {
            let (name, occurrence) = parse_segment(segment);
            current = current
                .children()
                .iter()
                .filter(|c| c.name == name)
                .nth(occurrence)?;
        }
        Some(current.clone())
    }

    /// Apply a parsed text command.
    pub fn handle_command(&mut self, cmd: Command) -> CommandOutcome {
        match cmd {
            Command::Toggle(name) => {
                if self.toggle(&name) {
                    CommandOutcome::Changed
                } else {
                    CommandOutcome::Unchanged
                }
            }
            Command::Reset => {
                self.reset();
                CommandOutcome::Changed
            }
            Command::Invert => {
                self.invert();
                CommandOutcome::Changed
            }
            Command::Depth(depth) => {
                self.set_depth_bound(depth);
                CommandOutcome::Changed
            }
            Command::Layout(Some(kind)) => {
                self.set_layout_kind(kind);
                CommandOutcome::Changed
            }
            Command::Layout(None) => {
                self.toggle_layout_kind();
                CommandOutcome::Changed
            }
            Command::Labels => {
                self.toggle_labels();
                CommandOutcome::Changed
            }
            Command::Select(path) => {
                if self.select(&path) {
                    CommandOutcome::Changed
                } else {
                    CommandOutcome::Unchanged
                }
            }
            Command::Pick(x, y) => match self.pick(x, y) {
                Some(_) => CommandOutcome::Changed,
                None => CommandOutcome::Unchanged,
            },
            Command::ClearSelection => {
                self.clear_selection();
                CommandOutcome::Changed
            }
            Command::Resize(width, height) => {
                self.set_viewport(Viewport::new(width, height));
                CommandOutcome::Changed
            }
            Command::Render => CommandOutcome::Render,
            Command::Help => CommandOutcome::Help,
            Command::Quit => CommandOutcome::Quit,
        }
    }
}

fn collect_listing(node: &TreeNode, level: usize, out: &mut Vec<ListingEntry>) {
    let mut children: Vec<(&TreeNode, u64)> = node.children().iter().map(|c| (c, aggregate(c))).collect();
    children.sort_by(|a, b| b.1.cmp(&a.1));

    for (child, size) in children {
        out.push(ListingEntry {
            name: child.name.clone(),
            level,
            size,
            size_mb: format_mb(size),
        });
        if child.is_dir() {
            collect_listing(child, level + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Geometry;

    fn session() -> Session {
        let model = TreeModel::new(TreeNode::dir(
            "root",
            vec![
                TreeNode::dir("src", vec![TreeNode::file("a.txt", 1024)]),
                TreeNode::dir(
                    "docs",
                    vec![
                        TreeNode::file("b.txt", 2048),
                        TreeNode::dir("img", vec![TreeNode::file("logo.png", 4096)]),
                    ],
                ),
                TreeNode::dir("empty", vec![]),
                TreeNode::file("README", 100),
            ],
        ));
        Session::new(model)
    }

    #[test]
    fn test_toggle_updates_summary_and_generation() {
        let mut s = session();
        let g0 = s.generation();
        assert_eq!(s.summary().visible, 7268);

        assert!(s.toggle("docs"));
        assert_eq!(s.summary().visible, 1124);
        assert!(s.generation() > g0);

        let g1 = s.generation();
        assert!(!s.toggle("nope"));
        assert_eq!(s.generation(), g1);
    }

    #[test]
    fn test_stale_frames_are_detected() {
        let mut s = session();
        let frame = s.render();
        assert!(s.is_current(&frame));

        s.toggle("src");
        assert!(!s.is_current(&frame));
        let fresh = s.render();
        assert!(s.is_current(&fresh));
    }

    #[test]
    fn test_depth_bound_clamps_to_root_only() {
        let mut s = session();
        s.set_depth_bound(-4);
        assert_eq!(s.depth_bound(), 0);

        let frame = s.render();
        assert_eq!(frame.layout.nodes.len(), 1);
        assert_eq!(frame.layout.nodes[0].depth, 0);
    }

    #[test]
    fn test_depth_measured_after_filtering() {
        let mut s = session();
        s.set_depth_bound(2);
        s.toggle("src");
        let frame = s.render();
        let logo = frame.layout.find_by_path("root/docs/img");
        assert_eq!(logo.map(|n| n.depth), Some(2));
        assert!(frame.layout.find_by_path("root/src").is_none());
    }

    #[test]
    fn test_all_hidden_renders_empty() {
        let model = TreeModel::new(TreeNode::dir(
            "root",
            vec![
                TreeNode::dir("a", vec![TreeNode::file("x", 1)]),
                TreeNode::dir("b", vec![TreeNode::file("y", 2)]),
            ],
        ));
        let mut s = Session::new(model);
        s.invert();

        let frame = s.render();
        assert!(frame.layout.is_empty());
        assert_eq!(frame.summary.visible, 0);
        assert_eq!(frame.summary.percentage, 0.0);
    }

    #[test]
    fn test_directory_entries_skip_files_and_empty_dirs() {
        let mut s = session();
        s.toggle("docs");
        let entries = s.directory_entries();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["src", "docs"]);
        assert!(entries[1].hidden);
        assert_eq!(entries[1].size, 6144);
        assert_eq!(entries[1].size_mb(), "0.01MB");
    }

    #[test]
    fn test_selection_details_and_listing() {
        let mut s = session();
        assert!(s.select("root/docs"));

        let details = s.selection_details().unwrap();
        assert!(details.is_dir);
        assert_eq!(details.size, 6144);
        assert_eq!(details.item_count, Some(2));

        let listing = s.selection_listing();
        let rows: Vec<_> = listing.iter().map(|e| (e.name.as_str(), e.level)).collect();
        assert_eq!(rows, vec![("img", 0), ("logo.png", 1), ("b.txt", 0)]);
    }

    #[test]
    fn test_select_hidden_or_unknown_fails() {
        let mut s = session();
        s.toggle("docs");
        assert!(!s.select("root/docs"));
        assert!(!s.select("elsewhere/src"));
        assert!(s.selected().is_none());
        assert!(s.selection_listing().is_empty());
    }

    #[test]
    fn test_handle_command() {
        let mut s = session();
        assert_eq!(s.handle_command(Command::Toggle("src".into())), CommandOutcome::Changed);
        assert_eq!(s.handle_command(Command::Toggle("zzz".into())), CommandOutcome::Unchanged);
        assert_eq!(s.handle_command(Command::Layout(None)), CommandOutcome::Changed);
        assert_eq!(s.layout_kind(), LayoutKind::Treemap);
        assert_eq!(s.handle_command(Command::Depth(3)), CommandOutcome::Changed);
        assert_eq!(s.depth_bound(), 3);
        assert!(!s.overlay().is_empty());
        s.handle_command(Command::Reset);
        assert!(s.overlay().is_empty());
        assert_eq!(s.handle_command(Command::Quit), CommandOutcome::Quit);
    }

    #[test]
    fn test_labels_toggle() {
        let mut s = session();
        assert!(s.show_labels());
        assert!(!s.toggle_labels());
        assert!(!s.render().show_labels);
    }

    #[test]
    fn test_select_resolves_escaped_and_repeated_names() {
        let model = TreeModel::new(TreeNode::dir(
            "root",
            vec![
                TreeNode::dir("a", vec![TreeNode::file("x", 3)]),
                TreeNode::dir("a", vec![TreeNode::file("y", 2)]),
                TreeNode::dir("a#1", vec![TreeNode::file("z", 1)]),
                TreeNode::file("50%/off", 1),
            ],
        ));
        let mut s = Session::new(model);

        assert!(s.select("root/a#1"));
        assert_eq!(s.selection_details().unwrap().size, 2);

        assert!(s.select("root/a%231"));
        let details = s.selection_details().unwrap();
        assert_eq!(details.name, "a#1");
        assert_eq!(details.size, 1);

        assert!(s.select("root/50%25%2Foff"));
        assert_eq!(s.selection_details().unwrap().name, "50%/off");
        assert!(!s.select("root/a#2"));
    }

    #[test]
    fn test_pick_selects_deepest_node_under_point() {
        let mut s = session();
        s.set_layout_kind(LayoutKind::Treemap);
        s.set_depth_bound(3);
        let frame = s.render();
        let logo = frame.layout.find_by_path("root/docs/img/logo.png").unwrap();
        let Geometry::Rect { x0, y0, x1, y1 } = logo.geometry else {
            panic!("treemap places rects");
        };

        let picked = s.pick((x0 + x1) / 2.0, (y0 + y1) / 2.0);
        assert_eq!(picked.as_deref(), Some("root/docs/img/logo.png"));
        assert_eq!(s.selected(), Some("root/docs/img/logo.png"));

        assert_eq!(s.handle_command(Command::Pick(-10.0, -10.0)), CommandOutcome::Unchanged);
        assert_eq!(s.selected(), Some("root/docs/img/logo.png"));
    }
}
