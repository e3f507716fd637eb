//! Space-filling layouts over a filtered usage tree.
//!
//! Both layouts share one contract: given a filtered tree, a depth bound and
//! a viewport, produce the placed nodes (root included) whose depth does not
//! exceed the bound, in pre-order over the size-sorted hierarchy. A tree
//! with no root children yields no nodes at all.

mod hierarchy;
mod pack;
mod treemap;

pub use hierarchy::{display_path, parse_segment};
use hierarchy::Hierarchy;
use indextree::NodeId;

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tree::TreeNode;

/// Which space-partitioning algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
    /// Nested circles, parents enclosing their children.
    #[default]
    CirclePack,
    /// Squarified treemap with label bands.
    Treemap,
}

impl LayoutKind {
    pub fn toggled(self) -> Self {
        match self {
            LayoutKind::CirclePack => LayoutKind::Treemap,
            LayoutKind::Treemap => LayoutKind::CirclePack,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LayoutKind::CirclePack => "circle-pack",
            LayoutKind::Treemap => "treemap",
        }
    }

    /// Lay out `tree`, keeping nodes with `depth <= depth_bound`.
    pub fn layout(
        self,
        tree: &TreeNode,
        depth_bound: u32,
        viewport: Viewport,
        options: &LayoutOptions,
    ) -> Layout {
        let started = Instant::now();

        if tree.children().is_empty() {
            debug!(kind = self.display_name(), "nothing visible to lay out");
            return Layout::empty(self);
        }

        let hierarchy = Hierarchy::build(tree);
        let geometry = match self {
            LayoutKind::CirclePack => pack::pack(&hierarchy, viewport, &options.pack),
            LayoutKind::Treemap => treemap::tile(&hierarchy, viewport, &options.treemap),
        };

        let nodes: Vec<PlacedNode> = hierarchy
            .preorder()
            .iter()
            .filter_map(|&node_id| {
                let node = hierarchy.get_node(node_id)?;
                if node.depth > depth_bound {
                    return None;
                }
                Some(PlacedNode {
                    id: node.id.clone(),
                    name: node.name.clone(),
                    path: node.path.clone(),
                    depth: node.depth,
                    height: node.height,
                    value: node.value,
                    is_dir: node.is_dir,
                    child_count: hierarchy.children(node_id).count(),
                    geometry: geometry[node.index],
                })
            })
            .collect();

        debug!(
            kind = self.display_name(),
            depth_bound,
            placed = nodes.len(),
            total = hierarchy.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "layout pass complete"
        );

        Layout { kind: self, nodes }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Drawing surface in abstract pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Negative or non-finite dimensions collapse to zero.
    pub fn new(width: f64, height: f64) -> Self {
        let clean = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        Self {
            width: clean(width),
            height: clean(height),
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(960.0, 960.0)
    }
}

/// Circle-packing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackOptions {
    /// Gap kept between sibling circles and their parent's rim.
    pub padding: f64,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self { padding: 3.0 }
    }
}

/// Treemap parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreemapOptions {
    /// Inset on the left, right and bottom of every directory.
    pub padding_outer: f64,
    /// Inset on top of every directory, reserved for its label.
    pub padding_top: f64,
    /// Gap between sibling rectangles.
    pub padding_inner: f64,
    /// Snap coordinates to whole pixels.
    pub round: bool,
}

impl Default for TreemapOptions {
    fn default() -> Self {
        Self {
            padding_outer: 3.0,
            padding_top: 19.0,
            padding_inner: 1.0,
            round: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub pack: PackOptions,
    pub treemap: TreemapOptions,
}

/// Layout-specific shape of a placed node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Geometry {
    Circle { cx: f64, cy: f64, r: f64 },
    Rect { x0: f64, y0: f64, x1: f64, y1: f64 },
}

impl Geometry {
    pub fn contains(&self, px: f64, py: f64) -> bool {
        match *self {
            Geometry::Circle { cx, cy, r } => {
                let (dx, dy) = (px - cx, py - cy);
                dx * dx + dy * dy <= r * r
            }
            Geometry::Rect { x0, y0, x1, y1 } => px >= x0 && px < x1 && py >= y0 && py < y1,
        }
    }
}

/// A hierarchy node with its on-screen geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedNode {
    pub id: String,
    pub name: String,
    pub path: String,
    pub depth: u32,
    pub height: u32,
    pub value: u64,
    pub is_dir: bool,
    pub child_count: usize,
    pub geometry: Geometry,
}

/// Result of one layout pass.
#[derive(Debug, Clone)]
pub struct Layout {
    pub kind: LayoutKind,
    pub nodes: Vec<PlacedNode>,
}

impl Layout {
    fn empty(kind: LayoutKind) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find_by_path(&self, path: &str) -> Option<&PlacedNode> {
        self.nodes.iter().find(|n| n.path == path)
    }

    /// Deepest placed node under a point, for hit-testing.
    pub fn node_at(&self, x: f64, y: f64) -> Option<&PlacedNode> {
        self.nodes
            .iter()
            .filter(|n| n.geometry.contains(x, y))
            .max_by_key(|n| n.depth)
    }
}
