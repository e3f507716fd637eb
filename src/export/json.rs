use serde::Serialize;
use std::io::Write;

use crate::format::{format_size, label_text, tooltip_text};
use crate::layout::{Geometry, LayoutKind, PlacedNode, Viewport};
use crate::session::Frame;
use crate::tree::TreeNode;

/// A placed node as handed to an external renderer.
#[derive(Serialize)]
pub struct ExportNode<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub path: &'a str,
    pub depth: u32,
    pub value: u64,
    pub is_dir: bool,
    pub child_count: usize,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub tooltip: String,
}

impl<'a> ExportNode<'a> {
    fn new(node: &'a PlacedNode, show_labels: bool) -> Self {
        Self {
            id: &node.id,
            name: &node.name,
            path: &node.path,
            depth: node.depth,
            value: node.value,
            is_dir: node.is_dir,
            child_count: node.child_count,
            geometry: node.geometry,
            label: show_labels.then(|| label_text(node)),
            tooltip: tooltip_text(node),
        }
    }
}

#[derive(Serialize)]
pub struct ExportSummary {
    pub visible: u64,
    pub total: u64,
    pub percentage: f64,
    pub visible_formatted: String,
    pub total_formatted: String,
}

/// A rendered frame in export form.
#[derive(Serialize)]
pub struct ExportFrame<'a> {
    pub generation: u64,
    pub layout: LayoutKind,
    pub depth: u32,
    pub viewport: Viewport,
    pub show_labels: bool,
    pub summary: ExportSummary,
    pub nodes: Vec<ExportNode<'a>>,
}

impl<'a> ExportFrame<'a> {
    pub fn new(frame: &'a Frame) -> Self {
        let summary = &frame.summary;
        Self {
            generation: frame.generation,
            layout: frame.layout.kind,
            depth: frame.depth_bound,
            viewport: frame.viewport,
            show_labels: frame.show_labels,
            summary: ExportSummary {
                visible: summary.visible,
                total: summary.total,
                percentage: summary.percentage,
                visible_formatted: format_size(summary.visible).formatted,
                total_formatted: format_size(summary.total).formatted,
            },
            nodes: frame
                .layout
                .nodes
                .iter()
                .map(|n| ExportNode::new(n, frame.show_labels))
                .collect(),
        }
    }
}

/// Write a Tree Model as pretty JSON, the format `TreeModel::load` reads.
pub fn export_tree(tree: &TreeNode, writer: &mut impl Write) -> Result<(), std::io::Error> {
    serde_json::to_writer_pretty(writer, tree).map_err(std::io::Error::other)
}

/// Write a rendered frame as pretty JSON.
pub fn export_frame(frame: &Frame, writer: &mut impl Write) -> Result<(), std::io::Error> {
    serde_json::to_writer_pretty(writer, &ExportFrame::new(frame)).map_err(std::io::Error::other)
}
