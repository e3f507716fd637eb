//! JSON output for scanned trees and rendered frames.

mod json;

pub use json::{export_frame, export_tree, ExportFrame, ExportNode, ExportSummary};
