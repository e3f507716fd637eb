//! Plain-text panels: directory checklist, size summary, selection details.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::format::format_size;
use crate::session::{DirectoryEntry, ListingEntry, SelectionDetails};
use crate::tree::SizeSummary;
use crate::ui::input::HELP;

/// Column width reserved for names in the checklist and listing.
pub const NAME_WIDTH: usize = 32;
const BAR_WIDTH: usize = 30;

/// Truncate to at most `max_width` display columns, ending with `…` when cut.
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max_width - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Truncate or right-pad with spaces to exactly `width` columns.
fn fit(s: &str, width: usize) -> String {
    let mut out = truncate_to_width(s, width);
    let pad = width.saturating_sub(out.width());
    out.extend(std::iter::repeat(' ').take(pad));
    out
}

/// `[x] name      12.34MB` rows; `[x]` marks a visible directory.
pub fn checklist(entries: &[DirectoryEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| {
            let mark = if e.hidden { ' ' } else { 'x' };
            format!("[{}] {} {:>12}", mark, fit(&e.name, NAME_WIDTH), e.size_mb())
        })
        .collect()
}

/// `Visible: 1.0KB / 3.0KB [#####.....] 33.33%`
pub fn summary_line(summary: &SizeSummary) -> String {
    let filled = ((summary.percentage / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!(
        "Visible: {} / {} [{}{}] {:.2}%",
        format_size(summary.visible),
        format_size(summary.total),
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        summary.percentage
    )
}

pub fn details_lines(details: &SelectionDetails) -> Vec<String> {
    let mut lines = vec![
        format!("Name: {}", details.name),
        format!("Path: {}", details.path),
        format!("Type: {}", if details.is_dir { "directory" } else { "file" }),
        format!("Size: {}", details.size_mb),
    ];
    if let Some(count) = details.item_count {
        lines.push(format!("Items: {}", count));
    }
    lines
}

/// Indented rows, two spaces per nesting level.
pub fn listing_lines(entries: &[ListingEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| {
            let indent = "  ".repeat(e.level);
            let name_width = NAME_WIDTH.saturating_sub(indent.len()).max(1);
            format!("{}{} {:>12}", indent, fit(&e.name, name_width), e.size_mb)
        })
        .collect()
}

pub fn help_text() -> String {
    let width = HELP.iter().map(|(cmd, _)| cmd.width()).max().unwrap_or(0);
    HELP.iter()
        .map(|(cmd, desc)| format!("  {}  {}", fit(cmd, width), desc))
        .collect::<Vec<_>>()
        .join("\n")
}
