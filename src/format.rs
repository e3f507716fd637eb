//! Human-readable size strings.

use std::fmt;

use serde::Serialize;

use crate::layout::{display_path, PlacedNode};

const KB: f64 = 1024.0;

/// Binary size unit, stepping by 1024.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Unit {
    B,
    KB,
    MB,
    GB,
    TB,
}

impl Unit {
    const ALL: [Unit; 5] = [Unit::B, Unit::KB, Unit::MB, Unit::GB, Unit::TB];

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::B => "B",
            Unit::KB => "KB",
            Unit::MB => "MB",
            Unit::GB => "GB",
            Unit::TB => "TB",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A size split into its number and unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeDisplay {
    /// Quotient with one decimal, e.g. `"1.5"`.
    pub value: String,
    pub unit: Unit,
    /// `value` immediately followed by `unit`, e.g. `"1.5KB"`.
    pub formatted: String,
}

impl fmt::Display for SizeDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted)
    }
}

/// Scale `bytes` to the largest unit (up to TB) that keeps the number at or
/// above 1, formatted to one decimal place.
pub fn format_size(bytes: u64) -> SizeDisplay {
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= KB && unit < Unit::ALL.len() - 1 {
        size /= KB;
        unit += 1;
    }

    let value = to_fixed(size, 1);
    let unit = Unit::ALL[unit];
    SizeDisplay {
        formatted: format!("{}{}", value, unit),
        value,
        unit,
    }
}

/// Size in megabytes with two decimals regardless of magnitude.
pub fn format_mb(bytes: u64) -> String {
    format!("{}MB", to_fixed(bytes as f64 / (KB * KB), 2))
}

/// Format a count with thousands separators.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Two-line label drawn on a node: name, then size.
pub fn label_text(node: &PlacedNode) -> String {
    format!("{}\n{}", node.name, format_size(node.value))
}

/// Hover text: the full path, then the exact byte count.
pub fn tooltip_text(node: &PlacedNode) -> String {
    format!("{}\n{}", display_path(&node.path), format_thousands(node.value))
}

/// Fixed-point formatting that rounds exact halves away from zero.
///
/// `format!("{:.N}")` rounds exact ties to even (`0.25` -> `"0.2"`); sizes
/// read more naturally rounded up, so ties are nudged to the next float.
fn to_fixed(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return format!("{:.*}", digits, 0.0);
    }

    let exact = format!("{:.1100}", value.abs());
    let is_tie = exact
        .split_once('.')
        .map(|(_, frac)| {
            let tail = &frac[digits.min(frac.len())..];
            tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0')
        })
        .unwrap_or(false);

    if is_tie {
        let magnitude = f64::from_bits(value.abs().to_bits() + 1);
        format!("{:.*}", digits, magnitude.copysign(value))
    } else {
        format!("{:.*}", digits, value)
    }
}
