mod input;
mod listing;

pub use input::{parse_command, Command, ParseError};
pub use listing::{checklist, details_lines, help_text, listing_lines, summary_line};
