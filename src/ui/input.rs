//! Text command parsing for the interactive front-end.
//!
//! Each line is one command; the first word selects the action and the rest
//! of the line is its argument, so names containing spaces work unquoted.

use thiserror::Error;

use crate::layout::LayoutKind;

/// Commands the session understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Hide or show a top-level entry by name.
    Toggle(String),
    /// Show every top-level entry.
    Reset,
    /// Flip visibility of every top-level directory.
    Invert,
    /// Set the depth bound.
    Depth(i64),
    /// Switch to the given layout, or to the other one when absent.
    Layout(Option<LayoutKind>),
    /// Toggle node labels.
    Labels,
    /// Select a node by path.
    Select(String),
    /// Select the node drawn at a viewport point.
    Pick(f64, f64),
    /// Drop the selection.
    ClearSelection,
    /// Change the viewport size.
    Resize(f64, f64),
    /// Emit the current frame.
    Render,
    Help,
    Quit,
}

/// Why a line could not be turned into a [`Command`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("invalid argument for '{0}': {1}")]
    InvalidArgument(&'static str, String),
}

/// One-line descriptions shown by `help`.
pub const HELP: &[(&str, &str)] = &[
    ("toggle NAME", "hide/show a top-level directory"),
    ("reset", "show all directories"),
    ("invert", "invert directory visibility"),
    ("depth N", "set the maximum displayed depth"),
    ("layout [circle-pack|treemap]", "switch layout"),
    ("labels", "toggle labels"),
    ("select PATH", "select a node (e.g. root/src)"),
    ("pick X Y", "select the node drawn at a point"),
    ("clear", "clear the selection"),
    ("size W H", "set the viewport size"),
    ("render", "print the current frame as JSON"),
    ("help", "show this help"),
    ("quit", "exit"),
];

pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "toggle" | "t" => required(rest, "toggle").map(|name| Command::Toggle(name.to_string())),
        "reset" => Ok(Command::Reset),
        "invert" => Ok(Command::Invert),
        "depth" | "d" => {
            let arg = required(rest, "depth")?;
            arg.parse::<i64>()
                .map(Command::Depth)
                .map_err(|_| ParseError::InvalidArgument("depth", arg.to_string()))
        }
        "layout" | "l" => match rest {
            "" => Ok(Command::Layout(None)),
            "circle-pack" | "circle" | "pack" => Ok(Command::Layout(Some(LayoutKind::CirclePack))),
            "treemap" | "tree" => Ok(Command::Layout(Some(LayoutKind::Treemap))),
            other => Err(ParseError::InvalidArgument("layout", other.to_string())),
        },
        "labels" => Ok(Command::Labels),
        "select" | "s" => required(rest, "select").map(|path| Command::Select(path.to_string())),
        "clear" => Ok(Command::ClearSelection),
        "pick" | "p" => pair(rest, "pick").map(|(x, y)| Command::Pick(x, y)),
        "size" => pair(rest, "size").map(|(w, h)| Command::Resize(w, h)),
        "render" | "r" => Ok(Command::Render),
        "help" | "?" => Ok(Command::Help),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        _ => Err(ParseError::Unknown(word.to_string())),
    }
}

fn required<'a>(rest: &'a str, cmd: &'static str) -> Result<&'a str, ParseError> {
    if rest.is_empty() {
        Err(ParseError::MissingArgument(cmd))
    } else {
        Ok(rest)
    }
}

fn pair(rest: &str, cmd: &'static str) -> Result<(f64, f64), ParseError> {
    let arg = required(rest, cmd)?;
    let nums: Vec<f64> = arg
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|_| ParseError::InvalidArgument(cmd, arg.to_string()))?;
    match nums.as_slice() {
        [a, b] => Ok((*a, *b)),
        _ => Err(ParseError::InvalidArgument(cmd, arg.to_string())),
    }
}
