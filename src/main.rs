mod config;
mod export;
mod format;
mod layout;
mod logging;
mod scanner;
mod session;
mod tree;
mod ui;

use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::warn;

use config::Config;
use export::{export_frame, export_tree};
use layout::{LayoutKind, Viewport};
use scanner::{ScanOptions, Scanner};
use session::{CommandOutcome, Session};
use tree::TreeModel;
use ui::{checklist, details_lines, help_text, listing_lines, parse_command, summary_line, ParseError};

#[derive(Parser, Debug)]
#[command(name = "spacemap")]
#[command(version)]
#[command(about = "Disk usage maps: circle packing and treemaps over a usage tree", long_about = None)]
struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Lay out the tree and print the frame as JSON
    Layout(ViewArgs),
    /// Print the directory checklist and visible size summary
    Summary(ViewArgs),
    /// Read commands from stdin and apply them to the view
    Interactive(ViewArgs),
    /// Scan a directory into a usage tree
    Scan(ScanArgs),
}

/// Options shared by every command that views a usage tree.
#[derive(ClapArgs, Debug)]
struct ViewArgs {
    /// Usage tree JSON file
    data: PathBuf,

    #[arg(short, long, value_enum)]
    layout: Option<LayoutKind>,

    /// Maximum displayed depth
    #[arg(short, long, allow_negative_numbers = true)]
    depth: Option<i64>,

    #[arg(long)]
    width: Option<f64>,

    #[arg(long)]
    height: Option<f64>,

    /// Hide a top-level directory (can be repeated)
    #[arg(long = "hide", action = clap::ArgAction::Append)]
    hide: Vec<String>,

    /// Invert visibility after applying --hide
    #[arg(long)]
    invert: bool,
}

#[derive(ClapArgs, Debug)]
struct ScanArgs {
    /// Directory to scan
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Keep only files with this extension
    #[arg(short, long)]
    extension: Option<String>,

    /// Patterns to exclude (can be repeated)
    #[arg(short = 'x', long = "exclude", action = clap::ArgAction::Append)]
    exclude: Vec<String>,

    /// Maximum depth to scan
    #[arg(long)]
    max_depth: Option<usize>,

    /// Use disk usage instead of apparent size
    #[arg(long)]
    disk_usage: bool,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_tracing(args.verbose);

    let config = Config::load_or_default(args.config.as_deref())?;

    match args.command {
        Cmd::Layout(view) => run_layout(&config, view),
        Cmd::Summary(view) => run_summary(&config, view),
        Cmd::Interactive(view) => run_interactive(&config, view),
        Cmd::Scan(scan) => run_scan(scan),
    }
}

/// Load the tree and apply the view flags on top of the config file.
fn open_session(config: &Config, view: ViewArgs) -> Result<Session> {
    let model = TreeModel::load(&view.data)
        .with_context(|| format!("failed to load usage tree {}", view.data.display()))?;
    let mut session = Session::with_config(model, config);

    if let Some(kind) = view.layout {
        session.set_layout_kind(kind);
    }
    if let Some(depth) = view.depth {
        session.set_depth_bound(depth);
    }
    if view.width.is_some() || view.height.is_some() {
        let current = session.viewport();
        session.set_viewport(Viewport::new(
            view.width.unwrap_or(current.width),
            view.height.unwrap_or(current.height),
        ));
    }
    for name in &view.hide {
        if !session.toggle(name) {
            warn!(name = %name, "no such top-level entry");
        }
    }
    if view.invert {
        session.invert();
    }
    Ok(session)
}

fn run_layout(config: &Config, view: ViewArgs) -> Result<()> {
    let session = open_session(config, view)?;
    let frame = session.render();

    let mut stdout = io::stdout().lock();
    export_frame(&frame, &mut stdout)?;
    writeln!(stdout)?;
    Ok(())
}

fn run_summary(config: &Config, view: ViewArgs) -> Result<()> {
    let session = open_session(config, view)?;
    let mut stdout = io::stdout().lock();
    print_summary(&session, &mut stdout)?;
    Ok(())
}

fn print_summary(session: &Session, out: &mut impl Write) -> io::Result<()> {
    for line in checklist(&session.directory_entries()) {
        writeln!(out, "{}", line)?;
    }
    writeln!(out, "{}", summary_line(&session.summary()))
}

fn run_interactive(config: &Config, view: ViewArgs) -> Result<()> {
    let mut session = open_session(config, view)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    print_summary(&session, &mut stdout)?;
    for line in stdin.lock().lines() {
        let line = line?;
        let cmd = match parse_command(&line) {
            Ok(cmd) => cmd,
            Err(ParseError::Empty) => continue,
            Err(err) => {
                writeln!(stdout, "{}", err)?;
                continue;
            }
        };

        match session.handle_command(cmd) {
            CommandOutcome::Quit => break,
            CommandOutcome::Help => writeln!(stdout, "{}", help_text())?,
            CommandOutcome::Render => {
                export_frame(&session.render(), &mut stdout)?;
                writeln!(stdout)?;
            }
            CommandOutcome::Unchanged => writeln!(stdout, "no change")?,
            CommandOutcome::Changed => {
                print_summary(&session, &mut stdout)?;
                if let Some(details) = session.selection_details() {
                    for line in details_lines(&details) {
                        writeln!(stdout, "{}", line)?;
                    }
                    for line in listing_lines(&session.selection_listing()) {
                        writeln!(stdout, "{}", line)?;
                    }
                }
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn run_scan(args: ScanArgs) -> Result<()> {
    let root_path = args.path.canonicalize().unwrap_or(args.path.clone());
    let options = ScanOptions::new(root_path)
        .with_extension(args.extension)
        .with_exclude_patterns(args.exclude)
        .with_max_depth(args.max_depth)
        .with_apparent_size(!args.disk_usage);

    let tree = Scanner::new(options).scan()?;

    match args.output {
        Some(path) => {
            let file = File::create(&path).with_context(|| format!("cannot create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            export_tree(&tree, &mut writer)?;
            writer.flush()?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            export_tree(&tree, &mut stdout)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
