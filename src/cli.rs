//! Command-line interface module for dirsort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Configuration loading
//! - Running the selected passes in a fixed order
//!
//! Passes run as cleanup, duplicates, organize, archive. Temporary files are
//! removed before they could be sorted, duplicates are set aside before the
//! organize pass moves their originals, and archiving sees the freshly
//! organized category folders.

use crate::config::{ConfigError, OrganizerConfig};
use crate::file_organizer::OrganizeError;
use crate::operations::{OperationResult, Organizer};
use crate::output::OutputFormatter;
use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Shown after the option list. Describes the built-in defaults; a config
/// file can change any of them.
const AFTER_HELP: &str = "\
Categories:
  Images      - jpg, png, gif, svg, webp, etc.
  Documents   - pdf, doc, txt, xlsx, etc.
  Audio       - mp3, wav, flac, etc.
  Video       - mp4, avi, mkv, mov, etc.
  Archives    - zip, rar, 7z, tar, etc.
  Code        - py, js, html, css, json, etc.
  Executables - exe, dmg, app, etc.
  Fonts       - ttf, otf, woff, etc.
  Other       - everything else

Special folders:
  _LargeFiles  - files larger than 1 GB (for easy review)
  _Archive     - files older than 30 days (with --archive)
  _Recents     - files newer than 24 hours (with --recents)
  _Duplicates  - duplicate files found (with --duplicates)

Safety:
  dirsort never deletes files, it only moves them.
  Exception: --cleanup deletes .ica files older than 1 day.
  Use --dry-run to preview changes before applying.";

/// Sort the files of a directory into category folders.
///
/// Files are only ever moved. The one exception is `--cleanup`, which deletes
/// old files with an auto-delete extension (`.ica` by default).
#[derive(Debug, Parser)]
#[command(name = "dirsort", version, after_help = AFTER_HELP)]
pub struct Cli {
    /// Directory to organize
    pub directory: PathBuf,

    /// Preview changes without moving or deleting anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Move files older than the archive threshold into _Archive/
    #[arg(short, long)]
    pub archive: bool,

    /// Delete stale temporary files before organizing
    #[arg(short, long)]
    pub cleanup: bool,

    /// Move duplicate files into _Duplicates/ before organizing
    #[arg(short, long)]
    pub duplicates: bool,

    /// Keep files newer than the recents threshold in _Recents/
    #[arg(short, long)]
    pub recents: bool,

    /// Configuration file (defaults to .dirsortrc.toml, then ~/.config/dirsort/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Errors that end a CLI run.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Error loading configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Organize(#[from] OrganizeError),
}

/// Runs the passes selected on the command line.
///
/// Returns the result of each pass that ran, in order.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use dirsort::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["dirsort", "/path/to/directory", "--dry-run"]);
/// match run_cli(&cli) {
///     Ok(passes) => println!("{} passes completed", passes.len()),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<Vec<(&'static str, OperationResult)>, CliError> {
    let config = OrganizerConfig::load(cli.config.as_deref())?;
    run_with_config(cli, &config)
}

/// Runs the selected passes against an already loaded configuration.
pub fn run_with_config(
    cli: &Cli,
    config: &OrganizerConfig,
) -> Result<Vec<(&'static str, OperationResult)>, CliError> {
    let directory = resolve_directory(&cli.directory)?;
    let organizer = Organizer::new(config)?;
    let mut passes = Vec::new();
    let mut print = |line: &str| OutputFormatter::line(line);

    if cli.cleanup {
        OutputFormatter::banner("CLEANING UP TEMPORARY FILES", true);
        passes.push(("Cleanup", organizer.cleanup(&directory, cli.dry_run, &mut print)?));
    }

    if cli.duplicates {
        OutputFormatter::banner("FINDING DUPLICATE FILES", !cli.cleanup);
        let spinner = OutputFormatter::create_spinner("Hashing files...");
        let result = organizer.handle_duplicates(&directory, cli.dry_run, &mut |line: &str| {
            spinner.suspend(|| OutputFormatter::line(line))
        });
        spinner.finish_and_clear();
        passes.push(("Duplicates", result?));
    }

    passes.push((
        "Organize",
        organizer.organize(&directory, cli.dry_run, cli.recents, &mut print)?,
    ));

    if cli.archive {
        OutputFormatter::banner("ARCHIVING OLD FILES", false);
        passes.push(("Archive", organizer.archive(&directory, cli.dry_run, &mut print)?));
    }

    Ok(passes)
}

/// Makes the directory absolute and checks that it exists.
fn resolve_directory(directory: &Path) -> Result<PathBuf, OrganizeError> {
    directory
        .canonicalize()
        .ok()
        .filter(|path| path.is_dir())
        .ok_or_else(|| OrganizeError::InvalidDirectory {
            path: directory.to_path_buf(),
        })
}
