//! Output formatting and styling module.
//!
//! The directory passes report through a plain line sink. This module turns
//! those lines into terminal output: tagged lines are colored by outcome,
//! section banners separate the passes, and a spinner covers the hashing
//! phase of the duplicate scan.

use crate::operations::OperationResult;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BANNER_WIDTH: usize = 60;

/// How a reported line is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    /// A file was moved, archived or deleted.
    Done,
    /// A dry run reports what it would do.
    Planned,
    /// A per-file failure.
    Error,
    /// A file was left out, e.g. because it could not be read.
    Warning,
    /// Pass headers and summaries.
    Heading,
    Plain,
}

impl LineStyle {
    /// Picks the style from the tag a line carries.
    pub fn of(line: &str) -> Self {
        let trimmed = line.trim_start();
        if trimmed.starts_with("[ERROR]") {
            Self::Error
        } else if trimmed.starts_with("[WARNING]") {
            Self::Warning
        } else if trimmed.starts_with("[WOULD ") || trimmed.starts_with("[DRY RUN]") {
            Self::Planned
        } else if ["[MOVED]", "[ARCHIVED]", "[DELETED]"]
            .iter()
            .any(|tag| trimmed.starts_with(tag))
        {
            Self::Done
        } else if trimmed.starts_with("Summary:")
            || trimmed.contains(" summary:")
            || trimmed.starts_with("Original:")
        {
            Self::Heading
        } else {
            Self::Plain
        }
    }
}

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints one line reported by a pass, colored by its tag.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// OutputFormatter::line("  [MOVED] photo.jpg -> Images/");
    /// ```
    pub fn line(line: &str) {
        match LineStyle::of(line) {
            LineStyle::Done => println!("{}", line.green()),
            LineStyle::Planned => println!("{}", line.yellow()),
            LineStyle::Error => eprintln!("{}", line.red()),
            LineStyle::Warning => println!("{}", line.yellow()),
            LineStyle::Heading => println!("{}", line.bold()),
            LineStyle::Plain => println!("{}", line),
        }
    }

    /// Prints an error message to stderr in red.
    pub fn error(message: &str) {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }

    /// Prints a section banner between two rules of `=`.
    ///
    /// Every banner after the first is separated by a blank line.
    pub fn banner(title: &str, first: bool) {
        let rule = "=".repeat(BANNER_WIDTH);
        if !first {
            println!();
        }
        println!("{}", rule);
        println!("{}", title.bold());
        println!("{}", rule);
    }

    /// Creates a spinner for phases without a known length.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// let spinner = OutputFormatter::create_spinner("Hashing files...");
    /// spinner.suspend(|| OutputFormatter::line("Scanning 12 files for duplicates..."));
    /// spinner.finish_and_clear();
    /// ```
    pub fn create_spinner(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Prints a table with one row per pass that ran.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::operations::OperationResult;
    /// use dirsort::output::OutputFormatter;
    ///
    /// let organize = OperationResult::default();
    /// OutputFormatter::summary_table(&[("Organize", &organize)]);
    /// ```
    pub fn summary_table(rows: &[(&str, &OperationResult)]) {
        if rows.is_empty() {
            return;
        }

        let name_width = rows
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(4); // At least "Pass" width
        let rule = "-".repeat(name_width + 30);

        println!("\n{}", "SUMMARY".bold());
        println!(
            "{:<width$} | {:>6} | {:>7} | {:>6}",
            "Pass".bold(),
            "Done".bold(),
            "Skipped".bold(),
            "Errors".bold(),
            width = name_width
        );
        println!("{}", rule);

        for (name, result) in rows {
            let errors = if result.error_count > 0 {
                result.error_count.to_string().red()
            } else {
                result.error_count.to_string().normal()
            };
            println!(
                "{:<width$} | {:>6} | {:>7} | {:>6}",
                name,
                result.success_count.to_string().green(),
                result.skip_count,
                errors,
                width = name_width
            );
        }
        println!("{}", rule);
    }
}
