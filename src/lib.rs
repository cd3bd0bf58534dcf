//! dirsort - A directory organization and cleanup utility
//!
//! This library sorts the files of a single directory into category folders
//! by extension, archives stale files, deletes a narrow class of temporary
//! files, and sets byte-identical duplicates aside. Every pass reports through
//! a line sink and supports a dry run that leaves the filesystem untouched.
//!
//! # Example
//!
//! ```no_run
//! use dirsort::config::OrganizerConfig;
//! use std::path::Path;
//!
//! let config = OrganizerConfig::default();
//! let result = dirsort::organize(Path::new("/home/user/Downloads"), true, false, &config, |line| {
//!     println!("{}", line)
//! })
//! .unwrap();
//! assert_eq!(result.error_count, 0);
//! ```

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod file_category;
pub mod file_organizer;
pub mod file_record;
pub mod hasher;
pub mod operations;
pub mod output;

pub use config::{CompiledFilters, ConfigError, OrganizerConfig};
pub use duplicates::DuplicateGroups;
pub use file_category::{Classifier, classify};
pub use file_organizer::{FileOrganizer, OrganizeError, OrganizeResult};
pub use file_record::FileRecord;
pub use hasher::{ContentDigest, hash_file};
pub use operations::{
    OperationResult, Organizer, archive, cleanup, find_duplicates, handle_duplicates, organize,
};

pub use cli::{Cli, CliError, run_cli};

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Installs a stderr `tracing` subscriber.
///
/// `verbosity` is the number of `-v` flags; `RUST_LOG` directives are
/// honored on top of it. Calling this twice leaves the first subscriber in
/// place.
pub fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::ERROR,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
