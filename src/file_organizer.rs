/// Relocation engine for moving files into their destination folders.
///
/// Every organizer pass moves files through [`FileOrganizer::relocate`]: the
/// destination folder is created on demand, a name collision is resolved by a
/// timestamp suffix before anything is moved, and the move itself falls back
/// to copy-and-delete when source and destination sit on different volumes.
/// An existing file is never overwritten.
use crate::config::ConfigError;
use chrono::{DateTime, Local};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Timestamp inserted between stem and extension on a name collision.
pub const COLLISION_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Errors that can occur during file organization operations.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The directory to operate on does not exist or is not a directory.
    #[error("'{}' is not a valid directory", .path.display())]
    InvalidDirectory { path: PathBuf },

    /// Failed to create a destination directory.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to move a file to its destination.
    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Both the plain and the timestamped destination name are taken.
    #[error("Destination {} already exists", .path.display())]
    DestinationOccupied { path: PathBuf },

    /// Failed to delete a file during cleanup.
    #[error("Failed to delete {}: {source}", .path.display())]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read a file's metadata.
    #[error("Failed to read metadata of {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read a directory listing.
    #[error("Failed to read directory {}: {source}", .path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration handed to an operation is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Moves and deletes files on behalf of the organizer passes.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Moves `source` into `destination_dir` under `filename`.
    ///
    /// The destination directory and any missing parents are created. When
    /// `destination_dir/filename` is already taken, the file is renamed to
    /// `<stem>_<YYYYmmdd_HHMMSS>.<ext>` using `now`. If that name is taken as
    /// well, the move is refused and the source stays where it is.
    ///
    /// Returns the path the file ended up at.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use chrono::Local;
    /// use dirsort::file_organizer::FileOrganizer;
    /// use std::ffi::OsStr;
    /// use std::path::Path;
    ///
    /// let result = FileOrganizer::relocate(
    ///     Path::new("/path/to/base/image.png"),
    ///     Path::new("/path/to/base/Images"),
    ///     OsStr::new("image.png"),
    ///     Local::now(),
    /// );
    ///
    /// match result {
    ///     Ok(path) => println!("Moved to {}", path.display()),
    ///     Err(e) => eprintln!("Move failed: {}", e),
    /// }
    /// ```
    pub fn relocate(
        source: &Path,
        destination_dir: &Path,
        filename: &OsStr,
        now: DateTime<Local>,
    ) -> OrganizeResult<PathBuf> {
        fs::create_dir_all(destination_dir).map_err(|e| {
            OrganizeError::DirectoryCreationFailed {
                path: destination_dir.to_path_buf(),
                source: e,
            }
        })?;

        let candidate = destination_dir.join(filename);
        let destination = Self::unique_destination(&candidate, now);
        if destination != candidate && is_occupied(&destination) {
            return Err(OrganizeError::DestinationOccupied { path: destination });
        }

        Self::move_file(source, &destination)?;
        debug!(from = %source.display(), to = %destination.display(), "relocated file");
        Ok(destination)
    }

    /// Returns `candidate` if nothing exists there, otherwise the
    /// timestamp-suffixed alternative.
    ///
    /// `report.pdf` becomes `report_20240131_235959.pdf`; a name without an
    /// extension just gets the suffix appended.
    pub fn unique_destination(candidate: &Path, now: DateTime<Local>) -> PathBuf {
        if !is_occupied(candidate) {
            return candidate.to_path_buf();
        }

        let timestamp = now.format(COLLISION_TIMESTAMP_FORMAT);
        let stem = candidate
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        let new_name = match candidate.extension() {
            Some(ext) => format!("{}_{}.{}", stem, timestamp, ext.to_string_lossy()),
            None => format!("{}_{}", stem, timestamp),
        };
        candidate.with_file_name(new_name)
    }

    /// Deletes a single file.
    pub fn delete(path: &Path) -> OrganizeResult<()> {
        fs::remove_file(path).map_err(|e| OrganizeError::DeleteFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Renames `source` to `destination`, copying across volumes when needed.
    fn move_file(source: &Path, destination: &Path) -> OrganizeResult<()> {
        let moved = match fs::rename(source, destination) {
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                debug!(from = %source.display(), "rename crosses devices, copying instead");
                Self::copy_then_remove(source, destination)
            }
            other => other,
        };

        moved.map_err(|e| OrganizeError::FileMoveFailure {
            from: source.to_path_buf(),
            to: destination.to_path_buf(),
            source: e,
        })
    }

    /// Copies, verifies the copied length, then removes the source.
    fn copy_then_remove(source: &Path, destination: &Path) -> io::Result<()> {
        let metadata = fs::metadata(source)?;
        fs::copy(source, destination)?;

        let copied = fs::metadata(destination)?.len();
        if copied != metadata.len() {
            // Incomplete copy: keep the source.
            let _ = fs::remove_file(destination);
            return Err(io::Error::other(format!(
                "copy verification failed: source {} bytes, destination {} bytes",
                metadata.len(),
                copied
            )));
        }

        if let Ok(modified) = metadata.modified()
            && let Err(e) = File::options()
                .write(true)
                .open(destination)
                .and_then(|f| f.set_modified(modified))
        {
            warn!(
                path = %destination.display(),
                error = %e,
                "could not carry over modification time"
            );
        }

        fs::remove_file(source)
    }
}

/// Fails with [`OrganizeError::InvalidDirectory`] unless `path` is an existing directory.
pub fn ensure_directory(path: &Path) -> OrganizeResult<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(OrganizeError::InvalidDirectory {
            path: path.to_path_buf(),
        })
    }
}

/// True if any filesystem entry, including a dangling symlink, sits at `path`.
fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}
