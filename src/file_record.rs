//! Per-file metadata and the age/size predicates built on it.
//!
//! A [`FileRecord`] is read from disk on demand and never cached across
//! calls. Every age computation takes the reference time `now` explicitly, so
//! nothing in here reads the clock.

use crate::config::OrganizerConfig;
use crate::file_category::extension_of;
use chrono::{DateTime, Local};
use humansize::{FormatSizeOptions, WINDOWS};
use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Metadata of a single file.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Path the metadata was read from.
    pub path: PathBuf,
    /// Lowercase extension including the dot, empty when there is none.
    pub extension: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Local>,
}

impl FileRecord {
    /// Reads the metadata of `path`.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        let modified = metadata.modified()?;

        Ok(Self {
            path: path.to_path_buf(),
            extension: extension_of(path),
            size: metadata.len(),
            modified: DateTime::<Local>::from(modified),
        })
    }

    /// The file name component, lossily converted.
    pub fn name(&self) -> Cow<'_, str> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default()
    }

    /// Whole days since the last modification, truncated toward zero.
    pub fn age_in_days(&self, now: DateTime<Local>) -> i64 {
        (now - self.modified).num_days()
    }

    /// Hours since the last modification.
    pub fn age_in_hours(&self, now: DateTime<Local>) -> f64 {
        (now - self.modified).num_milliseconds() as f64 / MILLIS_PER_HOUR
    }

    /// True when the file is strictly more than `days` whole days old.
    pub fn is_older_than(&self, days: u32, now: DateTime<Local>) -> bool {
        self.age_in_days(now) > i64::from(days)
    }

    /// True when the file is strictly less than `hours` old.
    pub fn is_newer_than(&self, hours: f64, now: DateTime<Local>) -> bool {
        self.age_in_hours(now) < hours
    }

    /// True when the file is strictly larger than `threshold_bytes`.
    pub fn is_oversized(&self, threshold_bytes: u64) -> bool {
        self.size > threshold_bytes
    }

    /// True when cleanup may delete this file.
    ///
    /// The extension must be one of `auto_delete_extensions` and the file must
    /// be older than `auto_delete_age_days`.
    pub fn is_deletable(&self, config: &OrganizerConfig, now: DateTime<Local>) -> bool {
        config.auto_delete_extensions.contains(&self.extension)
            && self.is_older_than(config.auto_delete_age_days, now)
    }
}

/// Human-readable byte count in 1024 steps (`"10 B"`, `"256.00 KB"`, `"1.43 GB"`).
pub fn format_file_size(bytes: u64) -> String {
    let zeroes = if bytes < 1024 { 0 } else { 2 };
    let options = FormatSizeOptions::from(WINDOWS).decimal_zeroes(zeroes);
    // humansize spells the kilo unit "kB"
    humansize::format_size(bytes, options).replacen("kB", "KB", 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::fs::File;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap()
    }

    fn record(name: &str, size: u64, age: Duration) -> FileRecord {
        FileRecord {
            path: PathBuf::from(name),
            extension: extension_of(Path::new(name)),
            size,
            modified: now() - age,
        }
    }

    #[test]
    fn test_age_in_days_truncates() {
        let file = record("a.txt", 1, Duration::days(2) + Duration::hours(23));
        assert_eq!(file.age_in_days(now()), 2);

        let fresh = record("b.txt", 1, Duration::hours(23));
        assert_eq!(fresh.age_in_days(now()), 0);
    }

    #[test]
    fn test_age_in_hours_is_exact() {
        let file = record("a.txt", 1, Duration::minutes(90));
        assert!((file.age_in_hours(now()) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_is_older_than_is_strict() {
        let exactly = record("a.pdf", 1, Duration::days(30));
        assert!(!exactly.is_older_than(30, now()));

        let older = record("b.pdf", 1, Duration::days(31));
        assert!(older.is_older_than(30, now()));
    }

    #[test]
    fn test_is_newer_than_is_strict() {
        let exactly = record("a.txt", 1, Duration::hours(24));
        assert!(!exactly.is_newer_than(24.0, now()));

        let newer = record("b.txt", 1, Duration::hours(23));
        assert!(newer.is_newer_than(24.0, now()));
    }

    #[test]
    fn test_future_mtime_counts_as_new() {
        let future = record("a.txt", 1, Duration::hours(-5));
        assert!(future.is_newer_than(1.0, now()));
        assert!(!future.is_older_than(0, now()));
    }

    #[test]
    fn test_is_oversized_is_strict() {
        let file = record("big.iso", 1024, Duration::zero());
        assert!(!file.is_oversized(1024));
        assert!(file.is_oversized(1023));
    }

    #[test]
    fn test_is_deletable_requires_extension_and_age() {
        let config = OrganizerConfig::default();

        let old_ica = record("session.ICA", 10, Duration::days(3));
        assert!(old_ica.is_deletable(&config, now()));

        let fresh_ica = record("session.ica", 10, Duration::hours(30));
        assert!(!fresh_ica.is_deletable(&config, now()));

        let old_txt = record("notes.txt", 10, Duration::days(300));
        assert!(!old_txt.is_deletable(&config, now()));
    }

    #[test]
    fn test_from_path_reads_metadata() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("Report.PDF");
        fs::write(&path, b"twelve bytes").expect("Failed to write test file");

        let mtime = SystemTime::now() - std::time::Duration::from_secs(40 * 24 * 3600);
        File::options()
            .write(true)
            .open(&path)
            .and_then(|f| f.set_modified(mtime))
            .expect("Failed to set mtime");

        let record = FileRecord::from_path(&path).expect("Failed to read metadata");
        assert_eq!(record.extension, ".pdf");
        assert_eq!(record.size, 12);
        assert_eq!(record.name(), "Report.PDF");
        assert_eq!(record.age_in_days(Local::now()), 40);
    }

    #[test]
    fn test_from_path_missing_file() {
        assert!(FileRecord::from_path(Path::new("/non/existent/file.txt")).is_err());
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(10), "10 B");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(256 * 1024), "256.00 KB");
        assert_eq!(format_file_size(3 * 1024 * 1024), "3.00 MB");
        assert_eq!(format_file_size(1_536_000_000), "1.43 GB");
    }
}
