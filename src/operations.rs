//! Directory passes: organize, archive, cleanup and duplicate handling.
//!
//! Each pass makes one linear sweep over a directory, decides a destination
//! per file, hands the move to [`FileOrganizer`] and tallies the outcome in an
//! [`OperationResult`]. Progress lines go to a caller-supplied sink, so the
//! passes never write to a terminal themselves. A per-file failure is recorded
//! and the pass moves on to the next file.
//!
//! In a dry run every decision is computed and reported exactly as it would
//! be for a real run, and the filesystem is left alone.

use crate::config::{CompiledFilters, OrganizerConfig};
use crate::duplicates::{DuplicateFinder, DuplicateGroups};
use crate::file_category::Classifier;
use crate::file_organizer::{FileOrganizer, OrganizeError, OrganizeResult, ensure_directory};
use crate::file_record::{FileRecord, format_file_size};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const RULE_WIDTH: usize = 60;

/// Tally of a single pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationResult {
    /// Files moved or deleted (or planned to be, in a dry run).
    pub success_count: usize,
    /// Files left alone on purpose: hidden or excluded.
    pub skip_count: usize,
    /// Files whose move or delete failed.
    pub error_count: usize,
    /// One description per successful file, in processing order.
    ///
    /// A file whose move or delete fails has no entry here; it shows up in
    /// `errors` instead.
    pub actions: Vec<String>,
    /// `"<name>: <message>"` per failed file or unreadable folder, in
    /// processing order.
    pub errors: Vec<String>,
    /// Bytes held by the duplicates moved aside. Only duplicate handling sets this.
    pub space_recoverable: u64,
}

impl OperationResult {
    fn succeeded(&mut self, action: String) {
        self.success_count += 1;
        self.actions.push(action);
    }

    fn skipped(&mut self) {
        self.skip_count += 1;
    }

    /// Records the failure and returns the message that was stored.
    fn failed(&mut self, name: &str, error: &OrganizeError) -> String {
        warn!(file = name, error = %error, "file operation failed");
        let message = format!("{}: {}", name, error);
        self.error_count += 1;
        self.errors.push(message.clone());
        message
    }
}

/// A file picked up by the archive pass.
struct ArchiveCandidate {
    record: FileRecord,
    /// Path shown to the user, relative to the scanned directory.
    display: String,
    category: String,
}

/// Runs the directory passes against one configuration.
///
/// The reference time used for ages and collision suffixes is captured when
/// the organizer is built and can be replaced with [`Organizer::with_now`].
pub struct Organizer<'a> {
    config: &'a OrganizerConfig,
    classifier: Classifier,
    filters: CompiledFilters,
    now: DateTime<Local>,
}

impl<'a> Organizer<'a> {
    /// Validates `config` and compiles its category table and exclusion rules.
    pub fn new(config: &'a OrganizerConfig) -> OrganizeResult<Self> {
        Ok(Self {
            config,
            classifier: Classifier::new(config)?,
            filters: config.compile_filters()?,
            now: Local::now(),
        })
    }

    /// Replaces the reference time.
    pub fn with_now(mut self, now: DateTime<Local>) -> Self {
        self.now = now;
        self
    }

    /// Moves each top-level file into the folder for its category.
    ///
    /// Hidden and excluded files are skipped. With `use_recents`, files newer
    /// than `recents_age_hours` go to the recents folder first; files over the
    /// size threshold go to the large files folder; everything else goes to
    /// its category folder.
    pub fn organize(
        &self,
        directory: &Path,
        dry_run: bool,
        use_recents: bool,
        output: &mut dyn FnMut(&str),
    ) -> OrganizeResult<OperationResult> {
        ensure_directory(directory)?;
        let mut result = OperationResult::default();

        let files = top_level_files(directory, &mut result, output)?;
        if files.is_empty() {
            output("No files found to organize.");
            return Ok(result);
        }

        info!(directory = %directory.display(), files = files.len(), dry_run, "organizing");
        output(&format!(
            "\n{}Organizing {} files in: {}\n",
            dry_run_prefix(dry_run),
            files.len(),
            directory.display()
        ));
        output(&"-".repeat(RULE_WIDTH));

        for path in files {
            let name = file_name(&path);
            if self.config.is_hidden(&name) || self.filters.is_excluded(Path::new(&name)) {
                debug!(file = %name, "skipped");
                result.skipped();
                continue;
            }

            let record = match FileRecord::from_path(&path) {
                Ok(record) => record,
                Err(e) => {
                    let error = OrganizeError::Metadata { path, source: e };
                    let message = result.failed(&name, &error);
                    output(&format!("  [ERROR] {}", message));
                    continue;
                }
            };

            let (folder, action) = self.organize_decision(&record, &name, use_recents);
            debug!(file = %name, folder = %folder, "organize decision");

            if dry_run {
                output(&format!("  [WOULD MOVE] {}", action));
                result.succeeded(action);
                continue;
            }

            let destination_dir = directory.join(folder);
            match FileOrganizer::relocate(&path, &destination_dir, path_name(&path), self.now) {
                Ok(_) => {
                    output(&format!("  [MOVED] {}", action));
                    result.succeeded(action);
                }
                Err(e) => {
                    let message = result.failed(&name, &e);
                    output(&format!("  [ERROR] {}", message));
                }
            }
        }

        output(&"-".repeat(RULE_WIDTH));
        if dry_run {
            output(&format!("\n[DRY RUN] Would move {} files", result.success_count));
            output("Run without --dry-run to apply changes.");
        } else {
            output(&format!(
                "\nSummary: {} moved, {} skipped, {} errors",
                result.success_count, result.skip_count, result.error_count
            ));
        }
        Ok(result)
    }

    /// Destination folder and action text for one file.
    fn organize_decision<'s>(
        &'s self,
        record: &FileRecord,
        name: &str,
        use_recents: bool,
    ) -> (&'s str, String) {
        let config = self.config;
        if use_recents && record.is_newer_than(config.recents_age_hours, self.now) {
            let folder = config.recents_folder.as_str();
            let action = format!(
                "{} ({:.1}h old) -> {}/",
                name,
                record.age_in_hours(self.now),
                folder
            );
            (folder, action)
        } else if record.is_oversized(config.large_file_threshold_bytes) {
            let folder = config.large_files_folder.as_str();
            let action = format!("{} ({}) -> {}/", name, format_file_size(record.size), folder);
            (folder, action)
        } else {
            let folder = self.classifier.classify(&record.extension);
            (folder, format!("{} -> {}/", name, folder))
        }
    }

    /// Moves files older than `archive_age_days` into `archive_folder/<category>`.
    ///
    /// Both top-level files and files directly inside a category folder are
    /// considered. A top-level file is archived under its classified
    /// category; a file already in a category folder keeps that folder's name.
    pub fn archive(
        &self,
        directory: &Path,
        dry_run: bool,
        output: &mut dyn FnMut(&str),
    ) -> OrganizeResult<OperationResult> {
        ensure_directory(directory)?;
        let mut result = OperationResult::default();

        let mut candidates = Vec::new();
        for (path, display, category) in self.archive_scan(directory, &mut result, output)? {
            let name = file_name(&path);
            if self.config.is_hidden(&name) || self.filters.is_excluded(Path::new(&display)) {
                result.skipped();
                continue;
            }

            match FileRecord::from_path(&path) {
                Ok(record) if record.is_older_than(self.config.archive_age_days, self.now) => {
                    candidates.push(ArchiveCandidate {
                        record,
                        display,
                        category,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    let error = OrganizeError::Metadata { path, source: e };
                    let message = result.failed(&display, &error);
                    output(&format!("  [ERROR] {}", message));
                }
            }
        }

        if candidates.is_empty() {
            output(&format!(
                "No files older than {} days found.",
                self.config.archive_age_days
            ));
            return Ok(result);
        }

        info!(directory = %directory.display(), files = candidates.len(), dry_run, "archiving");
        output(&format!(
            "\n{}Archiving {} files older than {} days\n",
            dry_run_prefix(dry_run),
            candidates.len(),
            self.config.archive_age_days
        ));
        output(&"-".repeat(RULE_WIDTH));

        let archive_root = directory.join(&self.config.archive_folder);
        for candidate in candidates {
            let action = format!(
                "{} ({} days old) -> {}/{}/",
                candidate.display,
                candidate.record.age_in_days(self.now),
                self.config.archive_folder,
                candidate.category
            );

            if dry_run {
                output(&format!("  [WOULD ARCHIVE] {}", action));
                result.succeeded(action);
                continue;
            }

            let path = &candidate.record.path;
            match FileOrganizer::relocate(
                path,
                &archive_root.join(&candidate.category),
                path_name(path),
                self.now,
            ) {
                Ok(_) => {
                    output(&format!("  [ARCHIVED] {}", action));
                    result.succeeded(action);
                }
                Err(e) => {
                    let message = result.failed(&candidate.display, &e);
                    output(&format!("  [ERROR] {}", message));
                }
            }
        }

        output(&"-".repeat(RULE_WIDTH));
        if dry_run {
            output(&format!("\n[DRY RUN] Would archive {} files", result.success_count));
            output("Run without --dry-run to apply changes.");
        } else {
            output(&format!(
                "\nArchive summary: {} archived, {} errors",
                result.success_count, result.error_count
            ));
        }
        Ok(result)
    }

    /// Files the archive pass looks at, as (path, display path, category).
    ///
    /// A category folder that cannot be listed is recorded as a failure and
    /// the scan moves on.
    fn archive_scan(
        &self,
        directory: &Path,
        result: &mut OperationResult,
        output: &mut dyn FnMut(&str),
    ) -> OrganizeResult<Vec<(PathBuf, String, String)>> {
        let mut found = Vec::new();

        for path in top_level_files(directory, result, output)? {
            let name = file_name(&path);
            let category = self.classifier.classify_path(&path).to_string();
            found.push((path, name, category));
        }

        for folder in self.config.category_folders() {
            let folder_path = directory.join(folder);
            let is_dir = fs::symlink_metadata(&folder_path)
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }
            let files = match top_level_files(&folder_path, result, output) {
                Ok(files) => files,
                Err(e) => {
                    let message = result.failed(folder, &e);
                    output(&format!("  [ERROR] {}", message));
                    continue;
                }
            };
            for path in files {
                let display = format!("{}/{}", folder, file_name(&path));
                found.push((path, display, folder.to_string()));
            }
        }

        found.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(found)
    }

    /// Deletes old top-level files whose extension marks them as disposable.
    ///
    /// This is the only pass that removes files. A file must match
    /// `auto_delete_extensions` and be older than `auto_delete_age_days`;
    /// excluded files are never deleted.
    pub fn cleanup(
        &self,
        directory: &Path,
        dry_run: bool,
        output: &mut dyn FnMut(&str),
    ) -> OrganizeResult<OperationResult> {
        ensure_directory(directory)?;
        let mut result = OperationResult::default();

        let mut deletable = Vec::new();
        for path in top_level_files(directory, &mut result, output)? {
            let name = file_name(&path);
            if self.filters.is_excluded(Path::new(&name)) {
                result.skipped();
                continue;
            }
            match FileRecord::from_path(&path) {
                Ok(record) if record.is_deletable(self.config, self.now) => deletable.push(record),
                Ok(_) => {}
                Err(e) => {
                    let error = OrganizeError::Metadata { path, source: e };
                    let message = result.failed(&name, &error);
                    output(&format!("  [ERROR] {}", message));
                }
            }
        }

        if deletable.is_empty() {
            return Ok(result);
        }

        info!(directory = %directory.display(), files = deletable.len(), dry_run, "cleaning up");
        output(&format!(
            "\n{}Cleaning up {} temporary files\n",
            dry_run_prefix(dry_run),
            deletable.len()
        ));
        output(&"-".repeat(RULE_WIDTH));

        for record in deletable {
            let name = record.name().into_owned();
            let action = format!("{} ({} days old)", name, record.age_in_days(self.now));

            if dry_run {
                output(&format!("  [WOULD DELETE] {}", action));
                result.succeeded(action);
                continue;
            }

            match FileOrganizer::delete(&record.path) {
                Ok(()) => {
                    output(&format!("  [DELETED] {}", action));
                    result.succeeded(action);
                }
                Err(e) => {
                    let message = result.failed(&name, &e);
                    output(&format!("  [ERROR] {}", message));
                }
            }
        }

        output(&"-".repeat(RULE_WIDTH));
        if dry_run {
            output(&format!(
                "\n[DRY RUN] Would delete {} temporary files",
                result.success_count
            ));
        } else {
            output(&format!(
                "\nCleanup summary: {} deleted, {} errors",
                result.success_count, result.error_count
            ));
        }
        Ok(result)
    }

    /// Groups byte-identical files under `directory`.
    pub fn find_duplicates(
        &self,
        directory: &Path,
        recursive: bool,
        output: &mut dyn FnMut(&str),
    ) -> OrganizeResult<DuplicateGroups> {
        DuplicateFinder::new(self.config, &self.filters).find(directory, recursive, output)
    }

    /// Keeps the oldest file of every duplicate group and moves the rest
    /// into `duplicates_folder`, mirroring their relative location.
    pub fn handle_duplicates(
        &self,
        directory: &Path,
        dry_run: bool,
        output: &mut dyn FnMut(&str),
    ) -> OrganizeResult<OperationResult> {
        let mut result = OperationResult::default();
        let groups = self.find_duplicates(directory, true, output)?;

        if groups.is_empty() {
            output("No duplicate files found.");
            return Ok(result);
        }

        let extra: usize = groups.values().map(|members| members.len() - 1).sum();
        info!(
            directory = %directory.display(),
            sets = groups.len(),
            extra,
            dry_run,
            "handling duplicates"
        );
        output(&format!(
            "\n{}Found {} sets of duplicates ({} extra files)\n",
            dry_run_prefix(dry_run),
            groups.len(),
            extra
        ));
        output(&"-".repeat(RULE_WIDTH));

        let mut ordered: Vec<Vec<PathBuf>> = groups.into_values().collect();
        ordered.sort_by(|a, b| a[0].cmp(&b[0]));

        let duplicates_root = directory.join(&self.config.duplicates_folder);
        for members in ordered {
            let Some((original, copies)) = members.split_first() else {
                continue;
            };
            output(&format!("\n  Original: {}", relative_display(directory, original)));

            for copy in copies {
                let relative = copy.strip_prefix(directory).unwrap_or(copy);
                let shown = relative.display().to_string();

                let size = match fs::metadata(copy) {
                    Ok(metadata) => metadata.len(),
                    Err(e) => {
                        let error = OrganizeError::Metadata {
                            path: copy.clone(),
                            source: e,
                        };
                        let message = result.failed(&shown, &error);
                        output(&format!("    [ERROR] {}", message));
                        continue;
                    }
                };
                let action = format!("{} ({})", shown, format_file_size(size));

                if dry_run {
                    output(&format!("    [WOULD MOVE] {}", action));
                    result.succeeded(action);
                    result.space_recoverable += size;
                    continue;
                }

                let destination_dir = match relative.parent() {
                    Some(parent) => duplicates_root.join(parent),
                    None => duplicates_root.clone(),
                };
                match FileOrganizer::relocate(copy, &destination_dir, path_name(copy), self.now) {
                    Ok(_) => {
                        output(&format!("    [MOVED] {}", action));
                        result.succeeded(action);
                        result.space_recoverable += size;
                    }
                    Err(e) => {
                        let message = result.failed(&shown, &e);
                        output(&format!("    [ERROR] {}", message));
                    }
                }
            }
        }

        output(&format!("\n{}", "-".repeat(RULE_WIDTH)));
        let recoverable = format_file_size(result.space_recoverable);
        let folder = &self.config.duplicates_folder;
        if dry_run {
            output(&format!(
                "\n[DRY RUN] Would move {} duplicate files",
                result.success_count
            ));
            output(&format!("Potential space savings: {}", recoverable));
            output(&format!("Duplicates would be moved to: {}/", folder));
            output("Run without --dry-run to apply changes.");
        } else {
            output(&format!(
                "\nDuplicate summary: {} moved to {}/",
                result.success_count, folder
            ));
            output(&format!(
                "Space recoverable (if you delete duplicates): {}",
                recoverable
            ));
        }
        Ok(result)
    }
}

/// Moves top-level files of `directory` into category folders.
///
/// Uses the current time as the reference for ages.
///
/// # Examples
///
/// ```no_run
/// use dirsort::config::OrganizerConfig;
/// use dirsort::operations::organize;
/// use std::path::Path;
///
/// let config = OrganizerConfig::default();
/// let result = organize(Path::new("/home/user/Downloads"), true, false, &config, |line| {
///     println!("{}", line)
/// })
/// .unwrap();
/// println!("{} files would move", result.success_count);
/// ```
pub fn organize(
    directory: &Path,
    dry_run: bool,
    use_recents: bool,
    config: &OrganizerConfig,
    mut output: impl FnMut(&str),
) -> OrganizeResult<OperationResult> {
    Organizer::new(config)?.organize(directory, dry_run, use_recents, &mut output)
}

/// Archives files older than `archive_age_days`.
pub fn archive(
    directory: &Path,
    dry_run: bool,
    config: &OrganizerConfig,
    mut output: impl FnMut(&str),
) -> OrganizeResult<OperationResult> {
    Organizer::new(config)?.archive(directory, dry_run, &mut output)
}

/// Deletes old files whose extension is listed in `auto_delete_extensions`.
pub fn cleanup(
    directory: &Path,
    dry_run: bool,
    config: &OrganizerConfig,
    mut output: impl FnMut(&str),
) -> OrganizeResult<OperationResult> {
    Organizer::new(config)?.cleanup(directory, dry_run, &mut output)
}

/// Groups byte-identical files by content digest.
pub fn find_duplicates(
    directory: &Path,
    recursive: bool,
    config: &OrganizerConfig,
    mut output: impl FnMut(&str),
) -> OrganizeResult<DuplicateGroups> {
    Organizer::new(config)?.find_duplicates(directory, recursive, &mut output)
}

/// Moves every duplicate except the oldest copy into `duplicates_folder`.
pub fn handle_duplicates(
    directory: &Path,
    dry_run: bool,
    config: &OrganizerConfig,
    mut output: impl FnMut(&str),
) -> OrganizeResult<OperationResult> {
    Organizer::new(config)?.handle_duplicates(directory, dry_run, &mut output)
}

/// Regular files directly inside `directory`, sorted by name.
///
/// Symlinks and subdirectories are left out. Failing to open `directory` is
/// an error; an entry that cannot be read is recorded in `result` and
/// skipped.
fn top_level_files(
    directory: &Path,
    result: &mut OperationResult,
    output: &mut dyn FnMut(&str),
) -> OrganizeResult<Vec<PathBuf>> {
    let read_error = |source| OrganizeError::ReadDirectory {
        path: directory.to_path_buf(),
        source,
    };
    let entries = fs::read_dir(directory).map_err(read_error)?;

    let mut files = Vec::new();
    for entry in entries {
        match entry.and_then(|entry| Ok((entry.file_type()?, entry.path()))) {
            Ok((file_type, path)) if file_type.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => {
                let message = result.failed(&file_name(directory), &read_error(e));
                output(&format!("  [ERROR] {}", message));
            }
        }
    }
    files.sort();
    Ok(files)
}

fn dry_run_prefix(dry_run: bool) -> &'static str {
    if dry_run { "[DRY RUN] " } else { "" }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn path_name(path: &Path) -> &std::ffi::OsStr {
    path.file_name().unwrap_or(path.as_os_str())
}

fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
