//! Duplicate detection by content digest.
//!
//! Walks a directory, hashes every eligible file and groups paths that share
//! a digest. Within a group, paths are ordered oldest first by modification
//! time, with the path itself breaking ties, so the first entry is a stable
//! choice for "the original".

use crate::config::{CompiledFilters, OrganizerConfig};
use crate::file_organizer::{OrganizeResult, ensure_directory};
use crate::hasher::{ContentDigest, hash_file};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Digest to paths sharing it, only for digests with two or more paths.
pub type DuplicateGroups = BTreeMap<ContentDigest, Vec<PathBuf>>;

/// A file that passed the skip rules and will be hashed.
#[derive(Debug, Clone)]
struct Candidate {
    path: PathBuf,
    modified: SystemTime,
}

/// Finds byte-identical files below a directory.
pub struct DuplicateFinder<'a> {
    config: &'a OrganizerConfig,
    filters: &'a CompiledFilters,
}

impl<'a> DuplicateFinder<'a> {
    pub fn new(config: &'a OrganizerConfig, filters: &'a CompiledFilters) -> Self {
        Self { config, filters }
    }

    /// Groups the files under `directory` by content.
    ///
    /// With `recursive` unset only the top level is scanned. Zero-byte files,
    /// hidden files, anything below a hidden or special folder, and files
    /// matched by the exclusion rules are never hashed. A file that cannot be
    /// read is reported through `output` and left out of the grouping.
    pub fn find(
        &self,
        directory: &Path,
        recursive: bool,
        output: &mut dyn FnMut(&str),
    ) -> OrganizeResult<DuplicateGroups> {
        ensure_directory(directory)?;

        let candidates = self.candidates(directory, recursive, output);
        output(&format!("Scanning {} files for duplicates...", candidates.len()));

        let mut by_digest: HashMap<ContentDigest, Vec<Candidate>> = HashMap::new();
        for candidate in candidates {
            match hash_file(&candidate.path, self.config.hash_buffer_size) {
                Ok(digest) => by_digest.entry(digest).or_default().push(candidate),
                Err(e) => {
                    warn!(path = %candidate.path.display(), error = %e, "could not hash file");
                    output(&format!(
                        "  [WARNING] Could not read {}: {}",
                        display_name(&candidate.path),
                        e
                    ));
                }
            }
        }

        let groups: DuplicateGroups = by_digest
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(digest, mut members)| {
                members.sort_by(|a, b| {
                    a.modified
                        .cmp(&b.modified)
                        .then_with(|| a.path.cmp(&b.path))
                });
                (digest, members.into_iter().map(|c| c.path).collect())
            })
            .collect();

        debug!(groups = groups.len(), "duplicate scan finished");
        Ok(groups)
    }

    /// Lists the files eligible for hashing, in file name order.
    fn candidates(
        &self,
        directory: &Path,
        recursive: bool,
        output: &mut dyn FnMut(&str),
    ) -> Vec<Candidate> {
        let max_depth = if recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(directory)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_skipped_name(entry.file_name()));

        let mut candidates = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "could not walk entry");
                    output(&format!("  [WARNING] Could not scan entry: {}", e));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(directory).unwrap_or(entry.path());
            if self.filters.is_excluded(relative) {
                debug!(path = %relative.display(), "excluded by filter rules");
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    output(&format!(
                        "  [WARNING] Could not read {}: {}",
                        display_name(entry.path()),
                        e
                    ));
                    continue;
                }
            };

            // Empty files all share one digest and free no space.
            if metadata.len() == 0 {
                continue;
            }

            candidates.push(Candidate {
                path: entry.into_path(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        candidates
    }

    fn is_skipped_name(&self, name: &std::ffi::OsStr) -> bool {
        let name = name.to_string_lossy();
        self.config.is_hidden(&name) || self.config.is_special_folder(&name)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::time::Duration;
    use tempfile::TempDir;

    fn set_mtime(path: &Path, secs_since_epoch: u64) {
        File::options()
            .write(true)
            .open(path)
            .and_then(|f| {
                f.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs_since_epoch))
            })
            .expect("Failed to set mtime");
    }

    fn find(directory: &Path, recursive: bool) -> (DuplicateGroups, Vec<String>) {
        let config = OrganizerConfig::default();
        let filters = config.compile_filters().unwrap();
        let mut lines = Vec::new();
        let groups = DuplicateFinder::new(&config, &filters)
            .find(directory, recursive, &mut |line: &str| lines.push(line.to_string()))
            .expect("scan failed");
        (groups, lines)
    }

    #[test]
    fn test_groups_identical_files() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("a.txt"), "same").unwrap();
        fs::write(base.join("b.txt"), "same").unwrap();
        fs::write(base.join("c.txt"), "different").unwrap();

        let (groups, lines) = find(base, true);

        assert_eq!(groups.len(), 1);
        let members = groups.values().next().unwrap();
        assert_eq!(members.len(), 2);
        assert!(lines.iter().any(|l| l == "Scanning 3 files for duplicates..."));
    }

    #[test]
    fn test_orders_by_mtime_then_path() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        for name in ["z.txt", "m.txt", "a.txt"] {
            fs::write(base.join(name), "copy").unwrap();
        }
        set_mtime(&base.join("z.txt"), 1_000);
        set_mtime(&base.join("m.txt"), 2_000);
        set_mtime(&base.join("a.txt"), 2_000);

        let (groups, _) = find(base, true);
        let members = groups.values().next().unwrap();

        assert_eq!(
            members,
            &vec![base.join("z.txt"), base.join("a.txt"), base.join("m.txt")]
        );
    }

    #[test]
    fn test_skips_empty_hidden_and_special() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("empty1.txt"), "").unwrap();
        fs::write(base.join("empty2.txt"), "").unwrap();
        fs::write(base.join("keep.txt"), "dup").unwrap();
        fs::write(base.join(".hidden.txt"), "dup").unwrap();
        fs::create_dir(base.join("_Duplicates")).unwrap();
        fs::write(base.join("_Duplicates").join("keep.txt"), "dup").unwrap();
        fs::create_dir(base.join(".git")).unwrap();
        fs::write(base.join(".git").join("blob"), "dup").unwrap();

        let (groups, lines) = find(base, true);

        assert!(groups.is_empty());
        assert!(lines.iter().any(|l| l == "Scanning 1 files for duplicates..."));
    }

    #[test]
    fn test_recursive_finds_nested_copies() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::create_dir_all(base.join("photos").join("2024")).unwrap();
        fs::write(base.join("img.jpg"), "pixels").unwrap();
        fs::write(base.join("photos").join("2024").join("img.jpg"), "pixels").unwrap();

        let (recursive, _) = find(base, true);
        assert_eq!(recursive.len(), 1);

        let (flat, _) = find(base, false);
        assert!(flat.is_empty());
    }

    #[test]
    fn test_excluded_files_are_not_hashed() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("a.part"), "same").unwrap();
        fs::write(base.join("b.part"), "same").unwrap();

        let mut config = OrganizerConfig::default();
        config.filters.exclude.extensions = vec!["part".to_string()];
        let filters = config.compile_filters().unwrap();

        let groups = DuplicateFinder::new(&config, &filters)
            .find(base, true, &mut |_: &str| {})
            .unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_invalid_directory() {
        let config = OrganizerConfig::default();
        let filters = config.compile_filters().unwrap();
        let result = DuplicateFinder::new(&config, &filters).find(
            Path::new("/non/existent/path"),
            true,
            &mut |_: &str| {},
        );
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_is_reported_and_left_out() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        for name in ["a.txt", "b.txt", "locked.txt"] {
            fs::write(base.join(name), "same").unwrap();
        }
        let locked = base.join("locked.txt");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if File::open(&locked).is_ok() {
            // Running as root: permissions are not enforced.
            return;
        }

        let (groups, lines) = find(base, true);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

        assert_eq!(groups.len(), 1);
        let members = groups.values().next().unwrap();
        assert_eq!(members.len(), 2);
        assert!(!members.contains(&locked));
        assert!(lines.iter().any(|l| l == "Scanning 3 files for duplicates..."));
        assert!(
            lines
                .iter()
                .any(|l| l.starts_with("  [WARNING] Could not read locked.txt: "))
        );
    }
}
