//! Organizer configuration and user exclusion rules.
//!
//! Every threshold, reserved folder name and category table the organizer uses
//! lives in [`OrganizerConfig`]. A configuration value is immutable once
//! loaded and is passed explicitly to every operation.
//!
//! # Configuration File Format
//!
//! Configuration is stored in TOML. Every key is optional; missing keys fall
//! back to the built-in defaults:
//!
//! ```toml
//! archive_age_days = 30
//! auto_delete_age_days = 1
//! auto_delete_extensions = [".ica"]
//! large_file_threshold_bytes = 1073741824
//! recents_age_hours = 24.0
//!
//! [[categories]]
//! name = "Images"
//! extensions = [".jpg", ".png"]
//!
//! [filters.exclude]
//! filenames = ["Thumbs.db"]
//! patterns = ["*.part"]
//! extensions = ["crdownload"]
//! regex = []
//! ```

use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".dirsortrc.toml";

/// Errors that can occur while loading, validating or compiling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid glob pattern provided.
    #[error("Invalid glob pattern '{0}': expected *.ext or dir/**")]
    InvalidGlobPattern(String),

    /// Invalid regex pattern provided with the actual error reason.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    /// The same extension is claimed by two categories.
    #[error("Extension '{extension}' is listed under both '{first}' and '{second}'")]
    OverlappingExtension {
        extension: String,
        first: String,
        second: String,
    },

    /// An extension is not lowercase or lacks its leading dot.
    #[error("Extension '{extension}' in {owner} must be lowercase and start with '.'")]
    InvalidExtension { extension: String, owner: String },

    /// A reserved folder does not carry the special folder prefix.
    #[error("Reserved folder '{folder}' must start with the special folder prefix '{prefix}'")]
    UnprefixedReservedFolder { folder: String, prefix: String },

    /// The special folder prefix is empty, which would exempt every folder from scans.
    #[error("special_folder_prefix must not be empty")]
    EmptySpecialFolderPrefix,

    /// Hashing cannot make progress with an empty buffer.
    #[error("hash_buffer_size must be greater than zero")]
    ZeroHashBuffer,
}

/// A category label and the extensions that map to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Folder name files of this category are moved into.
    pub name: String,
    /// Lowercase extensions including the leading dot (e.g. `".jpg"`).
    pub extensions: BTreeSet<String>,
}

impl CategoryRule {
    fn new(name: &str, extensions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}

/// Configuration for every organizer operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizerConfig {
    /// Ordered category table.
    pub categories: Vec<CategoryRule>,
    /// Category used when no rule matches.
    pub default_category: String,

    /// Files older than this many whole days are archived.
    pub archive_age_days: u32,
    pub archive_folder: String,

    /// Extensions eligible for deletion during cleanup.
    pub auto_delete_extensions: BTreeSet<String>,
    /// Deletable files must be older than this many whole days.
    pub auto_delete_age_days: u32,

    /// Files strictly larger than this are set aside for review.
    pub large_file_threshold_bytes: u64,
    pub large_files_folder: String,

    /// Files newer than this many hours go to the recents folder when enabled.
    pub recents_age_hours: f64,
    pub recents_folder: String,

    pub duplicates_folder: String,
    /// Chunk size used when streaming file contents through the hasher.
    pub hash_buffer_size: usize,

    /// Folders whose name starts with this prefix are never scanned.
    pub special_folder_prefix: String,

    /// User exclusion rules.
    pub filters: FilterRules,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            default_category: "Other".to_string(),
            archive_age_days: 30,
            archive_folder: "_Archive".to_string(),
            auto_delete_extensions: BTreeSet::from([".ica".to_string()]),
            auto_delete_age_days: 1,
            large_file_threshold_bytes: 1024 * 1024 * 1024,
            large_files_folder: "_LargeFiles".to_string(),
            recents_age_hours: 24.0,
            recents_folder: "_Recents".to_string(),
            duplicates_folder: "_Duplicates".to_string(),
            hash_buffer_size: 8192,
            special_folder_prefix: "_".to_string(),
            filters: FilterRules::default(),
        }
    }
}

fn default_categories() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(
            "Images",
            &[
                ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".webp", ".ico", ".tiff", ".heic",
            ],
        ),
        CategoryRule::new(
            "Documents",
            &[
                ".pdf", ".doc", ".docx", ".txt", ".rtf", ".odt", ".xls", ".xlsx", ".ppt", ".pptx",
                ".csv",
            ],
        ),
        CategoryRule::new(
            "Audio",
            &[".mp3", ".wav", ".flac", ".aac", ".ogg", ".wma", ".m4a"],
        ),
        CategoryRule::new(
            "Video",
            &[".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm", ".m4v"],
        ),
        CategoryRule::new(
            "Archives",
            &[".zip", ".rar", ".7z", ".tar", ".gz", ".bz2", ".xz"],
        ),
        CategoryRule::new(
            "Code",
            &[
                ".py", ".js", ".ts", ".html", ".css", ".json", ".xml", ".yml", ".yaml", ".md",
                ".sh", ".c", ".cpp", ".h", ".java", ".go", ".rs",
            ],
        ),
        CategoryRule::new(
            "Executables",
            &[".exe", ".msi", ".dmg", ".app", ".deb", ".rpm"],
        ),
        CategoryRule::new("Fonts", &[".ttf", ".otf", ".woff", ".woff2"]),
    ]
}

impl OrganizerConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.dirsortrc.toml` in the current directory
    /// 3. Look for `~/.config/dirsort/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// Whatever is loaded is validated before it is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read,
    /// or if the loaded configuration violates an invariant.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("dirsort")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load and validate configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if file does not exist.
    /// Returns `ConfigError::ConfigInvalid` if TOML parsing fails.
    /// Returns `ConfigError::IoError` if file cannot be read.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants every operation relies on.
    ///
    /// # Errors
    ///
    /// * an extension that is not lowercase or lacks a leading dot
    /// * an extension claimed by two categories
    /// * a reserved folder without the special folder prefix
    /// * an empty prefix or a zero hash buffer
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.special_folder_prefix.is_empty() {
            return Err(ConfigError::EmptySpecialFolderPrefix);
        }
        if self.hash_buffer_size == 0 {
            return Err(ConfigError::ZeroHashBuffer);
        }

        for folder in self.reserved_folders() {
            if !self.is_special_folder(folder) {
                return Err(ConfigError::UnprefixedReservedFolder {
                    folder: folder.to_string(),
                    prefix: self.special_folder_prefix.clone(),
                });
            }
        }

        let mut owners: HashMap<&str, &str> = HashMap::new();
        for rule in &self.categories {
            for extension in &rule.extensions {
                check_extension(extension, || format!("category '{}'", rule.name))?;
                if let Some(first) = owners.insert(extension.as_str(), rule.name.as_str()) {
                    return Err(ConfigError::OverlappingExtension {
                        extension: extension.clone(),
                        first: first.to_string(),
                        second: rule.name.clone(),
                    });
                }
            }
        }

        for extension in &self.auto_delete_extensions {
            check_extension(extension, || "auto_delete_extensions".to_string())?;
        }

        Ok(())
    }

    /// The four reserved folder names, in a fixed order.
    pub fn reserved_folders(&self) -> [&str; 4] {
        [
            self.archive_folder.as_str(),
            self.large_files_folder.as_str(),
            self.recents_folder.as_str(),
            self.duplicates_folder.as_str(),
        ]
    }

    /// Every folder name the organize pass can create for a category.
    pub fn category_folders(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .map(|rule| rule.name.as_str())
            .chain(std::iter::once(self.default_category.as_str()))
    }

    /// Check if a folder name is a special folder (starts with the prefix).
    pub fn is_special_folder(&self, name: &str) -> bool {
        name.starts_with(&self.special_folder_prefix)
    }

    /// Check if a file or folder name is hidden (starts with a dot).
    pub fn is_hidden(&self, name: &str) -> bool {
        name.starts_with('.')
    }

    /// Compile the exclusion rules into matchers.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

fn check_extension(extension: &str, owner: impl FnOnce() -> String) -> Result<(), ConfigError> {
    let well_formed = extension.len() > 1
        && extension.starts_with('.')
        && extension.to_lowercase() == extension;
    if well_formed {
        Ok(())
    } else {
        Err(ConfigError::InvalidExtension {
            extension: extension.to_string(),
            owner: owner(),
        })
    }
}

/// Root-level filter rules configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,
}

/// Rules for excluding files from every operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., "Thumbs.db", "desktop.ini").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the path relative to the scanned directory.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude, with or without the dot (e.g., "part", ".crdownload").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Compiled exclusion rules.
///
/// Glob and regex patterns are parsed once here rather than on every file.
#[derive(Debug, Default)]
pub struct CompiledFilters {
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = rules
            .exclude
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
        })
    }

    /// Check if a file is excluded by the user's rules.
    ///
    /// `relative_path` is the file's path relative to the scanned directory.
    /// Checks run in order with early termination: exact filename, extension,
    /// glob pattern, regex on the file name.
    pub fn is_excluded(&self, relative_path: &Path) -> bool {
        let file_name = relative_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return true;
        }

        if let Some(ext) = relative_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return true;
            }
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(relative_path))
        {
            return true;
        }

        self.exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
    }
}
