/// File categorization by extension.
///
/// This module maps a file extension to the category label whose folder the
/// file belongs in. The table comes from [`OrganizerConfig::categories`];
/// anything the table does not know lands in the default category.
///
/// # Examples
///
/// ```
/// use dirsort::config::OrganizerConfig;
/// use dirsort::file_category::Classifier;
///
/// let config = OrganizerConfig::default();
/// let classifier = Classifier::new(&config).unwrap();
/// assert_eq!(classifier.classify(".JPG"), "Images");
/// assert_eq!(classifier.classify(".pdf"), "Documents");
/// assert_eq!(classifier.classify(".xyz"), "Other");
/// ```
use crate::config::{ConfigError, OrganizerConfig};
use std::collections::HashMap;
use std::path::Path;

/// Maps file extensions to category labels.
///
/// Built once per run from a validated configuration, so every extension
/// resolves to exactly one category.
#[derive(Debug, Clone)]
pub struct Classifier {
    extension_map: HashMap<String, String>,
    default_category: String,
}

impl Classifier {
    /// Creates a classifier from the configuration's category table.
    ///
    /// # Errors
    ///
    /// Fails if the configuration does not validate, most notably when two
    /// categories claim the same extension.
    pub fn new(config: &OrganizerConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut classifier = Self {
            extension_map: HashMap::new(),
            default_category: config.default_category.clone(),
        };
        for rule in &config.categories {
            for ext in &rule.extensions {
                classifier.add_extension_mapping(ext, &rule.name);
            }
        }
        Ok(classifier)
    }

    fn add_extension_mapping(&mut self, ext: &str, category: &str) {
        self.extension_map
            .insert(ext.to_lowercase(), category.to_string());
    }

    /// Maps an extension (with its leading dot) to a category label.
    ///
    /// Total: unknown and empty extensions map to the default category.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirsort::config::OrganizerConfig;
    /// use dirsort::file_category::Classifier;
    ///
    /// let classifier = Classifier::new(&OrganizerConfig::default()).unwrap();
    /// assert_eq!(classifier.classify(".Mp3"), "Audio");
    /// assert_eq!(classifier.classify(""), "Other");
    /// ```
    pub fn classify(&self, extension: &str) -> &str {
        self.extension_map
            .get(&extension.to_lowercase())
            .map(String::as_str)
            .unwrap_or(self.default_category.as_str())
    }

    /// Category for a path, based on its extension.
    pub fn classify_path(&self, path: &Path) -> &str {
        self.classify(&extension_of(path))
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }
}

/// Maps an extension to a category by walking the configuration in order.
///
/// Returns the first category whose set contains the lowercased extension,
/// or the default category.
pub fn classify<'a>(extension: &str, config: &'a OrganizerConfig) -> &'a str {
    let ext_lower = extension.to_lowercase();
    config
        .categories
        .iter()
        .find(|rule| rule.extensions.contains(&ext_lower))
        .map(|rule| rule.name.as_str())
        .unwrap_or(config.default_category.as_str())
}

/// Lowercase extension of a path including the leading dot.
///
/// Returns an empty string when the name has no extension. Dotfiles such as
/// `.bashrc` have no extension; `archive.tar.gz` has `.gz`.
pub fn extension_of(path: &Path) -> String {
    match path.extension() {
        Some(ext) if !ext.is_empty() => format!(".{}", ext.to_string_lossy().to_lowercase()),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryRule;
    use std::collections::BTreeSet;

    fn classifier() -> Classifier {
        Classifier::new(&OrganizerConfig::default()).unwrap()
    }

    #[test]
    fn test_known_extensions() {
        let classifier = classifier();
        assert_eq!(classifier.classify(".jpg"), "Images");
        assert_eq!(classifier.classify(".pdf"), "Documents");
        assert_eq!(classifier.classify(".mp3"), "Audio");
        assert_eq!(classifier.classify(".mkv"), "Video");
        assert_eq!(classifier.classify(".7z"), "Archives");
        assert_eq!(classifier.classify(".rs"), "Code");
        assert_eq!(classifier.classify(".dmg"), "Executables");
        assert_eq!(classifier.classify(".woff2"), "Fonts");
    }

    #[test]
    fn test_classify_case_insensitive() {
        let classifier = classifier();
        assert_eq!(classifier.classify_path(Path::new("IMG.JPG")), "Images");
        assert_eq!(classifier.classify_path(Path::new("img.jpg")), "Images");
        assert_eq!(classifier.classify(".Pdf"), "Documents");
    }

    #[test]
    fn test_unknown_and_empty_go_to_default() {
        let classifier = classifier();
        assert_eq!(classifier.classify(".xyz"), "Other");
        assert_eq!(classifier.classify(""), "Other");
        assert_eq!(classifier.classify_path(Path::new("Makefile")), "Other");
        assert_eq!(classifier.default_category(), "Other");
    }

    #[test]
    fn test_free_function_matches_classifier() {
        let config = OrganizerConfig::default();
        let classifier = Classifier::new(&config).unwrap();
        for ext in [".jpg", ".TXT", ".json", ".unknown", ""] {
            assert_eq!(classify(ext, &config), classifier.classify(ext));
        }
    }

    #[test]
    fn test_classifier_rejects_overlap() {
        let mut config = OrganizerConfig::default();
        config.categories.push(CategoryRule {
            name: "Notes".to_string(),
            extensions: BTreeSet::from([".txt".to_string()]),
        });

        assert!(matches!(
            Classifier::new(&config),
            Err(ConfigError::OverlappingExtension { .. })
        ));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("photo.JPG")), ".jpg");
        assert_eq!(extension_of(Path::new("archive.tar.gz")), ".gz");
        assert_eq!(extension_of(Path::new(".bashrc")), "");
        assert_eq!(extension_of(Path::new("README")), "");
        assert_eq!(extension_of(Path::new("/tmp/dir.d/notes.md")), ".md");
    }
}
