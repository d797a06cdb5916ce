//! Extension to category lookup used by suffix classification.
//!
//! The built-in table maps lowercase extensions to folder names such as
//! `"images"` or `"pdfs"`. User supplied entries from the configuration are
//! consulted first, so they can both add categories and steal extensions
//! from built-in ones.
//!
//! # Examples
//!
//! ```
//! use dirsweep::file_category::CategoryTable;
//!
//! let table = CategoryTable::default();
//! assert_eq!(table.category_for("PDF"), Some("pdfs"));
//! assert_eq!(table.category_for(".jpg"), Some("images"));
//! assert_eq!(table.category_for("xyz"), None);
//! ```
use std::collections::{BTreeMap, HashMap};

/// Built-in categories in lookup order, each with its extensions.
pub const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    ("audio", &["mp3", "wav", "raw", "wma", "mid", "midi"]),
    (
        "video",
        &[
            "mp4", "mpg", "mpeg", "avi", "mov", "flv", "mkv", "mwv", "m4v", "h264",
        ],
    ),
    (
        "images",
        &[
            "png", "jpg", "jpeg", "gif", "svg", "bmp", "psd", "tiff", "tif", "heic",
        ],
    ),
    (
        "compressed",
        &["zip", "z", "7z", "rar", "tar", "gz", "rpm", "pkg", "deb"],
    ),
    ("installation", &["dmg", "exe", "iso"]),
    ("csvs", &["csv"]),
    (
        "docs",
        &[
            "txt", "ods", "doc", "docx", "html", "odt", "tex", "ppt", "pptx", "log",
        ],
    ),
    ("pdfs", &["pdf"]),
    ("excel_files", &["xls", "xlsx"]),
    ("sql", &["sql", "sqlite"]),
    ("markdown", &["md"]),
    ("python", &["py", "ipynb"]),
    ("ableton", &["als"]),
];

/// Maps file extensions to category folder names.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    extension_map: HashMap<String, String>,
}

impl CategoryTable {
    /// Creates a table holding only the built-in categories.
    pub fn new() -> Self {
        let mut table = Self {
            extension_map: HashMap::new(),
        };
        for (category, extensions) in DEFAULT_CATEGORIES {
            for ext in *extensions {
                table.insert_if_absent(ext, category);
            }
        }
        table
    }

    /// Creates a table where `overrides` take precedence over the built-in
    /// categories.
    pub fn with_overrides(overrides: &BTreeMap<String, Vec<String>>) -> Self {
        let mut table = Self {
            extension_map: HashMap::new(),
        };
        for (category, extensions) in overrides {
            for ext in extensions {
                table.insert_if_absent(ext, category);
            }
        }
        for (category, extensions) in DEFAULT_CATEGORIES {
            for ext in *extensions {
                table.insert_if_absent(ext, category);
            }
        }
        table
    }

    // First entry wins so an extension belongs to at most one category.
    fn insert_if_absent(&mut self, ext: &str, category: &str) {
        self.extension_map
            .entry(normalize_extension(ext))
            .or_insert_with(|| category.to_string());
    }

    /// Looks up the category for an extension, ignoring case and a leading dot.
    pub fn category_for(&self, ext: &str) -> Option<&str> {
        self.extension_map
            .get(&normalize_extension(ext))
            .map(String::as_str)
    }

    /// Number of extensions known to the table.
    pub fn len(&self) -> usize {
        self.extension_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extension_map.is_empty()
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookups() {
        let table = CategoryTable::default();
        assert_eq!(table.category_for("mp3"), Some("audio"));
        assert_eq!(table.category_for("mkv"), Some("video"));
        assert_eq!(table.category_for("heic"), Some("images"));
        assert_eq!(table.category_for("7z"), Some("compressed"));
        assert_eq!(table.category_for("dmg"), Some("installation"));
        assert_eq!(table.category_for("csv"), Some("csvs"));
        assert_eq!(table.category_for("txt"), Some("docs"));
        assert_eq!(table.category_for("pdf"), Some("pdfs"));
        assert_eq!(table.category_for("xlsx"), Some("excel_files"));
        assert_eq!(table.category_for("sqlite"), Some("sql"));
        assert_eq!(table.category_for("md"), Some("markdown"));
        assert_eq!(table.category_for("ipynb"), Some("python"));
        assert_eq!(table.category_for("als"), Some("ableton"));
    }

    #[test]
    fn test_lookup_ignores_case_and_dot() {
        let table = CategoryTable::default();
        assert_eq!(table.category_for("JPG"), Some("images"));
        assert_eq!(table.category_for(".Pdf"), Some("pdfs"));
    }

    #[test]
    fn test_unknown_and_empty_extensions() {
        let table = CategoryTable::default();
        assert_eq!(table.category_for("rs"), None);
        assert_eq!(table.category_for(""), None);
    }

    #[test]
    fn test_every_extension_maps_to_one_category() {
        let table = CategoryTable::default();
        let distinct: std::collections::HashSet<_> = DEFAULT_CATEGORIES
            .iter()
            .flat_map(|(_, exts)| exts.iter())
            .collect();
        assert_eq!(table.len(), distinct.len());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut overrides = BTreeMap::new();
        overrides.insert("notebooks".to_string(), vec!["IPYNB".to_string()]);
        overrides.insert("rust".to_string(), vec!["rs".to_string()]);

        let table = CategoryTable::with_overrides(&overrides);
        assert_eq!(table.category_for("ipynb"), Some("notebooks"));
        assert_eq!(table.category_for("rs"), Some("rust"));
        assert_eq!(table.category_for("py"), Some("python"));
    }
}
