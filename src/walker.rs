//! Lazy traversal of the regular files below a root directory.

use crate::config::CompiledFilters;
use crate::error::{SweepError, SweepResult, is_transient};
use crate::file_descriptor::{CreationTimeFn, FileDescriptor, platform_creation_time};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Makes `root` absolute without resolving symlinks and checks that it is
/// a directory.
pub fn checked_root(root: &Path) -> SweepResult<PathBuf> {
    let absolute = std::path::absolute(root).map_err(|e| SweepError::io(root, e))?;
    if !absolute.is_dir() {
        return Err(SweepError::NotADirectory { path: absolute });
    }
    Ok(absolute)
}

/// Walks `root`, yielding its regular files.
///
/// Shallow walks only look at direct children. Entries are visited in file
/// name order so an unchanged tree always walks the same way.
///
/// # Errors
///
/// Fails with [`SweepError::NotADirectory`] before anything is read if
/// `root` is missing or not a directory.
pub fn walk(root: &Path, shallow: bool) -> SweepResult<FileWalk> {
    walk_filtered(root, shallow, CompiledFilters::allow_all())
}

/// Like [`walk`], hiding files rejected by `filters`.
pub fn walk_filtered(root: &Path, shallow: bool, filters: CompiledFilters) -> SweepResult<FileWalk> {
    let root = checked_root(root)?;

    let mut walker = WalkDir::new(&root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();
    if shallow {
        walker = walker.max_depth(1);
    }

    Ok(FileWalk {
        root,
        entries: walker.into_iter(),
        filters,
        skipped_dirs: Vec::new(),
        creation_time: platform_creation_time,
        skipped: 0,
    })
}

/// Iterator over the files of one walk.
///
/// Races with other processes (an entry vanishing mid-walk) are logged and
/// counted in [`FileWalk::skipped`]; any other I/O error is yielded.
pub struct FileWalk {
    root: PathBuf,
    entries: walkdir::IntoIter,
    filters: CompiledFilters,
    skipped_dirs: Vec<PathBuf>,
    creation_time: CreationTimeFn,
    skipped: usize,
}

impl FileWalk {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Leaves the subtree at `dir` out of the walk.
    pub fn skip_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.skipped_dirs.push(dir.into());
        self
    }

    /// Hands out descriptors that read creation times through `creation_time`.
    pub fn with_creation_time(mut self, creation_time: CreationTimeFn) -> Self {
        self.creation_time = creation_time;
        self
    }

    /// Entries dropped so far because they vanished or changed type.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn is_regular_file(entry: &DirEntry) -> bool {
        let file_type = entry.file_type();
        if file_type.is_file() {
            return true;
        }
        // A symlink counts when its target is a regular file.
        file_type.is_symlink() && entry.path().is_file()
    }
}

impl Iterator for FileWalk {
    type Item = SweepResult<FileDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    match err.into_io_error() {
                        Some(io_err) if is_transient(&io_err) => {
                            tracing::debug!("Skipping vanished entry {}", path.display());
                            self.skipped += 1;
                            continue;
                        }
                        Some(io_err) => return Some(Err(SweepError::io(path, io_err))),
                        None => {
                            tracing::warn!("Skipping symlink loop at {}", path.display());
                            self.skipped += 1;
                            continue;
                        }
                    }
                }
            };

            if entry.file_type().is_dir() && self.skipped_dirs.iter().any(|d| d == entry.path()) {
                self.entries.skip_current_dir();
                continue;
            }

            if !Self::is_regular_file(&entry) {
                continue;
            }

            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            if !self.filters.should_include(relative) {
                tracing::trace!("Filtered out {}", entry.path().display());
                continue;
            }

            let is_symlink = entry.file_type().is_symlink();
            return Some(Ok(FileDescriptor::new(entry.into_path())
                .with_symlink(is_symlink)
                .with_creation_time(self.creation_time)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SweepConfig;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("b.txt"), "b").unwrap();
        fs::write(root.join("a.pdf"), "a").unwrap();
        fs::create_dir_all(root.join("nested/deeper")).unwrap();
        fs::write(root.join("nested/c.jpg"), "c").unwrap();
        fs::write(root.join("nested/deeper/d.mp3"), "d").unwrap();
        fs::create_dir(root.join("empty")).unwrap();
        temp_dir
    }

    fn names(walk: FileWalk) -> Vec<String> {
        let root = walk.root().to_path_buf();
        walk.map(|d| {
            d.unwrap()
                .path()
                .strip_prefix(&root)
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect()
    }

    #[test]
    fn test_shallow_walk_yields_direct_files_only() {
        let temp_dir = fixture();
        let walk = walk(temp_dir.path(), true).unwrap();
        assert_eq!(names(walk), vec!["a.pdf", "b.txt"]);
    }

    #[test]
    fn test_deep_walk_is_sorted_and_skips_directories() {
        let temp_dir = fixture();
        let walk = walk(temp_dir.path(), false).unwrap();
        assert_eq!(
            names(walk),
            vec!["a.pdf", "b.txt", "nested/c.jpg", "nested/deeper/d.mp3"]
        );
    }

    #[test]
    fn test_walk_is_repeatable() {
        let temp_dir = fixture();
        let first = names(walk(temp_dir.path(), false).unwrap());
        let second = names(walk(temp_dir.path(), false).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_root_fails_up_front() {
        let temp_dir = TempDir::new().unwrap();
        let result = walk(&temp_dir.path().join("missing"), false);
        assert!(matches!(result, Err(SweepError::NotADirectory { .. })));
    }

    #[test]
    fn test_file_root_is_not_a_directory() {
        let temp_dir = fixture();
        let result = walk(&temp_dir.path().join("a.pdf"), true);
        assert!(matches!(result, Err(SweepError::NotADirectory { .. })));
    }

    #[test]
    fn test_filters_use_root_relative_paths() {
        let temp_dir = fixture();
        let filters = SweepConfig::from_toml("[filters.exclude]\npatterns = [\"nested/**\"]")
            .unwrap()
            .compile_filters()
            .unwrap();
        let walk = walk_filtered(temp_dir.path(), false, filters).unwrap();
        assert_eq!(names(walk), vec!["a.pdf", "b.txt"]);
    }

    #[test]
    fn test_skip_dir_hides_subtree() {
        let temp_dir = fixture();
        let root = std::path::absolute(temp_dir.path()).unwrap();
        let walk = walk(&root, false).unwrap().skip_dir(root.join("nested"));
        assert_eq!(names(walk), vec!["a.pdf", "b.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_follow_platform_file_check() {
        let temp_dir = fixture();
        let root = temp_dir.path();
        std::os::unix::fs::symlink(root.join("a.pdf"), root.join("link.pdf")).unwrap();
        std::os::unix::fs::symlink(root.join("nested"), root.join("linkdir")).unwrap();

        let walk = walk(root, false).unwrap();
        let found = names(walk);
        assert!(found.contains(&"link.pdf".to_string()));
        assert!(!found.iter().any(|n| n.starts_with("linkdir")));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_are_marked() {
        let temp_dir = fixture();
        let root = temp_dir.path();
        std::os::unix::fs::symlink(root.join("a.pdf"), root.join("link.pdf")).unwrap();

        let links: Vec<(String, bool)> = walk(root, true)
            .unwrap()
            .map(|d| {
                let d = d.unwrap();
                (d.path().file_name().unwrap().to_string_lossy().into_owned(), d.is_symlink())
            })
            .collect();
        assert!(links.contains(&("link.pdf".to_string(), true)));
        assert!(links.contains(&("a.pdf".to_string(), false)));
    }
}
