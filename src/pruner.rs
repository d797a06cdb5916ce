//! Removal of directories left empty by a move or purge.

use crate::error::{SweepError, SweepResult, is_transient};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories removed by one prune pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneReport {
    pub removed: Vec<PathBuf>,
}

/// Deletes empty directories below a root, deepest first.
#[derive(Debug, Clone)]
pub struct Pruner {
    inert_files: HashSet<String>,
    skipped_dirs: Vec<PathBuf>,
}

impl Pruner {
    /// A pruner that treats the given file names as non-content.
    pub fn new<I, S>(inert_files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inert_files: inert_files.into_iter().map(Into::into).collect(),
            skipped_dirs: Vec::new(),
        }
    }

    /// Leaves the subtree at `dir` untouched, `dir` included.
    pub fn skip_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.skipped_dirs.push(dir.into());
        self
    }

    /// True when `dir` has no entries, or only inert ones.
    ///
    /// A directory that can no longer be read because it vanished counts as
    /// not empty, so it is left alone.
    pub fn is_effectively_empty(&self, dir: &Path) -> SweepResult<bool> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if is_transient(&e) => return Ok(false),
            Err(e) => return Err(SweepError::io(dir, e)),
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if is_transient(&e) => continue,
                Err(e) => return Err(SweepError::io(dir, e)),
            };
            if !self.inert_files.contains(entry.file_name().to_string_lossy().as_ref()) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Removes every effectively empty directory below `root`.
    ///
    /// Directories are handled deepest first so a parent whose only child
    /// was pruned goes in the same pass. `root` itself is never removed, and
    /// symlinks to directories are not followed. Removal takes inert files
    /// with it.
    pub fn prune(&self, root: &Path) -> SweepResult<PruneReport> {
        let mut directories: Vec<(usize, PathBuf)> = Vec::new();
        let entries = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !self.skipped_dirs.iter().any(|d| d == entry.path()));
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    match err.into_io_error() {
                        Some(e) if is_transient(&e) => continue,
                        Some(e) => return Err(SweepError::io(path, e)),
                        None => continue,
                    }
                }
            };
            if entry.file_type().is_dir() {
                directories.push((entry.depth(), entry.into_path()));
            }
        }

        directories.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let mut report = PruneReport::default();
        for (_, dir) in directories {
            if !self.is_effectively_empty(&dir)? {
                continue;
            }
            match fs::remove_dir_all(&dir) {
                Ok(()) => {
                    tracing::debug!("Pruned empty directory {}", dir.display());
                    report.removed.push(dir);
                }
                Err(e) if is_transient(&e) => {
                    tracing::debug!("Directory {} vanished before pruning", dir.display());
                }
                Err(e) => return Err(SweepError::Removal { path: dir, source: e }),
            }
        }

        Ok(report)
    }
}

impl Default for Pruner {
    fn default() -> Self {
        Self::new([".DS_Store"])
    }
}

/// Prunes `root` with the default inert file set.
pub fn prune(root: &Path) -> SweepResult<PruneReport> {
    Pruner::default().prune(root)
}
