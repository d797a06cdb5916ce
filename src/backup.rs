//! Copying a directory tree aside before it is reorganized or purged.

use crate::error::{SweepError, SweepResult, is_transient};
use crate::walker::checked_root;
use serde::Serialize;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// How the destination is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupMode {
    /// The destination must not exist yet.
    CreateNew,
    /// Copy into the destination, creating it if needed. Existing files with
    /// the same relative path are overwritten; nothing is deleted.
    Merge,
}

/// Totals of one backup.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackupReport {
    pub files_copied: usize,
    pub bytes_copied: u64,
    pub dirs_created: usize,
}

/// Copies every entry of `source` into `destination`.
///
/// A destination nested inside `source` is skipped while walking so the
/// backup never copies itself.
///
/// # Errors
///
/// - [`SweepError::NotADirectory`] if `source` is not a directory.
/// - [`SweepError::BackupDestinationExists`] in [`BackupMode::CreateNew`]
///   when `destination` exists.
/// - [`SweepError::BackupIntoSource`] when `destination` is `source` or one
///   of its ancestors.
pub fn backup_dir(source: &Path, destination: &Path, mode: BackupMode) -> SweepResult<BackupReport> {
    let source = checked_root(source)?;
    let destination = std::path::absolute(destination).map_err(|e| SweepError::io(destination, e))?;

    if mode == BackupMode::CreateNew && destination.exists() {
        return Err(SweepError::BackupDestinationExists { path: destination });
    }

    let source_real = fs::canonicalize(&source).map_err(|e| SweepError::io(&source, e))?;
    let mut report = BackupReport::default();

    if !destination.exists() {
        fs::create_dir_all(&destination).map_err(|e| SweepError::DirectoryCreation {
            path: destination.clone(),
            source: e,
        })?;
        report.dirs_created += 1;
    }
    let destination_real =
        fs::canonicalize(&destination).map_err(|e| SweepError::io(&destination, e))?;

    if source_real.starts_with(&destination_real) {
        return Err(SweepError::BackupIntoSource { path: destination });
    }

    let entries = WalkDir::new(&source)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && fs::canonicalize(entry.path()).is_ok_and(|p| p == destination_real))
        });

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

        let Ok(relative) = entry.path().strip_prefix(&source) else {
            continue;
        };
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if !target.is_dir() {
                fs::create_dir_all(&target).map_err(|e| SweepError::DirectoryCreation {
                    path: target.clone(),
                    source: e,
                })?;
                report.dirs_created += 1;
            }
            continue;
        }

        if file_type.is_symlink() && !entry.path().is_file() {
            tracing::warn!("Not copying symlink to a non-file {}", entry.path().display());
            continue;
        }

        if let Some(bytes) = copy_file(entry.path(), &target)? {
            report.files_copied += 1;
            report.bytes_copied += bytes;
        }
    }

    tracing::info!(
        "Backed up {} files ({} bytes) from {} to {}",
        report.files_copied,
        report.bytes_copied,
        source.display(),
        destination.display()
    );
    Ok(report)
}

// Returns None when the source vanished mid-copy.
fn copy_file(from: &Path, to: &Path) -> SweepResult<Option<u64>> {
    match fs::copy(from, to) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !from.exists() => {
            tracing::debug!("{} vanished before it could be copied", from.display());
            Ok(None)
        }
        Err(e) => Err(SweepError::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e,
        }),
    }
}
