//! Deleting files older than an age threshold.
//!
//! Ages are measured from creation time in whole days. Months and years use
//! the fixed 30 and 365 day approximations, so thresholds do not follow the
//! calendar.

use crate::classifier::BYTES_PER_MB;
use crate::config::CompiledFilters;
use crate::error::{SweepError, SweepResult, is_transient};
use crate::file_descriptor::{CreationTimeFn, FileDescriptor, FileRef, platform_creation_time};
use crate::pruner::{PruneReport, Pruner};
use crate::walker::walk_filtered;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DAYS_PER_MONTH: u64 = 30;
pub const DAYS_PER_YEAR: u64 = 365;

/// Minimum age for a file to be purged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeThreshold {
    Days(u64),
    Months(u64),
    Years(u64),
}

impl AgeThreshold {
    /// The threshold expressed in days.
    pub fn as_days(&self) -> u64 {
        match *self {
            AgeThreshold::Days(days) => days,
            AgeThreshold::Months(months) => months.saturating_mul(DAYS_PER_MONTH),
            AgeThreshold::Years(years) => years.saturating_mul(DAYS_PER_YEAR),
        }
    }
}

/// Whole days between `created` and `now`; negative for future timestamps.
pub fn age_in_days(created: &DateTime<Local>, now: &DateTime<Local>) -> i64 {
    (*now - *created).num_days()
}

/// True when a file created at `created` has reached `threshold` at `now`.
pub fn is_expired(created: &DateTime<Local>, now: &DateTime<Local>, threshold: AgeThreshold) -> bool {
    let age = age_in_days(created, now);
    age >= 0 && age as u64 >= threshold.as_days()
}

/// Totals of one purge run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PurgeResult {
    pub files_deleted: usize,
    pub bytes_reclaimed: u64,
    /// Files that disappeared between the scan and their deletion.
    pub vanished: usize,
    pub deleted: Vec<PathBuf>,
    pub pruned: PruneReport,
}

impl PurgeResult {
    /// Reclaimed space in decimal megabytes.
    pub fn reclaimed_mb(&self) -> f64 {
        self.bytes_reclaimed as f64 / BYTES_PER_MB as f64
    }
}

/// Deletes expired files below a root, then prunes empty directories.
#[derive(Debug, Clone)]
pub struct Purger {
    now: DateTime<Local>,
    dry_run: bool,
    filters: CompiledFilters,
    skipped_dirs: Vec<PathBuf>,
    creation_time: CreationTimeFn,
    pruner: Pruner,
}

impl Purger {
    pub fn new(pruner: Pruner) -> Self {
        Self {
            now: Local::now(),
            dry_run: false,
            filters: CompiledFilters::allow_all(),
            skipped_dirs: Vec::new(),
            creation_time: platform_creation_time,
            pruner,
        }
    }

    /// Measures ages against `now` instead of the current time.
    pub fn with_now(mut self, now: DateTime<Local>) -> Self {
        self.now = now;
        self
    }

    /// Reports what would be deleted without deleting or pruning.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Never looks inside `dir`, neither to delete files nor to prune.
    pub fn skip_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.pruner = self.pruner.skip_dir(dir.clone());
        self.skipped_dirs.push(dir);
        self
    }

    /// Reads creation times through `creation_time` instead of the platform.
    pub fn with_creation_time(mut self, creation_time: CreationTimeFn) -> Self {
        self.creation_time = creation_time;
        self
    }

    /// Lists the files under `root` whose age is at least `threshold`.
    ///
    /// # Errors
    ///
    /// [`SweepError::NotADirectory`] for a bad root, and
    /// [`SweepError::UnsupportedMetadata`] as soon as any walked file has no
    /// creation time.
    pub fn scan(&self, root: &Path, threshold: AgeThreshold) -> SweepResult<Vec<FileRef>> {
        let mut expired = Vec::new();

        let walk = walk_filtered(root, false, self.filters.clone())?
            .with_creation_time(self.creation_time);
        let walk = self
            .skipped_dirs
            .iter()
            .fold(walk, |walk, dir| walk.skip_dir(dir.clone()));

        for descriptor in walk {
            let descriptor = descriptor?;
            let file = match deletable(&descriptor) {
                Ok(file) => file,
                Err(e) if is_transient(&e) => {
                    tracing::debug!("Skipping vanished file {}", descriptor.path().display());
                    continue;
                }
                Err(e) => return Err(SweepError::io(descriptor.path(), e)),
            };
            let created = match file.created {
                Some(created) => created,
                None => descriptor.created()?,
            };
            if is_expired(&created, &self.now, threshold) {
                expired.push(file);
            }
        }

        Ok(expired)
    }

    /// Deletes every file under `root` at least `threshold` old.
    ///
    /// The tree is scanned completely before the first deletion. Files that
    /// vanish in between are counted, not treated as errors.
    pub fn purge_older_than(&self, root: &Path, threshold: AgeThreshold) -> SweepResult<PurgeResult> {
        self.purge_older_than_with(root, threshold, |_| {})
    }

    /// Like [`Purger::purge_older_than`], calling `observer` after each file.
    pub fn purge_older_than_with<F>(
        &self,
        root: &Path,
        threshold: AgeThreshold,
        mut observer: F,
    ) -> SweepResult<PurgeResult>
    where
        F: FnMut(&FileRef),
    {
        let expired = self.scan(root, threshold)?;
        let mut result = PurgeResult::default();

        tracing::info!(
            "{} files are at least {} days old",
            expired.len(),
            threshold.as_days()
        );

        for file in expired {
            if !self.dry_run {
                match fs::remove_file(&file.path) {
                    Ok(()) => tracing::debug!("Deleted {}", file.path.display()),
                    Err(e) if is_transient(&e) => {
                        tracing::warn!("{} vanished before it could be deleted", file.path.display());
                        result.vanished += 1;
                        observer(&file);
                        continue;
                    }
                    Err(e) => {
                        return Err(SweepError::Removal {
                            path: file.path,
                            source: e,
                        });
                    }
                }
            }
            result.files_deleted += 1;
            result.bytes_reclaimed += file.size;
            observer(&file);
            result.deleted.push(file.path);
        }

        if !self.dry_run {
            result.pruned = self.pruner.prune(root)?;
        }

        Ok(result)
    }
}

// Symlinks are sized as the link, since deleting one frees nothing else.
fn deletable(descriptor: &FileDescriptor) -> std::io::Result<FileRef> {
    let mut file = descriptor.to_file_ref()?;
    if descriptor.is_symlink() {
        file.size = descriptor.own_size()?;
    }
    Ok(file)
}

impl Default for Purger {
    fn default() -> Self {
        Self::new(Pruner::default())
    }
}

/// Purges `root` against the current time with default settings.
pub fn purge_older_than(root: &Path, threshold: AgeThreshold) -> SweepResult<PurgeResult> {
    Purger::default().purge_older_than(root, threshold)
}
