//! Partitioning walked files into named buckets.
//!
//! Three policies exist:
//! - [`ClassificationPolicy::BySuffix`] looks the extension up in the
//!   [`CategoryTable`]; files with no category are left out.
//! - [`ClassificationPolicy::ByDate`] buckets by creation month
//!   (`"March_2024"`) or year (`"2024"`).
//! - [`ClassificationPolicy::BySize`] buckets into `small_files`,
//!   `medium_files` and `large_files`.

use crate::error::{SweepError, SweepResult, is_transient};
use crate::file_category::CategoryTable;
use crate::file_descriptor::{FileDescriptor, FileRef};
use chrono::{DateTime, Datelike, Local};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Bytes per megabyte, decimal.
pub const BYTES_PER_MB: u64 = 1_000_000;

/// Files below this size are `small_files`.
pub const MEDIUM_THRESHOLD: u64 = BYTES_PER_MB;

/// Files at or above this size are `large_files`.
pub const LARGE_THRESHOLD: u64 = 100 * BYTES_PER_MB;

/// How files are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationPolicy {
    BySuffix,
    ByDate { year_only: bool },
    BySize,
}

/// Bucket name to files, in walk order within each bucket.
///
/// A file appears in at most one bucket.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BucketMap {
    buckets: HashMap<String, Vec<FileRef>>,
    #[serde(skip)]
    skipped: usize,
}

impl BucketMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `file` to `bucket`, creating the bucket on first use.
    pub fn insert(&mut self, bucket: impl Into<String>, file: FileRef) {
        self.buckets.entry(bucket.into()).or_default().push(file);
    }

    pub fn get(&self, bucket: &str) -> Option<&[FileRef]> {
        self.buckets.get(bucket).map(Vec::as_slice)
    }

    /// Bucket names in sorted order.
    pub fn bucket_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.buckets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Buckets in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FileRef])> {
        let mut entries: Vec<_> = self
            .buckets
            .iter()
            .map(|(name, files)| (name.as_str(), files.as_slice()))
            .collect();
        entries.sort_unstable_by_key(|(name, _)| *name);
        entries.into_iter()
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of bucketed files.
    pub fn file_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Files dropped during classification because they vanished.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// File counts per bucket.
    pub fn counts(&self) -> HashMap<String, usize> {
        self.buckets
            .iter()
            .map(|(name, files)| (name.clone(), files.len()))
            .collect()
    }
}

/// Size tier for a byte count.
pub fn size_bucket(bytes: u64) -> &'static str {
    if bytes < MEDIUM_THRESHOLD {
        "small_files"
    } else if bytes < LARGE_THRESHOLD {
        "medium_files"
    } else {
        "large_files"
    }
}

/// Date bucket for a creation time: `"March_2024"`, or `"2024"` when
/// `year_only` is set.
pub fn date_bucket(created: &DateTime<Local>, year_only: bool) -> String {
    if year_only {
        created.year().to_string()
    } else {
        format!("{}_{}", created.format("%B"), created.year())
    }
}

/// Groups files into buckets under one policy.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    table: CategoryTable,
}

impl Classifier {
    pub fn new(table: CategoryTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    /// Classifies every file yielded by `files`.
    ///
    /// The whole input is consumed before this returns, so nothing is moved
    /// while the tree is still being read. Files that vanish before they can
    /// be stat'ed are skipped and counted.
    ///
    /// # Errors
    ///
    /// Walk errors are propagated. Date classification fails with
    /// [`SweepError::UnsupportedMetadata`] if any file lacks a creation time.
    pub fn classify<I>(&self, files: I, policy: ClassificationPolicy) -> SweepResult<BucketMap>
    where
        I: IntoIterator<Item = SweepResult<FileDescriptor>>,
    {
        let mut buckets = BucketMap::new();

        for descriptor in files {
            let descriptor = descriptor?;
            let bucket = match self.bucket_for(&descriptor, policy) {
                Ok(Some(bucket)) => bucket,
                Ok(None) => continue,
                Err(SweepError::Io { path, source }) if is_transient(&source) => {
                    tracing::debug!("Skipping {} during classification: {}", path.display(), source);
                    buckets.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match descriptor.to_file_ref() {
                Ok(file) => buckets.insert(bucket, file),
                Err(e) if is_transient(&e) => {
                    tracing::debug!(
                        "Skipping {} during classification: {}",
                        descriptor.path().display(),
                        e
                    );
                    buckets.skipped += 1;
                }
                Err(e) => return Err(SweepError::io(descriptor.path(), e)),
            }
        }

        tracing::debug!(
            "Classified {} files into {} buckets",
            buckets.file_count(),
            buckets.len()
        );
        Ok(buckets)
    }

    /// Convenience wrapper classifying plain paths.
    pub fn classify_paths<I>(&self, paths: I, policy: ClassificationPolicy) -> SweepResult<BucketMap>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.classify(paths.into_iter().map(|p| Ok(FileDescriptor::new(p))), policy)
    }

    fn bucket_for(
        &self,
        descriptor: &FileDescriptor,
        policy: ClassificationPolicy,
    ) -> SweepResult<Option<String>> {
        match policy {
            ClassificationPolicy::BySuffix => Ok(self
                .table
                .category_for(&descriptor.extension())
                .map(str::to_string)),
            ClassificationPolicy::ByDate { year_only } => {
                let created = descriptor.created()?;
                Ok(Some(date_bucket(&created, year_only)))
            }
            ClassificationPolicy::BySize => {
                let size = descriptor
                    .size()
                    .map_err(|e| SweepError::io(descriptor.path(), e))?;
                Ok(Some(size_bucket(size).to_string()))
            }
        }
    }
}
