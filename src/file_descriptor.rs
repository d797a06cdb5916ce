//! Per-file classification keys, resolved lazily.
//!
//! A [`FileDescriptor`] is what the walker hands out: a path plus a
//! metadata slot that is only filled the first time size or creation time is
//! asked for. Suffix classification never stats files it cannot bucket.

use crate::error::{SweepError, SweepResult};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::cell::OnceCell;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Reads a creation time out of file metadata.
pub type CreationTimeFn = fn(&Metadata) -> io::Result<SystemTime>;

/// The creation time the platform records, if it records one.
pub fn platform_creation_time(metadata: &Metadata) -> io::Result<SystemTime> {
    metadata.created()
}

/// One regular file as seen at stat time.
///
/// The file may be gone by the time it is acted upon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRef {
    pub path: PathBuf,
    pub size: u64,
    /// Creation time, when the filesystem records one.
    pub created: Option<DateTime<Local>>,
}

impl FileRef {
    /// The final path component, or an empty string for odd paths.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A walked file whose metadata is fetched on demand.
#[derive(Debug)]
pub struct FileDescriptor {
    path: PathBuf,
    is_symlink: bool,
    creation_time: CreationTimeFn,
    metadata: OnceCell<Metadata>,
}

impl FileDescriptor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_symlink: false,
            creation_time: platform_creation_time,
            metadata: OnceCell::new(),
        }
    }

    /// Marks the path as a symlink to a file.
    pub fn with_symlink(mut self, is_symlink: bool) -> Self {
        self.is_symlink = is_symlink;
        self
    }

    /// Reads creation times through `creation_time` instead of the platform.
    pub fn with_creation_time(mut self, creation_time: CreationTimeFn) -> Self {
        self.creation_time = creation_time;
        self
    }

    pub fn is_symlink(&self) -> bool {
        self.is_symlink
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercase extension without the leading dot; empty when there is none.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    fn metadata(&self) -> io::Result<&Metadata> {
        if let Some(metadata) = self.metadata.get() {
            return Ok(metadata);
        }
        let metadata = fs::metadata(&self.path)?;
        Ok(self.metadata.get_or_init(|| metadata))
    }

    /// Size in bytes. Errors are raw so callers can tell races apart.
    pub fn size(&self) -> io::Result<u64> {
        self.metadata().map(Metadata::len)
    }

    /// Bytes freed by deleting this path: the link itself for symlinks,
    /// the file otherwise.
    pub fn own_size(&self) -> io::Result<u64> {
        if self.is_symlink {
            fs::symlink_metadata(&self.path).map(|m| m.len())
        } else {
            self.size()
        }
    }

    /// Creation time in local time.
    ///
    /// Fails with [`SweepError::UnsupportedMetadata`] when the platform or
    /// filesystem does not track creation times; no other timestamp is
    /// substituted.
    pub fn created(&self) -> SweepResult<DateTime<Local>> {
        let metadata = self
            .metadata()
            .map_err(|e| SweepError::io(&self.path, e))?;
        (self.creation_time)(metadata)
            .map(DateTime::<Local>::from)
            .map_err(|source| SweepError::UnsupportedMetadata {
                path: self.path.clone(),
                source,
            })
    }

    /// Builds a [`FileRef`] from the cached metadata, stating once if needed.
    pub fn to_file_ref(&self) -> io::Result<FileRef> {
        let metadata = self.metadata()?;
        Ok(FileRef {
            path: self.path.clone(),
            size: metadata.len(),
            created: (self.creation_time)(metadata).ok().map(DateTime::<Local>::from),
        })
    }
}

impl From<PathBuf> for FileDescriptor {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}
