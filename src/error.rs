//! Error types shared by every dirsweep operation.

use crate::config::ConfigError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while walking, classifying, moving, purging or
/// backing up files.
#[derive(Debug, Error)]
pub enum SweepError {
    /// The source path does not exist or is not a directory.
    #[error("Not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// The filesystem does not record file creation times.
    #[error("Creation time is not available for {}: {source}", path.display())]
    UnsupportedMetadata { path: PathBuf, source: io::Error },

    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreation { path: PathBuf, source: io::Error },

    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    FileMove {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("Failed to remove {}: {source}", path.display())]
    Removal { path: PathBuf, source: io::Error },

    #[error("Failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("Backup destination already exists: {}", path.display())]
    BackupDestinationExists { path: PathBuf },

    #[error("Backup destination {} would contain its own source", path.display())]
    BackupIntoSource { path: PathBuf },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Operation cancelled by user")]
    Aborted,
}

/// Result type for dirsweep operations.
pub type SweepResult<T> = Result<T, SweepError>;

impl SweepError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error when surfaced by the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NotADirectory { .. } => 2,
            Self::UnsupportedMetadata { .. } => 3,
            Self::Config(_) => 4,
            Self::Aborted => 5,
            _ => 1,
        }
    }
}

/// Returns true for races with other processes: the entry vanished, or it
/// changed between a file and a directory after being listed.
pub fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::IsADirectory | io::ErrorKind::NotADirectory
    )
}
