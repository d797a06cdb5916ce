//! dirsweep - sort, back up and purge the files of a directory
//!
//! This library walks a directory tree, classifies its files into buckets
//! (by type, by creation date or by size), moves each file into a bucket
//! subdirectory and prunes the empty directories left behind. It can also
//! delete files older than an age threshold and copy a tree aside before
//! changing it.

pub mod backup;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod file_category;
pub mod file_descriptor;
pub mod file_organizer;
pub mod output;
pub mod pruner;
pub mod purger;
pub mod walker;

pub use backup::{BackupMode, BackupReport, backup_dir};
pub use classifier::{BucketMap, ClassificationPolicy, Classifier};
pub use config::{CollisionPolicy, CompiledFilters, ConfigError, SweepConfig};
pub use error::{SweepError, SweepResult};
pub use file_category::CategoryTable;
pub use file_descriptor::{FileDescriptor, FileRef};
pub use file_organizer::{FileOrganizer, ReorganizeReport, reorganize};
pub use pruner::{PruneReport, Pruner, prune};
pub use purger::{AgeThreshold, PurgeResult, Purger, purge_older_than};
pub use walker::{FileWalk, walk};

pub use cli::{RunOptions, RunReport, SweepCommand, run_cli};
