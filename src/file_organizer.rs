//! Moving classified files into bucket subdirectories.
//!
//! [`FileOrganizer`] takes a [`BucketMap`] produced for a root directory,
//! creates one subdirectory per bucket and renames each file into it. Name
//! collisions in a bucket are resolved by a single [`CollisionPolicy`] for
//! the whole run. After every move the root is pruned of empty directories.
use crate::classifier::BucketMap;
use crate::config::{CollisionPolicy, validate_category_name};
use crate::error::{SweepError, SweepResult, is_transient};
use crate::pruner::{PruneReport, Pruner};
use crate::walker::checked_root;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One file move, performed or planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    pub from: PathBuf,
    pub to: PathBuf,
    pub bucket: String,
}

/// What happened to a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved(MoveRecord),
    /// Moved under a suffixed name because the plain name was taken.
    Renamed(MoveRecord),
    /// Left in place because it already lives in its bucket.
    AlreadyInPlace(PathBuf),
    /// Left in place because of a name collision under [`CollisionPolicy::Skip`].
    CollisionSkipped { from: PathBuf, existing: PathBuf },
    /// Disappeared before it could be moved.
    Vanished(PathBuf),
}

/// Summary of one reorganization run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReorganizeReport {
    pub moved: Vec<MoveRecord>,
    pub renamed: usize,
    pub already_in_place: usize,
    pub collisions_skipped: Vec<PathBuf>,
    pub vanished: usize,
    pub pruned: PruneReport,
}

impl ReorganizeReport {
    fn record(&mut self, outcome: MoveOutcome) {
        match outcome {
            MoveOutcome::Moved(record) => self.moved.push(record),
            MoveOutcome::Renamed(record) => {
                self.renamed += 1;
                self.moved.push(record);
            }
            MoveOutcome::AlreadyInPlace(_) => self.already_in_place += 1,
            MoveOutcome::CollisionSkipped { from, .. } => self.collisions_skipped.push(from),
            MoveOutcome::Vanished(_) => self.vanished += 1,
        }
    }
}

/// Moves files into bucket subdirectories of a root.
#[derive(Debug, Clone, Default)]
pub struct FileOrganizer {
    collision: CollisionPolicy,
    pruner: Pruner,
}

impl FileOrganizer {
    pub fn new(collision: CollisionPolicy, pruner: Pruner) -> Self {
        Self { collision, pruner }
    }

    pub fn collision_policy(&self) -> CollisionPolicy {
        self.collision
    }

    /// Moves every file of `buckets` into `root/<bucket>` and prunes `root`.
    ///
    /// # Errors
    ///
    /// Fails with [`SweepError::NotADirectory`] if `root` is not a directory.
    /// Any non-race I/O failure stops the run; files moved before it stay
    /// moved, since each move is a single rename.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dirsweep::classifier::{ClassificationPolicy, Classifier};
    /// use dirsweep::file_organizer::FileOrganizer;
    /// use dirsweep::walker::walk;
    /// use std::path::Path;
    ///
    /// let root = Path::new("/home/alice/Downloads");
    /// let buckets = Classifier::default()
    ///     .classify(walk(root, false)?, ClassificationPolicy::BySuffix)?;
    /// let report = FileOrganizer::default().reorganize(root, &buckets)?;
    /// println!("moved {} files", report.moved.len());
    /// # Ok::<(), dirsweep::SweepError>(())
    /// ```
    pub fn reorganize(&self, root: &Path, buckets: &BucketMap) -> SweepResult<ReorganizeReport> {
        self.reorganize_with(root, buckets, |_| {})
    }

    /// Like [`FileOrganizer::reorganize`], calling `observer` after each file.
    pub fn reorganize_with<F>(
        &self,
        root: &Path,
        buckets: &BucketMap,
        mut observer: F,
    ) -> SweepResult<ReorganizeReport>
    where
        F: FnMut(&MoveOutcome),
    {
        let root = checked_root(root)?;
        validate_buckets(buckets)?;
        let mut report = ReorganizeReport::default();

        for (bucket, files) in buckets.iter() {
            let bucket_dir = root.join(bucket);
            for file in files {
                let outcome = self.move_into_bucket(&bucket_dir, &file.path, bucket)?;
                observer(&outcome);
                report.record(outcome);
            }
        }

        report.pruned = self.pruner.prune(&root)?;

        tracing::info!(
            "Moved {} files ({} renamed), {} already in place, {} collisions skipped, {} vanished",
            report.moved.len(),
            report.renamed,
            report.already_in_place,
            report.collisions_skipped.len(),
            report.vanished
        );
        Ok(report)
    }

    /// Computes the moves `reorganize` would make without touching the disk.
    ///
    /// Collisions are resolved against the current disk state and against
    /// earlier planned moves; files that would be skipped are left out.
    pub fn plan(&self, root: &Path, buckets: &BucketMap) -> SweepResult<Vec<MoveRecord>> {
        let root = checked_root(root)?;
        validate_buckets(buckets)?;
        let mut planned: Vec<MoveRecord> = Vec::new();

        for (bucket, files) in buckets.iter() {
            let bucket_dir = root.join(bucket);
            for file in files {
                if file.path.starts_with(&bucket_dir) {
                    continue;
                }
                let Some(file_name) = file.path.file_name() else {
                    continue;
                };
                let taken = |p: &Path| p.exists() || planned.iter().any(|m| m.to == p);
                let mut destination = bucket_dir.join(file_name);
                if taken(destination.as_path()) {
                    match self.collision {
                        CollisionPolicy::Skip => continue,
                        CollisionPolicy::Overwrite => {}
                        CollisionPolicy::Rename => {
                            destination = first_free_name(&bucket_dir, Path::new(file_name), taken);
                        }
                    }
                }
                planned.push(MoveRecord {
                    from: file.path.clone(),
                    to: destination,
                    bucket: bucket.to_string(),
                });
            }
        }

        Ok(planned)
    }

    /// Moves one file into `bucket_dir`, creating the directory if needed.
    pub fn move_into_bucket(
        &self,
        bucket_dir: &Path,
        file_path: &Path,
        bucket: &str,
    ) -> SweepResult<MoveOutcome> {
        if file_path.starts_with(bucket_dir) {
            return Ok(MoveOutcome::AlreadyInPlace(file_path.to_path_buf()));
        }

        // Matches the platform "is file" check the walker used.
        match fs::metadata(file_path) {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => {
                tracing::warn!("{} is no longer a regular file, skipping", file_path.display());
                return Ok(MoveOutcome::Vanished(file_path.to_path_buf()));
            }
            Err(e) if is_transient(&e) => {
                tracing::warn!("{} vanished before it could be moved", file_path.display());
                return Ok(MoveOutcome::Vanished(file_path.to_path_buf()));
            }
            Err(e) => return Err(SweepError::io(file_path, e)),
        }

        fs::create_dir_all(bucket_dir).map_err(|e| SweepError::DirectoryCreation {
            path: bucket_dir.to_path_buf(),
            source: e,
        })?;

        let file_name = file_path.file_name().ok_or_else(|| SweepError::FileMove {
            from: file_path.to_path_buf(),
            to: bucket_dir.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "file has no name component",
            ),
        })?;

        let mut destination = bucket_dir.join(file_name);
        let mut renamed = false;
        if destination.exists() {
            match self.collision {
                CollisionPolicy::Skip => {
                    tracing::warn!(
                        "{} already exists, leaving {} in place",
                        destination.display(),
                        file_path.display()
                    );
                    return Ok(MoveOutcome::CollisionSkipped {
                        from: file_path.to_path_buf(),
                        existing: destination,
                    });
                }
                CollisionPolicy::Overwrite => {
                    tracing::warn!("Overwriting {}", destination.display());
                }
                CollisionPolicy::Rename => {
                    destination =
                        first_free_name(bucket_dir, Path::new(file_name), |p| p.exists());
                    renamed = true;
                    tracing::info!(
                        "{} already exists, moving {} as {}",
                        bucket_dir.join(file_name).display(),
                        file_path.display(),
                        destination.display()
                    );
                }
            }
        }

        match fs::rename(file_path, &destination) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !file_path.exists() => {
                tracing::warn!("{} vanished before it could be moved", file_path.display());
                return Ok(MoveOutcome::Vanished(file_path.to_path_buf()));
            }
            Err(e) => {
                return Err(SweepError::FileMove {
                    from: file_path.to_path_buf(),
                    to: destination,
                    source: e,
                });
            }
        }

        tracing::debug!("Moved {} to {}", file_path.display(), destination.display());
        let record = MoveRecord {
            from: file_path.to_path_buf(),
            to: destination,
            bucket: bucket.to_string(),
        };
        Ok(if renamed {
            MoveOutcome::Renamed(record)
        } else {
            MoveOutcome::Moved(record)
        })
    }
}

/// First `<stem>_<n>.<ext>` in `dir` (n = 1, 2, ...) for which `taken` is false.
// Every bucket must map to a directory directly below the root.
fn validate_buckets(buckets: &BucketMap) -> SweepResult<()> {
    for name in buckets.bucket_names() {
        validate_category_name(name)?;
    }
    Ok(())
}

fn first_free_name<F>(dir: &Path, file_name: &Path, taken: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = file_name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1usize;
    loop {
        let candidate = dir.join(format!("{stem}_{n}{extension}"));
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Moves files with the default organizer: rename on collision, `.DS_Store`
/// as the only inert file.
pub fn reorganize(root: &Path, buckets: &BucketMap) -> SweepResult<ReorganizeReport> {
    FileOrganizer::default().reorganize(root, buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::file_descriptor::FileRef;
    use tempfile::TempDir;

    fn file_ref(path: PathBuf) -> FileRef {
        FileRef {
            size: fs::metadata(&path).map(|m| m.len()).unwrap_or(0),
            path,
            created: None,
        }
    }

    fn buckets_for(entries: &[(&str, PathBuf)]) -> BucketMap {
        let mut buckets = BucketMap::new();
        for (bucket, path) in entries {
            buckets.insert(*bucket, file_ref(path.clone()));
        }
        buckets
    }

    #[test]
    fn test_move_creates_bucket_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        let file_path = root.join("test.txt");
        fs::write(&file_path, "test content").expect("Failed to write test file");

        let report = reorganize(root, &buckets_for(&[("docs", file_path.clone())])).unwrap();

        assert_eq!(report.moved.len(), 1);
        assert!(!file_path.exists());
        assert_eq!(
            fs::read_to_string(root.join("docs/test.txt")).unwrap(),
            "test content"
        );
    }

    #[test]
    fn test_move_uses_existing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir(root.join("images")).unwrap();
        fs::write(root.join("images/old.png"), "old").unwrap();
        let file_path = root.join("new.png");
        fs::write(&file_path, "new").unwrap();

        reorganize(root, &buckets_for(&[("images", file_path)])).unwrap();

        assert!(root.join("images/old.png").exists());
        assert!(root.join("images/new.png").exists());
    }

    #[test]
    fn test_files_inside_their_bucket_are_left_alone() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("pdfs/sub")).unwrap();
        let inside = root.join("pdfs/report.pdf");
        let deeper = root.join("pdfs/sub/other.pdf");
        fs::write(&inside, "r").unwrap();
        fs::write(&deeper, "o").unwrap();

        let report = reorganize(
            root,
            &buckets_for(&[("pdfs", inside.clone()), ("pdfs", deeper.clone())]),
        )
        .unwrap();

        assert!(report.moved.is_empty());
        assert_eq!(report.already_in_place, 2);
        assert!(inside.exists());
        assert!(deeper.exists());
    }

    #[test]
    fn test_collision_rename_with_suffix() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("docs/notes.txt"), "existing").unwrap();
        fs::write(root.join("notes.txt"), "top").unwrap();
        fs::write(root.join("a/notes.txt"), "nested").unwrap();

        let report = reorganize(
            root,
            &buckets_for(&[
                ("docs", root.join("a/notes.txt")),
                ("docs", root.join("notes.txt")),
            ]),
        )
        .unwrap();

        assert_eq!(report.renamed, 2);
        assert_eq!(fs::read_to_string(root.join("docs/notes.txt")).unwrap(), "existing");
        assert_eq!(fs::read_to_string(root.join("docs/notes_1.txt")).unwrap(), "nested");
        assert_eq!(fs::read_to_string(root.join("docs/notes_2.txt")).unwrap(), "top");
        assert!(!root.join("a").exists());
    }

    #[test]
    fn test_collision_skip_leaves_source() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("docs/notes.txt"), "existing").unwrap();
        fs::write(root.join("notes.txt"), "incoming").unwrap();

        let organizer = FileOrganizer::new(CollisionPolicy::Skip, Pruner::default());
        let report = organizer
            .reorganize(root, &buckets_for(&[("docs", root.join("notes.txt"))]))
            .unwrap();

        assert_eq!(report.collisions_skipped, vec![root.join("notes.txt")]);
        assert_eq!(fs::read_to_string(root.join("docs/notes.txt")).unwrap(), "existing");
        assert_eq!(fs::read_to_string(root.join("notes.txt")).unwrap(), "incoming");
    }

    #[test]
    fn test_collision_overwrite_replaces_destination() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("docs/notes.txt"), "existing").unwrap();
        fs::write(root.join("notes.txt"), "incoming").unwrap();

        let organizer = FileOrganizer::new(CollisionPolicy::Overwrite, Pruner::default());
        organizer
            .reorganize(root, &buckets_for(&[("docs", root.join("notes.txt"))]))
            .unwrap();

        assert_eq!(fs::read_to_string(root.join("docs/notes.txt")).unwrap(), "incoming");
        assert!(!root.join("notes.txt").exists());
    }

    #[test]
    fn test_vanished_file_is_tolerated() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("kept.txt"), "k").unwrap();

        let report = reorganize(
            root,
            &buckets_for(&[("docs", root.join("gone.txt")), ("docs", root.join("kept.txt"))]),
        )
        .unwrap();

        assert_eq!(report.vanished, 1);
        assert_eq!(report.moved.len(), 1);
        assert!(root.join("docs/kept.txt").exists());
    }

    #[test]
    fn test_invalid_root() {
        let result = reorganize(Path::new("/non/existent/path"), &BucketMap::new());
        assert!(matches!(result, Err(SweepError::NotADirectory { .. })));
    }

    #[test]
    fn test_bucket_outside_root_is_refused_before_moving() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("root");
        fs::create_dir(&root).unwrap();
        let kept = root.join("a.txt");
        let escaping = root.join("b.pdf");
        fs::write(&kept, "a").unwrap();
        fs::write(&escaping, "b").unwrap();
        let buckets = buckets_for(&[("docs", kept.clone()), ("../out", escaping.clone())]);

        let result = reorganize(&root, &buckets);
        assert!(matches!(
            result,
            Err(SweepError::Config(ConfigError::InvalidCategoryName(_)))
        ));
        assert!(FileOrganizer::default().plan(&root, &buckets).is_err());
        assert!(kept.exists());
        assert!(escaping.exists());
        assert!(!temp_dir.path().join("out").exists());
    }

    #[test]
    fn test_plan_does_not_touch_disk() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("docs/a.txt"), "existing").unwrap();
        fs::write(root.join("a.txt"), "incoming").unwrap();
        fs::write(root.join("b.pdf"), "pdf").unwrap();

        let buckets = buckets_for(&[("docs", root.join("a.txt")), ("pdfs", root.join("b.pdf"))]);
        let plan = FileOrganizer::default().plan(root, &buckets).unwrap();

        assert_eq!(
            plan,
            vec![
                MoveRecord {
                    from: root.join("a.txt"),
                    to: root.join("docs/a_1.txt"),
                    bucket: "docs".to_string(),
                },
                MoveRecord {
                    from: root.join("b.pdf"),
                    to: root.join("pdfs/b.pdf"),
                    bucket: "pdfs".to_string(),
                },
            ]
        );
        assert!(root.join("a.txt").exists());
        assert!(!root.join("pdfs").exists());
    }

    #[test]
    fn test_first_free_name_without_extension() {
        let dir = Path::new("/x");
        let taken = |p: &Path| p == Path::new("/x/README_1");
        assert_eq!(
            first_free_name(dir, Path::new("README"), taken),
            PathBuf::from("/x/README_2")
        );
    }
}
