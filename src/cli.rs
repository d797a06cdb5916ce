//! Command-line interface module for dirsweep.
//!
//! This module handles:
//! - Argument parsing (`clap`)
//! - Resolving source directories against the home root
//! - Confirmation prompts and optional backups before mutating runs
//! - Orchestrating classify-and-move, purge and backup commands
//! - Human and JSON reporting

use crate::backup::{BackupMode, BackupReport, backup_dir};
use crate::classifier::{BucketMap, ClassificationPolicy, Classifier};
use crate::config::{SweepConfig, resolve_source};
use crate::error::{SweepError, SweepResult};
use crate::file_organizer::{FileOrganizer, MoveOutcome, MoveRecord, ReorganizeReport};
use crate::output::OutputFormatter;
use crate::pruner::Pruner;
use crate::purger::{AgeThreshold, PurgeResult, Purger};
use crate::walker::{FileWalk, checked_root, walk_filtered};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "dirsweep")]
#[command(about = "Sort, back up and purge the files of a directory")]
#[command(version)]
pub struct Cli {
    /// Verbose diagnostics on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Base directory that source directories are relative to (default: home)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Configuration file (default: .dirsweep.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Do not ask for confirmation
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Print the report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Backup flags shared by the mutating commands.
#[derive(Args, Debug, Clone, Default)]
pub struct BackupArgs {
    /// Create a backup before making changes
    #[arg(long, requires = "backup_dir")]
    pub backup: bool,

    /// Where the backup goes, relative to the home root
    #[arg(long, alias = "backup_dir")]
    pub backup_dir: Option<PathBuf>,

    /// Require the backup directory to be new instead of merging into it
    #[arg(long, alias = "create_backup_dir")]
    pub create_backup_dir: bool,
}

impl BackupArgs {
    fn into_request(self) -> Option<BackupRequest> {
        match (self.backup, self.backup_dir) {
            (true, Some(destination)) => Some(BackupRequest {
                destination,
                mode: if self.create_backup_dir {
                    BackupMode::CreateNew
                } else {
                    BackupMode::Merge
                },
            }),
            _ => None,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    /// The directory to clean, relative to the home root
    #[arg(long, alias = "source_dir")]
    pub source_dir: PathBuf,

    /// Perform a shallow clean (do not traverse subdirectories)
    #[arg(long)]
    pub shallow: bool,

    /// Show what would move without moving anything
    #[arg(long, alias = "dry_run")]
    pub dry_run: bool,

    #[command(flatten)]
    pub backup: BackupArgs,
}

/// Exactly one age unit.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct AgeArgs {
    #[arg(long)]
    pub days: Option<u64>,

    #[arg(long)]
    pub months: Option<u64>,

    #[arg(long)]
    pub years: Option<u64>,
}

impl AgeArgs {
    fn threshold(&self) -> AgeThreshold {
        match (self.days, self.months, self.years) {
            (_, Some(months), _) => AgeThreshold::Months(months),
            (_, _, Some(years)) => AgeThreshold::Years(years),
            (days, _, _) => AgeThreshold::Days(days.unwrap_or_default()),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Move files into folders named after their type
    #[command(alias = "clean_by_suffix")]
    CleanBySuffix(ClassifyArgs),

    /// Move files into folders named after their creation month or year
    #[command(alias = "clean_by_date")]
    CleanByDate {
        /// Use year folders instead of month_year folders
        #[arg(long, alias = "year_only")]
        year_only: bool,

        #[command(flatten)]
        args: ClassifyArgs,
    },

    /// Move files into small_files, medium_files and large_files
    #[command(alias = "clean_by_size")]
    CleanBySize(ClassifyArgs),

    /// Delete files older than a threshold
    Purge {
        /// The directory to purge, relative to the home root
        #[arg(long, alias = "source_dir")]
        source_dir: PathBuf,

        #[command(flatten)]
        age: AgeArgs,

        /// Show what would be deleted without deleting anything
        #[arg(long, alias = "dry_run")]
        dry_run: bool,

        #[command(flatten)]
        backup: BackupArgs,
    },

    /// Copy a directory into a backup directory
    Backup {
        #[arg(long, alias = "source_dir")]
        source_dir: PathBuf,

        #[arg(long, alias = "backup_dir")]
        backup_dir: PathBuf,

        /// Fail if the backup directory already exists instead of merging
        #[arg(long)]
        create: bool,
    },
}

/// A backup to take before a mutating run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    pub destination: PathBuf,
    pub mode: BackupMode,
}

/// A parsed command, independent of the argument syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepCommand {
    Classify {
        source_dir: PathBuf,
        policy: ClassificationPolicy,
        shallow: bool,
        dry_run: bool,
        backup: Option<BackupRequest>,
    },
    Purge {
        source_dir: PathBuf,
        threshold: AgeThreshold,
        dry_run: bool,
        backup: Option<BackupRequest>,
    },
    Backup {
        source_dir: PathBuf,
        request: BackupRequest,
    },
}

impl From<Commands> for SweepCommand {
    fn from(command: Commands) -> Self {
        let classify = |args: ClassifyArgs, policy| SweepCommand::Classify {
            source_dir: args.source_dir,
            policy,
            shallow: args.shallow,
            dry_run: args.dry_run,
            backup: args.backup.into_request(),
        };

        match command {
            Commands::CleanBySuffix(args) => classify(args, ClassificationPolicy::BySuffix),
            Commands::CleanByDate { year_only, args } => {
                classify(args, ClassificationPolicy::ByDate { year_only })
            }
            Commands::CleanBySize(args) => classify(args, ClassificationPolicy::BySize),
            Commands::Purge {
                source_dir,
                age,
                dry_run,
                backup,
            } => SweepCommand::Purge {
                source_dir,
                threshold: age.threshold(),
                dry_run,
                backup: backup.into_request(),
            },
            Commands::Backup {
                source_dir,
                backup_dir,
                create,
            } => SweepCommand::Backup {
                source_dir,
                request: BackupRequest {
                    destination: backup_dir,
                    mode: if create {
                        BackupMode::CreateNew
                    } else {
                        BackupMode::Merge
                    },
                },
            },
        }
    }
}

/// Settings shared by every command of one invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Root that relative source and backup directories are joined onto.
    pub home: PathBuf,
    pub config: SweepConfig,
    /// Skip confirmation prompts.
    pub assume_yes: bool,
    /// Print JSON instead of tables.
    pub json: bool,
}

impl RunOptions {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            config: SweepConfig::default(),
            assume_yes: false,
            json: false,
        }
    }

    fn pruner(&self) -> Pruner {
        Pruner::new(self.config.prune.inert_files.iter().cloned())
    }
}

/// What a command did.
#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RunReport {
    Classified {
        root: PathBuf,
        buckets: BucketMap,
        /// Moves a dry run would make.
        planned: Vec<MoveRecord>,
        /// Present when files were actually moved.
        reorganized: Option<ReorganizeReport>,
        backup: Option<BackupReport>,
    },
    Purged {
        root: PathBuf,
        threshold: AgeThreshold,
        dry_run: bool,
        result: PurgeResult,
        backup: Option<BackupReport>,
    },
    BackedUp {
        source: PathBuf,
        destination: PathBuf,
        report: BackupReport,
    },
}

/// Entry point used by the binary: loads configuration and runs the
/// parsed command.
pub fn run(cli: Cli) -> SweepResult<RunReport> {
    let config = SweepConfig::load(cli.config.as_deref())?;
    let home = config.resolve_home(cli.home.as_deref())?;
    let options = RunOptions {
        home,
        config,
        assume_yes: cli.yes,
        json: cli.json,
    };
    run_cli(cli.command.into(), &options)
}

/// Runs one command against `options.home`.
///
/// # Examples
///
/// ```no_run
/// use dirsweep::classifier::ClassificationPolicy;
/// use dirsweep::cli::{RunOptions, SweepCommand, run_cli};
/// use std::path::PathBuf;
///
/// let mut options = RunOptions::new("/home/alice");
/// options.assume_yes = true;
/// let command = SweepCommand::Classify {
///     source_dir: PathBuf::from("Downloads"),
///     policy: ClassificationPolicy::BySuffix,
///     shallow: false,
///     dry_run: true,
///     backup: None,
/// };
/// run_cli(command, &options)?;
/// # Ok::<(), dirsweep::SweepError>(())
/// ```
pub fn run_cli(command: SweepCommand, options: &RunOptions) -> SweepResult<RunReport> {
    let report = match command {
        SweepCommand::Classify {
            source_dir,
            policy,
            shallow,
            dry_run,
            backup,
        } => classify_and_move(&source_dir, policy, shallow, dry_run, backup, options)?,
        SweepCommand::Purge {
            source_dir,
            threshold,
            dry_run,
            backup,
        } => purge(&source_dir, threshold, dry_run, backup, options)?,
        SweepCommand::Backup { source_dir, request } => {
            let source = checked_root(&resolve_source(&options.home, &source_dir))?;
            let destination = resolve_source(&options.home, &request.destination);
            let report = backup_dir(&source, &destination, request.mode)?;
            if !options.json {
                OutputFormatter::success(&format!(
                    "Backup of {} created at {} ({} files)",
                    source.display(),
                    destination.display(),
                    report.files_copied
                ));
            }
            RunReport::BackedUp {
                source,
                destination,
                report,
            }
        }
    };

    if options.json {
        emit_json(&report);
    }
    Ok(report)
}

fn classify_and_move(
    source_dir: &Path,
    policy: ClassificationPolicy,
    shallow: bool,
    dry_run: bool,
    backup: Option<BackupRequest>,
    options: &RunOptions,
) -> SweepResult<RunReport> {
    let root = checked_root(&resolve_source(&options.home, source_dir))?;
    let classifier = Classifier::new(options.config.category_table()?);
    let mut pruner = options.pruner();
    if let Some(destination) = backup_destination(backup.as_ref(), options) {
        pruner = pruner.skip_dir(destination);
    }
    let organizer = FileOrganizer::new(options.config.organize.collision, pruner);

    if dry_run {
        let buckets = classifier.classify(files_of(&root, shallow, backup.as_ref(), options)?, policy)?;
        let planned = organizer.plan(&root, &buckets)?;
        if !options.json {
            OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", root.display()));
            for record in &planned {
                OutputFormatter::plain(&format!(
                    " - {} → {}/",
                    record.from.display(),
                    record.bucket
                ));
            }
            OutputFormatter::summary_table(&buckets.counts(), buckets.file_count());
            OutputFormatter::dry_run_notice("No files were modified.");
        }
        return Ok(RunReport::Classified {
            root,
            buckets,
            planned,
            reorganized: None,
            backup: None,
        });
    }

    confirm(&format!("Files in {} will be moved.", root.display()), options)?;
    let backup_report = take_backup(&root, backup.as_ref(), options)?;

    // Classification finishes before the first move.
    let buckets = classifier.classify(files_of(&root, shallow, backup.as_ref(), options)?, policy)?;

    if !options.json {
        OutputFormatter::info(&format!("Organizing contents of: {}", root.display()));
    }
    let progress = (!options.json).then(|| OutputFormatter::create_progress_bar(buckets.file_count() as u64));
    let reorganized = organizer.reorganize_with(&root, &buckets, |outcome| {
        if let Some(pb) = &progress {
            if let MoveOutcome::Moved(record) | MoveOutcome::Renamed(record) = outcome {
                pb.set_message(record.bucket.clone());
            }
            pb.inc(1);
        }
    })?;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if !options.json {
        OutputFormatter::summary_table(&buckets.counts(), buckets.file_count());
        if reorganized.renamed > 0 {
            OutputFormatter::warning(&format!(
                "{} files were renamed to avoid overwriting existing files",
                reorganized.renamed
            ));
        }
        if !reorganized.collisions_skipped.is_empty() {
            OutputFormatter::warning(&format!(
                "{} files were left in place because their name was taken",
                reorganized.collisions_skipped.len()
            ));
        }
        if reorganized.vanished > 0 {
            OutputFormatter::warning(&format!(
                "{} files disappeared before they could be moved",
                reorganized.vanished
            ));
        }
        OutputFormatter::success(&format!(
            "Moved {} files, removed {} empty folders",
            reorganized.moved.len(),
            reorganized.pruned.removed.len()
        ));
    }

    Ok(RunReport::Classified {
        root,
        buckets,
        planned: Vec::new(),
        reorganized: Some(reorganized),
        backup: backup_report,
    })
}

fn purge(
    source_dir: &Path,
    threshold: AgeThreshold,
    dry_run: bool,
    backup: Option<BackupRequest>,
    options: &RunOptions,
) -> SweepResult<RunReport> {
    let root = checked_root(&resolve_source(&options.home, source_dir))?;
    let mut purger = Purger::new(options.pruner())
        .with_dry_run(dry_run)
        .with_filters(options.config.compile_filters()?);
    if let Some(destination) = backup_destination(backup.as_ref(), options) {
        purger = purger.skip_dir(destination);
    }

    let mut backup_report = None;
    if !dry_run {
        confirm(
            &format!(
                "Files in {} at least {} days old will be deleted.",
                root.display(),
                threshold.as_days()
            ),
            options,
        )?;
        backup_report = take_backup(&root, backup.as_ref(), options)?;
    }

    let progress = (!options.json).then(OutputFormatter::create_spinner);
    let result = purger.purge_older_than_with(&root, threshold, |_| {
        if let Some(pb) = &progress {
            pb.inc(1);
        }
    })?;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if !options.json {
        if dry_run {
            for path in &result.deleted {
                OutputFormatter::plain(&format!(" - {}", path.display()));
            }
            OutputFormatter::dry_run_notice(&format!(
                "Would delete {} files ({})",
                result.files_deleted,
                crate::output::format_size(result.bytes_reclaimed)
            ));
        } else {
            OutputFormatter::success(&OutputFormatter::purge_line(
                result.files_deleted,
                result.bytes_reclaimed,
            ));
            if result.vanished > 0 {
                OutputFormatter::warning(&format!(
                    "{} files disappeared before they could be deleted",
                    result.vanished
                ));
            }
        }
    }

    Ok(RunReport::Purged {
        root,
        threshold,
        dry_run,
        result,
        backup: backup_report,
    })
}

/// Walks `root` without descending into the backup directory.
fn files_of(
    root: &Path,
    shallow: bool,
    backup: Option<&BackupRequest>,
    options: &RunOptions,
) -> SweepResult<FileWalk> {
    let walk = walk_filtered(root, shallow, options.config.compile_filters()?)?;
    Ok(match backup_destination(backup, options) {
        Some(destination) => walk.skip_dir(destination),
        None => walk,
    })
}

/// Absolute path of the requested backup directory, if any.
fn backup_destination(backup: Option<&BackupRequest>, options: &RunOptions) -> Option<PathBuf> {
    let request = backup?;
    std::path::absolute(resolve_source(&options.home, &request.destination)).ok()
}

fn take_backup(
    root: &Path,
    backup: Option<&BackupRequest>,
    options: &RunOptions,
) -> SweepResult<Option<BackupReport>> {
    let Some(request) = backup else {
        return Ok(None);
    };
    let destination = resolve_source(&options.home, &request.destination);
    let report = backup_dir(root, &destination, request.mode)?;
    if !options.json {
        OutputFormatter::success(&format!(
            "Backup of {} created at {}",
            root.display(),
            destination.display()
        ));
    }
    Ok(Some(report))
}

/// Shows `question` and asks to proceed on stdin unless `assume_yes` is set.
///
/// Only `y` and `yes` (any case) accept; anything else aborts.
fn confirm(question: &str, options: &RunOptions) -> SweepResult<()> {
    if options.assume_yes {
        return Ok(());
    }
    OutputFormatter::warning(question);
    print!("Proceed? [y/N] ");
    io::stdout()
        .flush()
        .map_err(|e| SweepError::io("<stdout>", e))?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|e| SweepError::io("<stdin>", e))?;

    if is_affirmative(&answer) {
        Ok(())
    } else {
        Err(SweepError::Aborted)
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn emit_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!("Could not serialize report: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> SweepCommand {
        Cli::try_parse_from(args).expect("arguments should parse").command.into()
    }

    #[test]
    fn test_parse_suffix_command() {
        let command = parse(&["dirsweep", "clean-by-suffix", "--source-dir", "Downloads", "--shallow"]);
        assert_eq!(
            command,
            SweepCommand::Classify {
                source_dir: PathBuf::from("Downloads"),
                policy: ClassificationPolicy::BySuffix,
                shallow: true,
                dry_run: false,
                backup: None,
            }
        );
    }

    #[test]
    fn test_parse_accepts_snake_case_aliases() {
        let command = parse(&[
            "dirsweep",
            "clean_by_date",
            "--source_dir",
            "Desktop",
            "--year_only",
        ]);
        assert!(matches!(
            command,
            SweepCommand::Classify {
                policy: ClassificationPolicy::ByDate { year_only: true },
                ..
            }
        ));
    }

    #[test]
    fn test_parse_backup_flags() {
        let command = parse(&[
            "dirsweep",
            "clean-by-size",
            "--source-dir",
            "Downloads",
            "--backup",
            "--backup-dir",
            "Downloads.bak",
            "--create-backup-dir",
        ]);
        let SweepCommand::Classify { backup, .. } = command else {
            panic!("expected a classify command");
        };
        assert_eq!(
            backup,
            Some(BackupRequest {
                destination: PathBuf::from("Downloads.bak"),
                mode: BackupMode::CreateNew,
            })
        );
    }

    #[test]
    fn test_backup_flag_requires_directory() {
        let result = Cli::try_parse_from([
            "dirsweep",
            "clean-by-suffix",
            "--source-dir",
            "Downloads",
            "--backup",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_purge_requires_exactly_one_unit() {
        let command = parse(&["dirsweep", "purge", "--source-dir", "tmp", "--months", "3"]);
        assert!(matches!(
            command,
            SweepCommand::Purge {
                threshold: AgeThreshold::Months(3),
                ..
            }
        ));

        assert!(Cli::try_parse_from(["dirsweep", "purge", "--source-dir", "tmp"]).is_err());
        assert!(
            Cli::try_parse_from([
                "dirsweep",
                "purge",
                "--source-dir",
                "tmp",
                "--days",
                "3",
                "--years",
                "1"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_parse_backup_command() {
        let command = parse(&[
            "dirsweep",
            "backup",
            "--source-dir",
            "Music",
            "--backup-dir",
            "Music.bak",
        ]);
        assert_eq!(
            command,
            SweepCommand::Backup {
                source_dir: PathBuf::from("Music"),
                request: BackupRequest {
                    destination: PathBuf::from("Music.bak"),
                    mode: BackupMode::Merge,
                },
            }
        );
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "dirsweep",
            "purge",
            "--source-dir",
            "tmp",
            "--days",
            "7",
            "--yes",
            "--json",
            "--home",
            "/srv",
        ])
        .unwrap();
        assert!(cli.yes);
        assert!(cli.json);
        assert_eq!(cli.home, Some(PathBuf::from("/srv")));
    }

    #[test]
    fn test_affirmative_answers() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("yep"));
    }
}
