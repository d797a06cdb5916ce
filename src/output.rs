//! Output formatting and styling module.
//!
//! Everything the CLI prints for people goes through [`OutputFormatter`]:
//! colored status lines, progress bars for moves and deletions, and summary
//! tables. Diagnostics go through `tracing` instead.

use crate::classifier::BYTES_PER_MB;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;

/// Bytes per gigabyte, decimal.
const BYTES_PER_GB: u64 = 1000 * BYTES_PER_MB;

/// Formats a byte count as `"12.34 MB"`, or `"1.23 GB"` once it would
/// print as 1000.00 MB or more. Rounds half up.
///
/// ```
/// use dirsweep::output::format_size;
///
/// assert_eq!(format_size(2_500_000), "2.50 MB");
/// assert_eq!(format_size(1_500_000_000), "1.50 GB");
/// ```
pub fn format_size(bytes: u64) -> String {
    let centi_mb = hundredths(bytes, BYTES_PER_MB);
    if centi_mb < 100_000 {
        format!("{}.{:02} MB", centi_mb / 100, centi_mb % 100)
    } else {
        let centi_gb = hundredths(bytes, BYTES_PER_GB);
        format!("{}.{:02} GB", centi_gb / 100, centi_gb % 100)
    }
}

// `bytes / unit` in hundredths, rounded half up.
fn hundredths(bytes: u64, unit: u64) -> u64 {
    let step = unit / 100;
    bytes.saturating_add(step / 2) / step
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

/// Manages all CLI output with consistent styling.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for `total` file operations.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Creates a spinner for work whose size is not known up front.
    pub fn create_spinner() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {pos} files {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb
    }

    /// Renders the per-bucket table printed after classification.
    pub fn bucket_table(bucket_counts: &HashMap<String, usize>, total_files: usize) -> String {
        let mut buckets: Vec<_> = bucket_counts.iter().collect();
        buckets.sort_by_key(|&(name, _)| name);

        let width = buckets
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max("Folder".len());

        let mut lines = Vec::with_capacity(buckets.len() + 4);
        lines.push(format!("{:<width$} | Files", "Folder"));
        lines.push("-".repeat(width + 10));
        for (bucket, count) in &buckets {
            lines.push(format!("{:<width$} | {} {}", bucket, count, plural(**count)));
        }
        lines.push("-".repeat(width + 10));
        lines.push(format!(
            "{:<width$} | {} {}",
            "Total",
            total_files,
            plural(total_files)
        ));
        lines.join("\n")
    }

    /// Prints the per-bucket summary table.
    pub fn summary_table(bucket_counts: &HashMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");
        println!("{}", Self::bucket_table(bucket_counts, total_files));
    }

    /// One-line purge summary: `"Deleted 3 files, reclaimed 12.00 MB"`.
    pub fn purge_line(files_deleted: usize, bytes_reclaimed: u64) -> String {
        format!(
            "Deleted {} {}, reclaimed {}",
            files_deleted,
            plural(files_deleted),
            format_size(bytes_reclaimed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_switches_at_1000_mb() {
        assert_eq!(format_size(0), "0.00 MB");
        assert_eq!(format_size(999_990_000), "999.99 MB");
        assert_eq!(format_size(999_994_999), "999.99 MB");
        assert_eq!(format_size(999_995_000), "1.00 GB");
        assert_eq!(format_size(999_999_999), "1.00 GB");
        assert_eq!(format_size(1_000_000_000), "1.00 GB");
        assert_eq!(format_size(12_340_000_000), "12.34 GB");
    }

    #[test]
    fn test_purge_line() {
        assert_eq!(
            OutputFormatter::purge_line(1, 2_000_000),
            "Deleted 1 file, reclaimed 2.00 MB"
        );
        assert_eq!(
            OutputFormatter::purge_line(4, 3_000_000_000),
            "Deleted 4 files, reclaimed 3.00 GB"
        );
    }

    #[test]
    fn test_bucket_table_is_sorted() {
        let mut counts = HashMap::new();
        counts.insert("pdfs".to_string(), 2);
        counts.insert("images".to_string(), 1);

        let table = OutputFormatter::bucket_table(&counts, 3);
        let lines: Vec<_> = table.lines().collect();

        assert_eq!(lines[0], "Folder | Files");
        assert_eq!(lines[2], "images | 1 file");
        assert_eq!(lines[3], "pdfs   | 2 files");
        assert_eq!(lines[5], "Total  | 3 files");
    }
}
