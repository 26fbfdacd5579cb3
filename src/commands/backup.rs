//! Backup command: inventory, compare, replicate

use super::{take_inventory, Inventory};
use crate::executor::{mode_label, replicate, ReplicationEvent};
use crate::types::SyncError;
use crate::ui::ProgressReporter;
use crate::Config;
use indicatif::HumanBytes;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Run the backup operation
pub fn run(config: &Config) -> Result<(), SyncError> {
    let reporter = Arc::new(Mutex::new(ProgressReporter::new()));
    let inventory = take_inventory(config, &reporter)?;

    println!("{}", format_plan_preview(&inventory, config));

    if inventory.stats.files_pending == 0 {
        println!("Nothing to copy.");
        return Ok(());
    }

    if let Ok(mut progress) = reporter.lock() {
        progress.start_copy(inventory.stats.files_pending as u64);
    }

    let error_records: Arc<Mutex<Vec<ErrorRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let progress_cb = {
        let reporter = Arc::clone(&reporter);
        let error_records = Arc::clone(&error_records);
        move |event: &ReplicationEvent<'_>| match event {
            ReplicationEvent::Start { path, .. } => {
                if let Ok(progress) = reporter.lock() {
                    progress.set_current_file(path);
                }
            }
            ReplicationEvent::Copied { bytes, .. } => {
                if let Ok(mut progress) = reporter.lock() {
                    progress.complete_file(*bytes);
                }
            }
            ReplicationEvent::Failed { path, error, .. } => {
                if let Ok(progress) = reporter.lock() {
                    progress.copy_error(path, &error.to_string());
                }
                if let Ok(mut records) = error_records.lock() {
                    records.push(ErrorRecord::new(path, error));
                }
            }
            ReplicationEvent::Complete { stats } => {
                if let Ok(progress) = reporter.lock() {
                    progress.finish_copy(stats.copied_files, stats.failed_files, stats.bytes_copied);
                }
            }
        }
    };

    let result = replicate(&inventory.source, config, Some(&progress_cb));
    if let Ok(records) = error_records.lock() {
        if !records.is_empty() {
            println!("{}", format_error_summary(&records));
        }
    }

    result?;
    Ok(())
}

fn format_plan_preview(inventory: &Inventory, config: &Config) -> String {
    let stats = &inventory.stats;
    format!(
        "Plan:\n  Copy: {}  Already present: {}\n  Directories matched: {} exact, {} scattered\n  Total bytes to copy: {}\n  Mode: {}",
        stats.files_pending,
        stats.files_matched,
        stats.dirs_exact,
        stats.dirs_scattered,
        HumanBytes(stats.bytes_pending),
        mode_label(config.copy_mode)
    )
}

#[derive(Debug)]
struct ErrorRecord {
    kind: &'static str,
    path: PathBuf,
    /// Filesystem path the error names, when it differs from `path`
    location: Option<PathBuf>,
    message: String,
    suggestion: Option<String>,
}

impl ErrorRecord {
    fn new(path: &Path, error: &SyncError) -> Self {
        let (message, suggestion) = humanize_error(error);
        Self {
            kind: error_kind_label(error),
            path: path.to_path_buf(),
            location: error.path().filter(|p| *p != path).map(Path::to_path_buf),
            message,
            suggestion,
        }
    }
}

fn humanize_error(error: &SyncError) -> (String, Option<String>) {
    match error {
        SyncError::Copy { source, .. } | SyncError::Io(source) => match source.kind() {
            ErrorKind::NotFound => (
                "Source file vanished before it could be copied".to_string(),
                Some("Re-run the backup once the source is stable.".to_string()),
            ),
            ErrorKind::PermissionDenied => (
                "Permission denied while writing the destination".to_string(),
                Some("Check destination permissions or run with a user that has access.".to_string()),
            ),
            ErrorKind::AlreadyExists | ErrorKind::NotADirectory => (
                "A file is in the way of a destination directory".to_string(),
                Some("Remove or rename the conflicting path, then retry.".to_string()),
            ),
            ErrorKind::StorageFull => (
                "Not enough disk space to complete the copy".to_string(),
                Some("Free space on the destination and retry.".to_string()),
            ),
            _ => (
                format!("I/O operation failed: {}", source),
                Some("Retry the backup. If this keeps happening, check disk health.".to_string()),
            ),
        },
        SyncError::ChecksumMismatch { .. } => (
            "Written bytes did not match the source digest".to_string(),
            Some("The source may have changed during the copy; re-run the backup.".to_string()),
        ),
        other => (other.to_string(), None),
    }
}

fn error_kind_label(error: &SyncError) -> &'static str {
    match error {
        SyncError::Io(_) => "I/O error",
        SyncError::Walk { .. } => "Walk error",
        SyncError::Hash { .. } => "Hash error",
        SyncError::Copy { .. } => "Copy error",
        SyncError::ChecksumMismatch { .. } => "Checksum mismatch",
        SyncError::CopyFailures { .. } => "Copy failures",
        SyncError::Config(_) => "Configuration error",
        SyncError::Validation(_) => "Validation error",
    }
}

fn format_error_summary(records: &[ErrorRecord]) -> String {
    let mut groups: BTreeMap<&'static str, Vec<&ErrorRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.kind).or_default().push(record);
    }

    let mut lines = Vec::new();
    lines.push("Error summary:".to_string());
    for (kind, items) in groups {
        lines.push(format!("  {} ({}):", kind, items.len()));
        for record in items.iter().take(3) {
            lines.push(format!("    - {}", record.message));
            lines.push(format!("      Path: {}", record.path.display()));
            if let Some(location) = &record.location {
                lines.push(format!("      At: {}", location.display()));
            }
            if let Some(suggestion) = &record.suggestion {
                lines.push(format!("      Try: {}", suggestion));
            }
        }
        if items.len() > 3 {
            lines.push(format!("    - ... {} more", items.len() - 3));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{CompareStats, DestinationIndex};
    use crate::types::SyncTree;
    use std::io::Error as IoError;

    fn inventory_with(stats: CompareStats) -> Inventory {
        Inventory {
            source: SyncTree::new(PathBuf::from("/src")),
            destination: SyncTree::new(PathBuf::from("/dst")),
            index: DestinationIndex::default(),
            stats,
        }
    }

    #[test]
    fn test_plan_preview_contains_counts() {
        let inventory = inventory_with(CompareStats {
            files_matched: 4,
            files_pending: 2,
            bytes_pending: 5 * 1024 * 1024,
            dirs_exact: 1,
            dirs_scattered: 3,
        });

        let preview = format_plan_preview(&inventory, &Config::default());
        assert!(preview.contains("Copy: 2"));
        assert!(preview.contains("Already present: 4"));
        assert!(preview.contains("1 exact, 3 scattered"));
        assert!(preview.contains("MiB"), "expected human-readable size, got: {preview}");
        assert!(preview.contains("overwrite in place"));
    }

    #[test]
    fn test_humanize_permission_denied() {
        let err = SyncError::Copy {
            path: PathBuf::from("x"),
            source: IoError::new(ErrorKind::PermissionDenied, "denied"),
        };
        let (message, suggestion) = humanize_error(&err);
        assert!(message.contains("Permission denied"));
        assert!(suggestion.is_some());
    }

    #[test]
    fn test_error_summary_groups_by_kind() {
        let copy_err = SyncError::Copy {
            path: PathBuf::from("a"),
            source: IoError::new(ErrorKind::NotFound, "gone"),
        };
        let mismatch = SyncError::ChecksumMismatch {
            path: PathBuf::from("b"),
        };
        let records = vec![
            ErrorRecord::new(Path::new("a"), &copy_err),
            ErrorRecord::new(Path::new("b"), &mismatch),
            ErrorRecord::new(Path::new("c"), &copy_err),
        ];

        let summary = format_error_summary(&records);
        assert!(summary.starts_with("Error summary:"));
        assert!(summary.contains("Copy error (2):"));
        assert!(summary.contains("Checksum mismatch (1):"));
        assert!(summary.contains("Path: c"));
        assert!(records[0].location.is_none(), "matching error path is not repeated");
        assert!(summary.contains("At: a"));
    }

    #[test]
    fn test_error_summary_shows_failing_location() {
        let err = SyncError::Copy {
            path: PathBuf::from("/backup/photos"),
            source: IoError::new(ErrorKind::NotADirectory, "not a directory"),
        };
        let records = vec![ErrorRecord::new(Path::new("photos/1.jpg"), &err)];

        let summary = format_error_summary(&records);
        assert!(summary.contains("Path: photos/1.jpg"));
        assert!(summary.contains("At: /backup/photos"));
    }

    #[test]
    fn test_error_summary_truncates_large_groups() {
        let mismatch = SyncError::ChecksumMismatch {
            path: PathBuf::from("x"),
        };
        let records: Vec<_> = (0..5)
            .map(|i| ErrorRecord::new(Path::new(&format!("f{i}")), &mismatch))
            .collect();

        let summary = format_error_summary(&records);
        assert!(summary.contains("... 2 more"));
    }
}
