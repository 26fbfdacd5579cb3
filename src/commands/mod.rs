//! Subcommand implementations

pub mod backup;
pub mod status;

use crate::compare::{compare, CompareStats, DestinationIndex};
use crate::scanner::{build_tree, ProgressCallback, ScanOptions};
use crate::types::{SyncError, SyncTree};
use crate::ui::ProgressReporter;
use crate::Config;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Both scanned trees with the source marked against the destination
#[derive(Debug)]
pub struct Inventory {
    pub source: SyncTree,
    pub destination: SyncTree,
    pub index: DestinationIndex,
    pub stats: CompareStats,
}

/// Scan both roots, index the destination and run the comparison passes
///
/// A destination that does not exist yet is an empty tree.
pub fn take_inventory(
    config: &Config,
    reporter: &Arc<Mutex<ProgressReporter>>,
) -> Result<Inventory, SyncError> {
    let options = ScanOptions::from_config(config);

    let mut source = scan_root("source", &config.source, &options, reporter)?;
    let destination = if config.destination.exists() {
        scan_root("destination", &config.destination, &options, reporter)?
    } else {
        tracing::info!(
            path = %config.destination.display(),
            "destination does not exist yet, treating as empty"
        );
        SyncTree::new(config.destination.clone())
    };
    if let Ok(progress) = reporter.lock() {
        progress.end_scanning();
    }

    let index = DestinationIndex::from_tree(&destination);
    tracing::debug!(
        files = index.file_count(),
        dirs = index.dir_count(),
        "destination indexed"
    );
    let stats = compare(&mut source, &index);

    Ok(Inventory {
        source,
        destination,
        index,
        stats,
    })
}

fn scan_root(
    label: &'static str,
    root: &Path,
    options: &ScanOptions,
    reporter: &Arc<Mutex<ProgressReporter>>,
) -> Result<SyncTree, SyncError> {
    if let Ok(progress) = reporter.lock() {
        progress.start_scan(label);
    }
    let callback: ProgressCallback = {
        let reporter = Arc::clone(reporter);
        Box::new(move |files: u64, bytes: u64| {
            if let Ok(progress) = reporter.lock() {
                progress.update_scan(label, files, bytes);
            }
        })
    };

    let tree = build_tree(root, options, Some(&callback))?;

    if let Ok(progress) = reporter.lock() {
        progress.finish_scan(label, tree.total_files, tree.total_size);
    }
    Ok(tree)
}
