//! Status command: report what a backup would copy, without writing

use super::{take_inventory, Inventory};
use crate::compare::CompareStats;
use crate::types::{Node, SyncError};
use crate::ui::ProgressReporter;
use crate::Config;
use indicatif::HumanBytes;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Machine-readable status output
#[derive(Debug, Serialize)]
pub struct StatusReport<'a> {
    pub source: &'a Path,
    pub destination: &'a Path,
    pub stats: CompareStats,
    /// Files a backup would copy, relative to both roots
    pub pending: Vec<&'a Path>,
    /// The marked source tree
    pub tree: &'a [Node],
}

impl<'a> StatusReport<'a> {
    pub fn new(inventory: &'a Inventory, destination: &'a Path) -> Self {
        Self {
            source: &inventory.source.root_path,
            destination,
            stats: inventory.stats,
            pending: inventory
                .source
                .pending_files()
                .into_iter()
                .map(|n| n.path.as_path())
                .collect(),
            tree: &inventory.source.nodes,
        }
    }
}

/// Run the status operation
pub fn run(config: &Config, json: bool) -> Result<(), SyncError> {
    let reporter = if json {
        ProgressReporter::hidden()
    } else {
        ProgressReporter::new()
    };
    let reporter = Arc::new(Mutex::new(reporter));
    let inventory = take_inventory(config, &reporter)?;

    if json {
        let report = StatusReport::new(&inventory, &config.destination);
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| SyncError::Validation(format!("cannot render status: {}", e)))?;
        println!("{}", rendered);
    } else {
        println!("{}", format_status(&inventory));
    }
    Ok(())
}

fn format_status(inventory: &Inventory) -> String {
    let pending = inventory.source.pending_files();
    let stats = &inventory.stats;

    let mut lines = Vec::with_capacity(pending.len() + 2);
    if pending.is_empty() {
        lines.push("Up to date: nothing to copy.".to_string());
    } else {
        lines.push("Pending copies:".to_string());
        for node in &pending {
            lines.push(format!("  COPY      {}", node.path.display()));
        }
    }
    lines.push(format!(
        "{} to copy ({}), {} already present",
        stats.files_pending,
        HumanBytes(stats.bytes_pending),
        stats.files_matched
    ));
    lines.join("\n")
}
