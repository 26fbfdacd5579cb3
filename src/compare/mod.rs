//! Content comparison between source and destination
//!
//! Pass 1 marks source nodes whose exact content exists anywhere in the
//! destination. Pass 2 then promotes directories whose members all matched,
//! even when those members were scattered across the destination.

mod index;
mod passes;

pub use index::DestinationIndex;
pub use passes::{mark_exact, promote_scattered};

use crate::types::{NodeKind, SyncTree};
use serde::Serialize;

/// What the comparison decided for a source tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompareStats {
    /// Files already present somewhere at the destination
    pub files_matched: usize,
    /// Files that will be copied
    pub files_pending: usize,
    /// Bytes of the pending files
    pub bytes_pending: u64,
    /// Directories whose whole digest exists at the destination
    pub dirs_exact: usize,
    /// Directories synchronized only because every child was
    pub dirs_scattered: usize,
}

/// Run both passes over `tree`
///
/// Pass 2 depends on Pass 1's results, so the order is fixed.
pub fn compare(tree: &mut SyncTree, index: &DestinationIndex) -> CompareStats {
    for node in tree.nodes.iter_mut() {
        mark_exact(node, index);
    }
    let dirs_exact = tree
        .iter()
        .filter(|n| n.is_dir() && n.synchronized)
        .count();

    for node in tree.nodes.iter_mut() {
        promote_scattered(node);
    }

    let mut stats = CompareStats {
        dirs_exact,
        ..CompareStats::default()
    };
    for node in tree.iter() {
        match &node.kind {
            NodeKind::File { .. } if node.synchronized => stats.files_matched += 1,
            NodeKind::File { size } => {
                stats.files_pending += 1;
                stats.bytes_pending += size;
            }
            NodeKind::Directory { .. } if node.synchronized => stats.dirs_scattered += 1,
            NodeKind::Directory { .. } => {}
        }
    }
    stats.dirs_scattered -= dirs_exact;

    tracing::info!(
        matched = stats.files_matched,
        pending = stats.files_pending,
        bytes_pending = stats.bytes_pending,
        dirs_exact = stats.dirs_exact,
        dirs_scattered = stats.dirs_scattered,
        "comparison complete"
    );

    stats
}
