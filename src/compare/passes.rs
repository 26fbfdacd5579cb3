//! The two marking passes over the source tree

use super::DestinationIndex;
use crate::types::{Node, NodeKind};

/// Pass 1: mark every node whose exact content exists in the destination
///
/// Directories are checked against directory digests, files against file
/// digests. Children are handled before their parent.
pub fn mark_exact(node: &mut Node, index: &DestinationIndex) {
    let matched = match &mut node.kind {
        NodeKind::Directory { children } => {
            for child in children.iter_mut() {
                mark_exact(child, index);
            }
            index.contains_dir(&node.digest)
        }
        NodeKind::File { .. } => index.contains_file(&node.digest),
    };

    if matched {
        tracing::trace!(path = %node.path.display(), "exact match");
        node.mark_synchronized();
    }
}

/// Pass 2: promote directories whose direct children are all synchronized
///
/// Runs bottom-up, so a child's promotion is visible to its parent. An empty
/// directory is synchronized (every one of its zero children is). Returns
/// the node's final state.
pub fn promote_scattered(node: &mut Node) -> bool {
    if let NodeKind::Directory { children } = &mut node.kind {
        let mut all_synced = true;
        for child in children.iter_mut() {
            // No short-circuit: every branch must be visited
            all_synced &= promote_scattered(child);
        }

        if all_synced && !node.synchronized {
            tracing::trace!(path = %node.path.display(), "scatter match");
            node.mark_synchronized();
        }
    }

    node.synchronized
}
