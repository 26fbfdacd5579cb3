//! SyncTree - one scanned directory hierarchy

use super::{Node, NodeKind};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result of walking one root
///
/// The root directory itself is not a node; `nodes` holds its direct
/// children in listing order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncTree {
    /// Absolute root the walk started from
    pub root_path: PathBuf,

    /// Top-level entries of the root
    pub nodes: Vec<Node>,

    /// Aggregate statistics
    pub total_size: u64,
    pub total_files: usize,
    pub total_dirs: usize,

    /// Scan metadata
    #[serde(skip)]
    pub scan_duration: Duration,
}

impl SyncTree {
    /// Create a new empty SyncTree
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            nodes: Vec::new(),
            total_size: 0,
            total_files: 0,
            total_dirs: 0,
            scan_duration: Duration::from_secs(0),
        }
    }

    /// Append a top-level node and fold its subtree into the statistics
    pub fn insert(&mut self, node: Node) {
        node.visit(&mut |n| match &n.kind {
            NodeKind::File { size } => {
                self.total_files += 1;
                self.total_size += size;
            }
            NodeKind::Directory { .. } => self.total_dirs += 1,
        });
        self.nodes.push(node);
    }

    /// Find a node by its root-relative path
    pub fn get(&self, path: &Path) -> Option<&Node> {
        let mut found = None;
        for top in &self.nodes {
            top.visit(&mut |n| {
                if found.is_none() && n.path == path {
                    found = Some(n);
                }
            });
            if found.is_some() {
                break;
            }
        }
        found
    }

    /// Check if a path exists in the tree
    pub fn contains(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    /// Every node, depth-first pre-order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        let mut all = Vec::new();
        for top in &self.nodes {
            top.visit(&mut |n| all.push(n));
        }
        all.into_iter()
    }

    /// File nodes not yet judged present at the destination, in walk order
    pub fn pending_files(&self) -> Vec<&Node> {
        self.iter()
            .filter(|n| n.is_file() && !n.synchronized)
            .collect()
    }

    /// Number of nodes (files and directories)
    pub fn len(&self) -> usize {
        self.total_files + self.total_dirs
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Set the scan duration after scanning completes
    pub fn set_scan_duration(&mut self, duration: Duration) {
        self.scan_duration = duration;
    }
}
