//! Destination index: which content exists anywhere in the destination

use crate::types::{Digest, Node, NodeKind, SyncTree};
use std::collections::HashSet;

/// Membership sets of every file and directory digest in a tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationIndex {
    file_digests: HashSet<Digest>,
    dir_digests: HashSet<Digest>,
}

impl DestinationIndex {
    /// Flatten a scanned destination tree
    pub fn from_tree(tree: &SyncTree) -> Self {
        Self::from_nodes(&tree.nodes)
    }

    /// Flatten a sequence of nodes and all their descendants
    pub fn from_nodes(nodes: &[Node]) -> Self {
        let mut index = Self::default();
        for node in nodes {
            node.visit(&mut |n| match &n.kind {
                NodeKind::File { .. } => {
                    index.file_digests.insert(n.digest);
                }
                NodeKind::Directory { .. } => {
                    index.dir_digests.insert(n.digest);
                }
            });
        }
        index
    }

    pub fn contains_file(&self, digest: &Digest) -> bool {
        self.file_digests.contains(digest)
    }

    pub fn contains_dir(&self, digest: &Digest) -> bool {
        self.dir_digests.contains(digest)
    }

    /// Number of distinct file digests
    pub fn file_count(&self) -> usize {
        self.file_digests.len()
    }

    /// Number of distinct directory digests
    pub fn dir_count(&self) -> usize {
        self.dir_digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file_digests.is_empty() && self.dir_digests.is_empty()
    }
}
