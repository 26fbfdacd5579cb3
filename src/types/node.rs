//! Node - one filesystem entry observed during a walk

use super::Digest;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What kind of entry a node is
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    /// Regular file with its size in bytes
    File { size: u64 },

    /// Directory owning its children in listing order
    Directory { children: Vec<Node> },
}

/// A file or directory in a scanned tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Relative path from the scan root
    pub path: PathBuf,

    #[serde(flatten)]
    pub kind: NodeKind,

    /// Content fingerprint, fixed at walk time
    pub digest: Digest,

    /// Content judged already present at the destination
    pub synchronized: bool,
}

impl Node {
    /// Create a file node
    pub fn file(path: PathBuf, size: u64, digest: Digest) -> Self {
        Self {
            path,
            kind: NodeKind::File { size },
            digest,
            synchronized: false,
        }
    }

    /// Create a directory node from already-built children
    pub fn directory(path: PathBuf, children: Vec<Node>, digest: Digest) -> Self {
        Self {
            path,
            kind: NodeKind::Directory { children },
            digest,
            synchronized: false,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    /// Direct children (empty for files)
    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } => &[],
        }
    }

    /// Mark synchronized. Never cleared within a run.
    pub fn mark_synchronized(&mut self) {
        self.synchronized = true;
    }

    /// Depth-first pre-order visit of this node and its descendants
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }
}
