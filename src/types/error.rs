//! Error types for sparsync

use std::path::PathBuf;
use thiserror::Error;

/// Error types for sparsync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory entry could not be listed or inspected during a walk
    #[error("Walk error at {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File bytes could not be read while hashing
    #[error("Hash error at {path}: {source}")]
    Hash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Destination write failed for a single file
    #[error("Copy error at {path}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Safe-mode verification found different bytes at the destination
    #[error("Checksum mismatch: {path}")]
    ChecksumMismatch { path: PathBuf },

    /// A replication pass finished with one or more failed files
    #[error("Replication finished with {failed} of {total} file(s) failed: {summary}")]
    CopyFailures {
        failed: usize,
        total: usize,
        summary: String,
    },

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error (logic checks)
    #[error("Validation error: {0}")]
    Validation(String),
}

impl SyncError {
    /// Errors that stop the whole run rather than a single file
    pub fn is_fatal(&self) -> bool {
        !self.is_copy_error()
    }

    /// Per-file replication errors
    pub fn is_copy_error(&self) -> bool {
        matches!(
            self,
            SyncError::Copy { .. } | SyncError::ChecksumMismatch { .. }
        )
    }

    /// Check if this error is a configuration or validation error
    pub fn is_config_error(&self) -> bool {
        matches!(self, SyncError::Config(_) | SyncError::Validation(_))
    }

    /// Path the error refers to, when there is one
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            SyncError::Walk { path, .. }
            | SyncError::Hash { path, .. }
            | SyncError::Copy { path, .. }
            | SyncError::ChecksumMismatch { path } => Some(path),
            _ => None,
        }
    }

    pub(crate) fn walk(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Walk {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn hash(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Hash {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn copy(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Copy {
            path: path.into(),
            source,
        }
    }
}
