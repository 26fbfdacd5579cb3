//! # sparsync - content-addressed backup replication
//!
//! Builds BLAKE3 digest trees of a source and a destination, marks every
//! source file or directory whose content already exists anywhere in the
//! destination, and copies only what is left.

// Module declarations
pub mod commands;
pub mod compare;
pub mod config;
pub mod executor;
pub mod hash;
pub mod logging;
pub mod scanner;
pub mod types;
pub mod ui;

// Re-export commonly used types
pub use config::{Config, CopyMode};
pub use types::{Digest, Node, NodeKind, SyncError, SyncTree};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
