//! Core type definitions for sparsync

mod digest;
mod error;
mod node;
mod tree;

pub use digest::Digest;
pub use error::SyncError;
pub use node::{Node, NodeKind};
pub use tree::SyncTree;
