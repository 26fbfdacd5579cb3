//! Directory scanning logic

mod builder;

pub use builder::{build_tree, ProgressCallback, ScanOptions};
