//! Tree builder: walks a root and hashes every kept entry

use crate::config::Config;
use crate::hash::{digest_dir, digest_file};
use crate::types::{Node, SyncError, SyncTree};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Callback for reporting scan progress
///
/// Arguments:
/// - `files_scanned`: Total number of files hashed so far
/// - `bytes_scanned`: Total bytes of those files
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Skip rules and hashing limits for one walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Skip entries whose name starts with `.`
    pub ignore_dotfiles: bool,

    /// Paths never walked; absolute, or relative to the scanned root
    pub ignore_set: HashSet<PathBuf>,

    /// Per-file hashing cap in bytes
    pub max_hash_bytes: Option<u64>,
}

impl ScanOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ignore_dotfiles: config.ignore_dotfiles,
            ignore_set: config.ignore_list.iter().cloned().collect(),
            max_hash_bytes: config.max_hash_bytes,
        }
    }

    /// Resolve the ignore set against a canonical root
    fn resolved_ignores(&self, root: &Path) -> HashSet<PathBuf> {
        self.ignore_set
            .iter()
            .map(|p| {
                if p.is_absolute() {
                    p.canonicalize().unwrap_or_else(|_| p.clone())
                } else {
                    root.join(p)
                }
            })
            .collect()
    }
}

/// Directory still collecting children while the walk is inside it
struct OpenDir {
    path: PathBuf,
    children: Vec<Node>,
}

impl OpenDir {
    fn close(self) -> Node {
        let digest = digest_dir(self.children.iter().map(|c| &c.digest));
        Node::directory(self.path, self.children, digest)
    }
}

/// Walk `root_path` and build its content-addressed tree
///
/// Entries are visited in listing order. Dotfiles (when enabled), symlinks,
/// special files and ignored paths are left out. Any unreadable entry fails
/// the whole build.
///
/// # Errors
/// * `SyncError::Walk` - root missing, directory unreadable, entry vanished
/// * `SyncError::Hash` - file content could not be read
pub fn build_tree(
    root_path: &Path,
    options: &ScanOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<SyncTree, SyncError> {
    let start_time = Instant::now();
    let root = root_path
        .canonicalize()
        .map_err(|e| SyncError::walk(root_path, e))?;
    let mut tree = SyncTree::new(root.clone());

    let mut scanned_count: u64 = 0;
    let mut scanned_bytes: u64 = 0;

    let ignored = options.resolved_ignores(&root);

    // Standard filters would pull in .gitignore handling; only the
    // dotfile rule is wanted here.
    let walker = ignore::WalkBuilder::new(&root)
        .standard_filters(false)
        .hidden(options.ignore_dotfiles)
        .follow_links(false)
        .filter_entry(move |entry| !ignored.contains(entry.path()))
        .build();

    // stack[d] is the open directory at depth d; stack[0] is the root
    let mut stack: Vec<OpenDir> = vec![OpenDir {
        path: PathBuf::new(),
        children: Vec::new(),
    }];

    for result in walker {
        let entry = result.map_err(|e| map_walk_error(&root, e))?;
        let depth = entry.depth();
        if depth == 0 {
            continue;
        }

        while stack.len() > depth {
            close_top(&mut stack);
        }

        let file_type = entry.file_type().ok_or_else(|| {
            SyncError::walk(
                entry.path(),
                std::io::Error::other("cannot determine entry type"),
            )
        })?;

        if file_type.is_symlink() {
            tracing::trace!(path = %entry.path().display(), "skipping symlink");
            continue;
        }

        let relative_path = entry
            .path()
            .strip_prefix(&root)
            .map(Path::to_path_buf)
            .map_err(|_| {
                SyncError::walk(
                    entry.path(),
                    std::io::Error::other("entry escaped the scan root"),
                )
            })?;

        if file_type.is_dir() {
            stack.push(OpenDir {
                path: relative_path,
                children: Vec::new(),
            });
            continue;
        }

        if !file_type.is_file() {
            tracing::debug!(path = %entry.path().display(), "skipping special file");
            continue;
        }

        let size = entry
            .metadata()
            .map_err(|e| map_walk_error(&root, e))?
            .len();
        let digest = digest_file(entry.path(), options.max_hash_bytes)?;
        tracing::trace!(path = %relative_path.display(), %digest, "hashed file");

        if let Some(parent) = stack.last_mut() {
            parent.children.push(Node::file(relative_path, size, digest));
        }

        scanned_count += 1;
        scanned_bytes += size;
        if let Some(callback) = on_progress {
            callback(scanned_count, scanned_bytes);
        }
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    if let Some(top) = stack.pop() {
        for node in top.children {
            tree.insert(node);
        }
    }

    tree.set_scan_duration(start_time.elapsed());
    tracing::info!(
        root = %root.display(),
        files = tree.total_files,
        dirs = tree.total_dirs,
        bytes = tree.total_size,
        elapsed_ms = tree.scan_duration.as_millis() as u64,
        "scan complete"
    );

    Ok(tree)
}

fn close_top(stack: &mut Vec<OpenDir>) {
    if let Some(done) = stack.pop() {
        let node = done.close();
        if let Some(parent) = stack.last_mut() {
            parent.children.push(node);
        }
    }
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        _ => None,
    }
}

fn map_walk_error(root: &Path, err: ignore::Error) -> SyncError {
    let path = error_path(&err)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    let source = match err.io_error() {
        Some(io) => std::io::Error::new(io.kind(), err.to_string()),
        None => std::io::Error::other(err.to_string()),
    };
    SyncError::walk(path, source)
}
