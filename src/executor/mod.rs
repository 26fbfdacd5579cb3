//! Replication of unsynchronized source files into the destination

pub mod copy;
pub mod pool;

pub use copy::{copy_file, copy_file_atomic, copy_file_overwrite};
pub use pool::{JobOutcome, ParallelReplicator, PoolStats};

use crate::config::CopyMode;
use crate::types::{Digest, Node, NodeKind, SyncError, SyncTree};
use crate::Config;
use std::path::{Path, PathBuf};

/// Queue depth per worker when replicating in parallel
const QUEUE_DEPTH_PER_WORKER: usize = 4;

/// One file to copy
#[derive(Debug, Clone, PartialEq)]
pub struct CopyJob {
    /// 1-based position in the plan
    pub index: usize,
    /// Path relative to both roots
    pub relative: PathBuf,
    pub source: PathBuf,
    pub target: PathBuf,
    /// Digest recorded for the source at scan time
    pub digest: Digest,
    pub size: u64,
}

/// Counters for a replication run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicationStats {
    /// Files the plan asked to copy
    pub total_files: usize,
    pub copied_files: usize,
    pub failed_files: usize,
    /// Source files already present at the destination
    pub skipped_files: usize,
    pub bytes_copied: u64,
}

/// Events emitted while replicating
#[derive(Debug)]
pub enum ReplicationEvent<'a> {
    /// A copy was handed to a worker (or started, when sequential)
    Start {
        index: usize,
        total: usize,
        path: &'a Path,
    },
    /// A copy finished
    Copied {
        index: usize,
        total: usize,
        path: &'a Path,
        bytes: u64,
    },
    /// A copy failed; the run continues
    Failed {
        index: usize,
        total: usize,
        path: &'a Path,
        error: &'a SyncError,
    },
    /// Replication finished (with or without failures)
    Complete { stats: &'a ReplicationStats },
}

/// Optional callback used to receive replication events.
pub type ReplicationCallback = dyn Fn(&ReplicationEvent<'_>) + Send + Sync;

/// List the copies needed to bring `destination` up to date with `tree`
///
/// Synchronized directories are skipped whole; every file below one is
/// synchronized already.
pub fn plan_copies(tree: &SyncTree, destination: &Path) -> Vec<CopyJob> {
    let mut jobs = Vec::new();
    for node in &tree.nodes {
        collect_jobs(node, &tree.root_path, destination, &mut jobs);
    }
    jobs
}

fn collect_jobs(node: &Node, source_root: &Path, destination: &Path, jobs: &mut Vec<CopyJob>) {
    if node.synchronized {
        return;
    }

    match &node.kind {
        NodeKind::Directory { children } => {
            for child in children {
                collect_jobs(child, source_root, destination, jobs);
            }
        }
        NodeKind::File { size } => jobs.push(CopyJob {
            index: jobs.len() + 1,
            relative: node.path.clone(),
            source: source_root.join(&node.path),
            target: destination.join(&node.path),
            digest: node.digest,
            size: *size,
        }),
    }
}

/// Copy every unsynchronized file of `tree` to `config.destination`
///
/// Runs sequentially for one thread, on a worker pool otherwise. Per-file
/// failures are reported through `on_event` and folded into a single
/// `CopyFailures` error once every copy has been attempted.
pub fn replicate(
    tree: &SyncTree,
    config: &Config,
    on_event: Option<&ReplicationCallback>,
) -> Result<ReplicationStats, SyncError> {
    let jobs = plan_copies(tree, &config.destination);
    let mut stats = ReplicationStats {
        total_files: jobs.len(),
        skipped_files: tree.total_files.saturating_sub(jobs.len()),
        ..Default::default()
    };

    tracing::info!(
        files = stats.total_files,
        skipped = stats.skipped_files,
        threads = config.threads,
        mode = ?config.copy_mode,
        "replication started"
    );

    let mut errors: Vec<(PathBuf, SyncError)> = Vec::new();
    if config.threads <= 1 || jobs.len() <= 1 {
        run_sequential(jobs, config, &mut stats, &mut errors, on_event);
    } else {
        run_parallel(jobs, config, &mut stats, &mut errors, on_event)?;
    }

    emit_event(on_event, ReplicationEvent::Complete { stats: &stats });
    tracing::info!(
        copied = stats.copied_files,
        failed = stats.failed_files,
        bytes = stats.bytes_copied,
        "replication complete"
    );

    if errors.is_empty() {
        Ok(stats)
    } else {
        Err(SyncError::CopyFailures {
            failed: errors.len(),
            total: stats.total_files,
            summary: build_error_summary(&errors),
        })
    }
}

fn run_sequential(
    jobs: Vec<CopyJob>,
    config: &Config,
    stats: &mut ReplicationStats,
    errors: &mut Vec<(PathBuf, SyncError)>,
    on_event: Option<&ReplicationCallback>,
) {
    for job in jobs {
        emit_event(
            on_event,
            ReplicationEvent::Start {
                index: job.index,
                total: stats.total_files,
                path: &job.relative,
            },
        );
        let result = copy_file(
            &job.source,
            &job.target,
            config.copy_mode,
            &job.digest,
            config.max_hash_bytes,
        );
        record_outcome(job, result, stats, errors, on_event);
    }
}

fn run_parallel(
    jobs: Vec<CopyJob>,
    config: &Config,
    stats: &mut ReplicationStats,
    errors: &mut Vec<(PathBuf, SyncError)>,
    on_event: Option<&ReplicationCallback>,
) -> Result<(), SyncError> {
    let mut pool = ParallelReplicator::new(
        config.threads,
        config.threads * QUEUE_DEPTH_PER_WORKER,
        config.copy_mode,
        config.max_hash_bytes,
    )?;

    for job in jobs {
        emit_event(
            on_event,
            ReplicationEvent::Start {
                index: job.index,
                total: stats.total_files,
                path: &job.relative,
            },
        );
        pool.enqueue(job)?;
        while let Some(outcome) = pool.try_next_outcome() {
            record_pooled(outcome, stats, errors, on_event);
        }
    }

    let (pool_stats, rest) = pool.close_and_wait()?;
    for outcome in rest {
        record_pooled(outcome, stats, errors, on_event);
    }
    tracing::debug!(
        workers = pool_stats.workers,
        per_worker = ?pool_stats.per_worker_completed,
        "worker pool drained"
    );
    Ok(())
}

fn record_pooled(
    outcome: JobOutcome,
    stats: &mut ReplicationStats,
    errors: &mut Vec<(PathBuf, SyncError)>,
    on_event: Option<&ReplicationCallback>,
) {
    tracing::trace!(worker = outcome.worker, index = outcome.job.index, "job finished");
    record_outcome(outcome.job, outcome.result, stats, errors, on_event);
}

fn record_outcome(
    job: CopyJob,
    result: Result<u64, SyncError>,
    stats: &mut ReplicationStats,
    errors: &mut Vec<(PathBuf, SyncError)>,
    on_event: Option<&ReplicationCallback>,
) {
    match result {
        Ok(bytes) => {
            stats.copied_files += 1;
            stats.bytes_copied += bytes;
            tracing::debug!(path = %job.relative.display(), bytes, "copied");
            emit_event(
                on_event,
                ReplicationEvent::Copied {
                    index: job.index,
                    total: stats.total_files,
                    path: &job.relative,
                    bytes,
                },
            );
        }
        Err(err) => {
            stats.failed_files += 1;
            if err.is_fatal() {
                tracing::error!(path = %job.relative.display(), error = %err, "copy task failed");
            } else {
                tracing::warn!(path = %job.relative.display(), error = %err, "copy failed");
            }
            emit_event(
                on_event,
                ReplicationEvent::Failed {
                    index: job.index,
                    total: stats.total_files,
                    path: &job.relative,
                    error: &err,
                },
            );
            errors.push((job.relative, err));
        }
    }
}

fn emit_event(on_event: Option<&ReplicationCallback>, event: ReplicationEvent<'_>) {
    if let Some(callback) = on_event {
        callback(&event);
    }
}

fn build_error_summary(errors: &[(PathBuf, SyncError)]) -> String {
    let preview = errors
        .iter()
        .take(3)
        .map(|(path, err)| format!("{}: {}", path.display(), err))
        .collect::<Vec<_>>()
        .join("; ");

    if errors.len() > 3 {
        format!("{} (and {} more)", preview, errors.len() - 3)
    } else {
        preview
    }
}

/// Human label for a copy mode
pub fn mode_label(mode: CopyMode) -> &'static str {
    match mode {
        CopyMode::Risky => "overwrite in place",
        CopyMode::Safe => "verified atomic rename",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::digest_dir;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn digest(content: &str) -> Digest {
        Digest::from(blake3::hash(content.as_bytes()))
    }

    fn file(path: &str, content: &str) -> Node {
        Node::file(PathBuf::from(path), content.len() as u64, digest(content))
    }

    fn dir(path: &str, children: Vec<Node>) -> Node {
        let d = digest_dir(children.iter().map(|c| &c.digest));
        Node::directory(PathBuf::from(path), children, d)
    }

    fn config_for(src: &TempDir, dst: &TempDir, threads: usize, mode: CopyMode) -> Config {
        Config {
            source: src.path().to_path_buf(),
            destination: dst.path().to_path_buf(),
            threads,
            copy_mode: mode,
            ..Config::default()
        }
    }

    fn write_source(src: &TempDir, rel: &str, content: &str) {
        let path = src.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, content).expect("write source file");
    }

    #[test]
    fn test_plan_skips_synchronized_subtrees() {
        let mut synced = dir("done", vec![file("done/a", "a")]);
        synced.mark_synchronized();
        let mut matched = file("same.txt", "same");
        matched.mark_synchronized();

        let mut tree = SyncTree::new(PathBuf::from("/src"));
        tree.insert(synced);
        tree.insert(matched);
        tree.insert(dir("todo", vec![file("todo/x/y.txt", "y")]));

        let jobs = plan_copies(&tree, Path::new("/dst"));

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].index, 1);
        assert_eq!(jobs[0].source, PathBuf::from("/src/todo/x/y.txt"));
        assert_eq!(jobs[0].target, PathBuf::from("/dst/todo/x/y.txt"));
    }

    #[test]
    fn test_replicate_sequential_creates_parents() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write_source(&src, "x/y.txt", "why");

        let mut tree = SyncTree::new(src.path().to_path_buf());
        tree.insert(dir("x", vec![file("x/y.txt", "why")]));

        let config = config_for(&src, &dst, 1, CopyMode::Risky);
        let stats = replicate(&tree, &config, None).expect("replicate");

        assert_eq!(stats.copied_files, 1);
        assert_eq!(stats.bytes_copied, 3);
        assert_eq!(fs::read_to_string(dst.path().join("x/y.txt")).unwrap(), "why");
    }

    #[test]
    fn test_replicate_parallel_copies_everything() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let mut tree = SyncTree::new(src.path().to_path_buf());
        for i in 0..20 {
            let rel = format!("d{}/f{}.txt", i % 4, i);
            let content = format!("content-{i}");
            write_source(&src, &rel, &content);
            tree.insert(file(&rel, &content));
        }

        let config = config_for(&src, &dst, 4, CopyMode::Safe);
        let stats = replicate(&tree, &config, None).expect("replicate");

        assert_eq!(stats.total_files, 20);
        assert_eq!(stats.copied_files, 20);
        assert_eq!(
            fs::read_to_string(dst.path().join("d3/f19.txt")).unwrap(),
            "content-19"
        );
        let leftovers = fs::read_dir(dst.path().join("d3"))
            .unwrap()
            .filter(|e| {
                let name = e.as_ref().unwrap().file_name();
                name.to_string_lossy().ends_with(".sparsync-tmp")
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_replicate_continues_and_aggregates_failures() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write_source(&src, "good.txt", "good");

        let mut tree = SyncTree::new(src.path().to_path_buf());
        tree.insert(file("missing.txt", "gone"));
        tree.insert(file("good.txt", "good"));

        let config = config_for(&src, &dst, 1, CopyMode::Risky);
        let err = replicate(&tree, &config, None).unwrap_err();

        match err {
            SyncError::CopyFailures { failed, total, summary } => {
                assert_eq!(failed, 1);
                assert_eq!(total, 2);
                assert!(summary.contains("missing.txt"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(dst.path().join("good.txt").exists());
    }

    #[test]
    fn test_replicate_emits_events() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write_source(&src, "new.txt", "new-content");

        let mut tree = SyncTree::new(src.path().to_path_buf());
        tree.insert(file("new.txt", "new-content"));

        let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let events_ref = Arc::clone(&events);
        let callback = move |event: &ReplicationEvent<'_>| {
            let label = match event {
                ReplicationEvent::Start { .. } => "start",
                ReplicationEvent::Copied { .. } => "copied",
                ReplicationEvent::Failed { .. } => "failed",
                ReplicationEvent::Complete { .. } => "complete",
            };
            events_ref.lock().expect("lock events").push(label.to_string());
        };

        let config = config_for(&src, &dst, 1, CopyMode::Risky);
        replicate(&tree, &config, Some(&callback)).expect("replicate");

        let snapshot = events.lock().expect("lock events snapshot").clone();
        assert_eq!(snapshot, vec!["start", "copied", "complete"]);
    }

    #[test]
    fn test_error_summary_truncates_preview() {
        let errors: Vec<(PathBuf, SyncError)> = (0..5)
            .map(|i| {
                (
                    PathBuf::from(format!("f{i}")),
                    SyncError::ChecksumMismatch {
                        path: PathBuf::from(format!("f{i}")),
                    },
                )
            })
            .collect();

        let summary = build_error_summary(&errors);
        assert!(summary.contains("f0"));
        assert!(summary.contains("f2"));
        assert!(!summary.contains("f3:"));
        assert!(summary.contains("and 2 more"));
    }
}
