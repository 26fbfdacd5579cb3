//! Bounded worker pool for concurrent file copies.
//!
//! Dispatcher + worker inbox design:
//! - single-consumer upstream `mpsc::Receiver` (dispatcher)
//! - per-worker bounded `mpsc` inbox channels
//! - outcomes flow back on one unbounded channel
//! - explicit sender drop on shutdown before awaiting workers
//!
//! Each worker copies one file at a time on the blocking thread pool, so at
//! most `workers` source/target pairs are open at once.

use super::copy::copy_file;
use super::CopyJob;
use crate::config::CopyMode;
use crate::types::SyncError;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Result of one finished copy job
#[derive(Debug)]
pub struct JobOutcome {
    pub job: CopyJob,
    pub worker: usize,
    pub result: Result<u64, SyncError>,
}

/// Runtime stats for the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub enqueued: usize,
    pub dispatched: usize,
    pub completed: usize,
    pub per_worker_completed: Vec<usize>,
}

impl PoolStats {
    fn new(workers: usize) -> Self {
        Self {
            workers,
            enqueued: 0,
            dispatched: 0,
            completed: 0,
            per_worker_completed: vec![0; workers],
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CopySettings {
    mode: CopyMode,
    hash_limit: Option<u64>,
}

/// Thread-pool replicator running copy jobs concurrently
pub struct ParallelReplicator {
    runtime: Runtime,
    enqueue_tx: Option<mpsc::Sender<CopyJob>>,
    outcome_rx: mpsc::UnboundedReceiver<JobOutcome>,
    dispatcher_handle: Option<JoinHandle<()>>,
    worker_handles: Vec<JoinHandle<()>>,
    stats: Arc<Mutex<PoolStats>>,
}

impl ParallelReplicator {
    /// Create a dispatcher + worker pool with bounded channels.
    pub fn new(
        worker_count: usize,
        queue_capacity: usize,
        mode: CopyMode,
        hash_limit: Option<u64>,
    ) -> Result<Self, SyncError> {
        let workers = worker_count.max(1);
        let capacity = queue_capacity.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .max_blocking_threads(workers)
            .enable_all()
            .build()
            .map_err(SyncError::Io)?;

        let stats = Arc::new(Mutex::new(PoolStats::new(workers)));
        let settings = CopySettings { mode, hash_limit };
        let handle = runtime.handle().clone();

        let (enqueue_tx, enqueue_rx) = mpsc::channel::<CopyJob>(capacity);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel::<JobOutcome>();

        let mut worker_txs = Vec::with_capacity(workers);
        let mut worker_handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let (worker_tx, worker_rx) = mpsc::channel::<CopyJob>(capacity);
            worker_txs.push(worker_tx);
            worker_handles.push(handle.spawn(worker_loop(
                worker_id,
                worker_rx,
                outcome_tx.clone(),
                settings,
                Arc::clone(&stats),
            )));
        }
        // Workers hold the only remaining outcome senders
        drop(outcome_tx);

        let dispatcher_handle =
            handle.spawn(dispatcher_loop(enqueue_rx, worker_txs, Arc::clone(&stats)));

        Ok(Self {
            runtime,
            enqueue_tx: Some(enqueue_tx),
            outcome_rx,
            dispatcher_handle: Some(dispatcher_handle),
            worker_handles,
            stats,
        })
    }

    /// Enqueue a job; blocks while the upstream queue is full.
    pub fn enqueue(&self, job: CopyJob) -> Result<(), SyncError> {
        let sender = self.enqueue_tx.as_ref().ok_or_else(|| {
            SyncError::Validation("replication queue is already closed".to_string())
        })?;
        let stats = Arc::clone(&self.stats);

        self.runtime.block_on(async {
            sender.send(job).await.map_err(|_| {
                SyncError::Validation("replication queue receiver is closed".to_string())
            })?;

            let mut guard = stats.lock().await;
            guard.enqueued += 1;
            Ok(())
        })
    }

    /// Take one finished outcome without waiting
    pub fn try_next_outcome(&mut self) -> Option<JobOutcome> {
        self.outcome_rx.try_recv().ok()
    }

    /// Close queue input, wait for dispatcher/workers, return leftover outcomes.
    pub fn close_and_wait(mut self) -> Result<(PoolStats, Vec<JobOutcome>), SyncError> {
        self.enqueue_tx.take();

        let dispatcher = self.dispatcher_handle.take();
        let workers = std::mem::take(&mut self.worker_handles);
        let stats = Arc::clone(&self.stats);
        let mut outcome_rx = self.outcome_rx;

        self.runtime.block_on(async move {
            if let Some(handle) = dispatcher {
                handle.await.map_err(map_join_error)?;
            }
            for handle in workers {
                handle.await.map_err(map_join_error)?;
            }

            let mut rest = Vec::new();
            while let Some(outcome) = outcome_rx.recv().await {
                rest.push(outcome);
            }
            let final_stats = stats.lock().await.clone();
            Ok((final_stats, rest))
        })
    }
}

async fn dispatcher_loop(
    mut enqueue_rx: mpsc::Receiver<CopyJob>,
    worker_txs: Vec<mpsc::Sender<CopyJob>>,
    stats: Arc<Mutex<PoolStats>>,
) {
    let mut next_worker = 0usize;
    let worker_len = worker_txs.len();

    while let Some(job) = enqueue_rx.recv().await {
        if worker_len == 0 {
            break;
        }

        let target = next_worker % worker_len;
        if worker_txs[target].send(job).await.is_ok() {
            let mut guard = stats.lock().await;
            guard.dispatched += 1;
            next_worker = (next_worker + 1) % worker_len;
        }
    }
    // worker_txs are dropped here, which closes worker inboxes.
}

async fn worker_loop(
    worker_id: usize,
    mut worker_rx: mpsc::Receiver<CopyJob>,
    outcome_tx: mpsc::UnboundedSender<JobOutcome>,
    settings: CopySettings,
    stats: Arc<Mutex<PoolStats>>,
) {
    while let Some(job) = worker_rx.recv().await {
        let task_job = job.clone();
        let result = tokio::task::spawn_blocking(move || {
            copy_file(
                &task_job.source,
                &task_job.target,
                settings.mode,
                &task_job.digest,
                settings.hash_limit,
            )
        })
        .await
        .unwrap_or_else(|e| Err(map_join_error(e)));

        {
            let mut guard = stats.lock().await;
            guard.completed += 1;
            if let Some(slot) = guard.per_worker_completed.get_mut(worker_id) {
                *slot += 1;
            }
        }

        // Receiver gone means the caller stopped listening; keep draining
        let _ = outcome_tx.send(JobOutcome {
            job,
            worker: worker_id,
            result,
        });
    }
}

fn map_join_error(error: tokio::task::JoinError) -> SyncError {
    SyncError::Validation(format!("replication worker task failed: {}", error))
}
