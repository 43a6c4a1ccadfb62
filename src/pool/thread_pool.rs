//! Batch pool implementation: lifecycle and round-robin dispatch

use crate::core::{Batch, BatchHandle, BatchId, BatchResults, PoolError, Result, ResultChannel};
use crate::pool::worker::{Worker, WorkerState, WorkerStats};
use crate::queue::{PendingBatch, QueueError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Configuration for a batch pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads (0 is treated as 1)
    pub num_workers: usize,
    /// Largest batch accepted by [`BatchPool::submit`]
    pub max_batch_size: usize,
    /// Thread name prefix; workers are named `{prefix}-{index}`
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_workers: 4,
            max_batch_size: 256,
            thread_name_prefix: "batch-worker".to_string(),
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with the specified number of workers
    #[must_use]
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers: num_workers.max(1),
            ..Default::default()
        }
    }

    /// Set maximum batch size
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Set thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// ```rust
    /// use batch_pool::PoolConfig;
    ///
    /// let config = PoolConfig::from_json(r#"{ "num_workers": 3 }"#).unwrap();
    /// assert_eq!(config.num_workers, 3);
    /// assert_eq!(config.max_batch_size, 256);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PoolError::invalid_config("json", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(PoolError::invalid_config(
                "max_batch_size",
                "Maximum batch size must be greater than 0",
            ));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(PoolError::invalid_config(
                "thread_name_prefix",
                "Thread name prefix must not be empty",
            ));
        }
        if self.thread_name_prefix.contains('\0') {
            return Err(PoolError::invalid_config(
                "thread_name_prefix",
                "Thread name prefix must not contain NUL bytes",
            ));
        }
        Ok(())
    }

    fn worker_count(&self) -> usize {
        self.num_workers.max(1)
    }
}

/// A fixed-size pool of workers, each with its own queue.
///
/// Every submitted [`Batch`] goes to exactly one worker, chosen round-robin
/// regardless of queue depth. Workers are spawned when the pool is created
/// and live until [`shutdown`](Self::shutdown).
///
/// # Locking
///
/// Submission takes the cursor lock to pick a worker, releases it, and only
/// then takes that worker's queue lock. The two are never held together.
///
/// # Example
///
/// ```rust
/// use batch_pool::prelude::*;
///
/// # fn main() -> Result<()> {
/// let pool = BatchPool::new(3)?;
///
/// let handles = vec![
///     pool.submit(Batch::new().with_job(Job::add(2, 3)))?,
///     pool.submit(Batch::new().with_job(Job::sub(10, 4)))?,
///     pool.submit(Batch::new().with_job(Job::mul(6, 7)))?,
/// ];
/// let workers: Vec<usize> = handles.iter().map(BatchHandle::worker).collect();
/// assert_eq!(workers, vec![0, 1, 2]);
///
/// for handle in handles {
///     println!("{:?}", handle.wait()?.values());
/// }
///
/// pool.shutdown()?;
/// # Ok(())
/// # }
/// ```
pub struct BatchPool {
    config: PoolConfig,
    workers: Vec<Worker>,
    cursor: Mutex<usize>,
    running: AtomicBool,
    total_batches_submitted: AtomicU64,
    total_jobs_submitted: AtomicU64,
}

impl std::fmt::Debug for BatchPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchPool")
            .field("config", &self.config)
            .field("running", &self.running.load(Ordering::Relaxed))
            .field(
                "total_batches_submitted",
                &self.total_batches_submitted.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl BatchPool {
    /// Create a pool with `num_workers` workers (at least one)
    pub fn new(num_workers: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(num_workers))
    }

    /// Create a pool with custom configuration and spawn its workers
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` - The configuration failed validation
    /// - `PoolError::Init` - A worker thread could not be spawned; workers
    ///   started before it are stopped and joined first
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let count = config.worker_count();
        let mut workers = Vec::with_capacity(count);
        Self::spawn_workers(&config, &mut workers, Worker::new)?;

        log::info!(
            "Batch pool '{}' started with {} workers",
            config.thread_name_prefix,
            count
        );
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_pool_start(count);

        Ok(Self {
            config: PoolConfig {
                num_workers: count,
                ..config
            },
            workers,
            cursor: Mutex::new(0),
            running: AtomicBool::new(true),
            total_batches_submitted: AtomicU64::new(0),
            total_jobs_submitted: AtomicU64::new(0),
        })
    }

    /// Start `config.worker_count()` workers into `workers`.
    ///
    /// If worker `k` fails to start, workers `0..k` are stopped and joined
    /// (they stay in `workers`, stopped) and the start error is returned.
    pub(crate) fn spawn_workers<F>(
        config: &PoolConfig,
        workers: &mut Vec<Worker>,
        mut spawn: F,
    ) -> Result<()>
    where
        F: FnMut(usize, String) -> Result<Worker>,
    {
        for id in 0..config.worker_count() {
            let name = format!("{}-{}", config.thread_name_prefix, id);
            match spawn(id, name) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    log::error!("Failed to start worker {}: {}; rolling back", id, e);
                    if let Err(rollback) = Self::tear_down(workers) {
                        log::error!("Rollback after failed start also failed: {}", rollback);
                    }
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Submit a batch to the next worker in rotation
    ///
    /// Returns a handle to wait on for the batch's results.
    ///
    /// # Errors
    ///
    /// - `PoolError::EmptyBatch` - The batch has no jobs
    /// - `PoolError::BatchTooLarge` - The batch exceeds `max_batch_size`
    /// - `PoolError::InvalidState` - The pool has been shut down
    pub fn submit(&self, batch: Batch) -> Result<BatchHandle> {
        if !self.running.load(Ordering::Acquire) {
            return Err(PoolError::invalid_state("pool has been shut down"));
        }
        if batch.is_empty() {
            return Err(PoolError::EmptyBatch);
        }
        if batch.len() > self.config.max_batch_size {
            return Err(PoolError::batch_too_large(
                batch.len(),
                self.config.max_batch_size,
            ));
        }

        let index = self.next_worker();
        let len = batch.len();
        let channel = ResultChannel::new(BatchId::new_v4());
        let pending = PendingBatch::new(batch.into_jobs(), Arc::clone(&channel));

        match self.workers[index].enqueue(pending) {
            Ok(_depth) => {
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_submission(index, len, _depth);
            }
            Err(QueueError::Closed(rejected)) => {
                rejected.channel.discard();
                return Err(PoolError::invalid_state(format!(
                    "worker {} is shutting down",
                    index
                )));
            }
        }

        self.total_batches_submitted.fetch_add(1, Ordering::Relaxed);
        self.total_jobs_submitted
            .fetch_add(len as u64, Ordering::Relaxed);
        Ok(BatchHandle::new(index, len, channel))
    }

    /// Submit a batch and block until its results are ready
    pub fn execute(&self, batch: Batch) -> Result<BatchResults> {
        self.submit(batch)?.wait()
    }

    /// Read the cursor and advance it. Only the cursor lock is held here.
    fn next_worker(&self) -> usize {
        let mut cursor = self.cursor.lock();
        let index = *cursor;
        *cursor = (index + 1) % self.workers.len();
        index
    }

    /// Get the number of workers
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Get the configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Check if the pool is accepting batches
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Get total number of batches submitted
    pub fn total_batches_submitted(&self) -> u64 {
        self.total_batches_submitted.load(Ordering::Relaxed)
    }

    /// Get total number of jobs submitted
    pub fn total_jobs_submitted(&self) -> u64 {
        self.total_jobs_submitted.load(Ordering::Relaxed)
    }

    /// Jobs currently waiting in each worker's queue, by worker index
    pub fn queue_depths(&self) -> Vec<usize> {
        self.workers.iter().map(Worker::queued_jobs).collect()
    }

    /// Loop state of each worker, by worker index
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.workers.iter().map(Worker::state).collect()
    }

    /// Get statistics for all workers
    pub fn get_stats(&self) -> Vec<Arc<WorkerStats>> {
        self.workers.iter().map(Worker::stats).collect()
    }

    /// Get total jobs processed across all workers
    pub fn total_jobs_processed(&self) -> u64 {
        self.workers
            .iter()
            .map(|w| w.stats().get_jobs_processed())
            .sum()
    }

    /// Get total jobs faulted across all workers
    pub fn total_jobs_faulted(&self) -> u64 {
        self.workers
            .iter()
            .map(|w| w.stats().get_jobs_faulted())
            .sum()
    }

    /// Get total jobs discarded during shutdown across all workers
    pub fn total_jobs_discarded(&self) -> u64 {
        self.workers
            .iter()
            .map(|w| w.stats().get_jobs_discarded())
            .sum()
    }

    /// Shut the pool down and wait for all workers to exit
    ///
    /// # Shutdown
    ///
    /// 1. Stops accepting new batches
    /// 2. Closes every worker queue and wakes the workers
    /// 3. Joins all worker threads
    ///
    /// Batches still queued when a worker sees the stop are discarded, and
    /// their producers get [`PoolError::Discarded`]. Calling this more than
    /// once is a no-op.
    pub fn shutdown(&self) -> Result<()> {
        if self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        let result = Self::tear_down(&self.workers);

        log::info!(
            "Batch pool '{}' shut down: {} jobs processed, {} discarded",
            self.config.thread_name_prefix,
            self.total_jobs_processed(),
            self.total_jobs_discarded()
        );
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_pool_shutdown(
            self.total_jobs_processed(),
            self.total_jobs_discarded(),
        );

        result
    }

    /// Stop, join and empty every worker. Reports the first join failure.
    fn tear_down(workers: &[Worker]) -> Result<()> {
        for worker in workers {
            worker.signal_stop();
        }

        let mut first_error = None;
        for worker in workers {
            if let Err(e) = worker.join() {
                log::error!("{}", e);
                first_error.get_or_insert(e);
            }
            let leftover = worker.discard_remaining();
            if leftover > 0 {
                log::warn!(
                    "Worker {} exited with {} jobs still queued",
                    worker.id(),
                    leftover
                );
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for BatchPool {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!(
                "Failed to shutdown batch pool '{}' during drop: {}",
                self.config.thread_name_prefix,
                e
            );
        }
    }
}
