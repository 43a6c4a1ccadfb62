//! Worker thread implementation

use crate::core::{BatchResults, JobResult, PoolError, Result};
use crate::queue::{Drained, PendingBatch, QueueResult, WorkerQueue};
use crossbeam_utils::CachePadded;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use ::tracing::{debug, span, Level};

/// Where a worker is in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum WorkerState {
    /// Queue empty, waiting to be signalled
    Idle = 0,
    /// Detaching the whole queue under the worker's lock
    Draining = 1,
    /// Evaluating detached jobs
    Computing = 2,
    /// Handing results to producers
    Reporting = 3,
    /// Thread has exited
    Stopped = 4,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Draining,
            2 => WorkerState::Computing,
            3 => WorkerState::Reporting,
            _ => WorkerState::Stopped,
        }
    }
}

/// Statistics for a worker thread
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Number of times the worker detached its queue
    pub drains: AtomicU64,
    /// Total number of batches whose results were reported
    pub batches_completed: AtomicU64,
    /// Total number of jobs computed, faulted or not
    pub jobs_processed: AtomicU64,
    /// Total number of jobs that produced a fault
    pub jobs_faulted: AtomicU64,
    /// Total number of jobs dropped during shutdown
    pub jobs_discarded: AtomicU64,
    /// Total time spent computing batches (microseconds)
    pub total_processing_time_us: AtomicU64,
}

impl WorkerStats {
    /// Create new worker statistics
    pub fn new() -> Self {
        Self::default()
    }

    fn record_drain(&self) {
        self.drains.fetch_add(1, Ordering::Relaxed);
    }

    fn record_batch(&self, jobs: usize, faults: usize, elapsed: Duration) {
        self.batches_completed.fetch_add(1, Ordering::Relaxed);
        self.jobs_processed.fetch_add(jobs as u64, Ordering::Relaxed);
        self.jobs_faulted.fetch_add(faults as u64, Ordering::Relaxed);
        self.total_processing_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    fn record_discarded(&self, jobs: usize) {
        self.jobs_discarded.fetch_add(jobs as u64, Ordering::Relaxed);
    }

    /// Get total drains
    pub fn get_drains(&self) -> u64 {
        self.drains.load(Ordering::Relaxed)
    }

    /// Get total batches completed
    pub fn get_batches_completed(&self) -> u64 {
        self.batches_completed.load(Ordering::Relaxed)
    }

    /// Get total jobs processed
    pub fn get_jobs_processed(&self) -> u64 {
        self.jobs_processed.load(Ordering::Relaxed)
    }

    /// Get total jobs faulted
    pub fn get_jobs_faulted(&self) -> u64 {
        self.jobs_faulted.load(Ordering::Relaxed)
    }

    /// Get total jobs discarded
    pub fn get_jobs_discarded(&self) -> u64 {
        self.jobs_discarded.load(Ordering::Relaxed)
    }

    /// Get average processing time per job in microseconds
    pub fn get_average_processing_time_us(&self) -> f64 {
        let total = self.total_processing_time_us.load(Ordering::Relaxed);
        let count = self.jobs_processed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Take a plain copy of the counters
    pub fn snapshot(&self) -> WorkerStatSnapshot {
        WorkerStatSnapshot {
            drains: self.get_drains(),
            batches_completed: self.get_batches_completed(),
            jobs_processed: self.get_jobs_processed(),
            jobs_faulted: self.get_jobs_faulted(),
            jobs_discarded: self.get_jobs_discarded(),
            total_processing_time_us: self.total_processing_time_us.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`WorkerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatSnapshot {
    /// Number of queue drains
    pub drains: u64,
    /// Batches reported
    pub batches_completed: u64,
    /// Jobs computed
    pub jobs_processed: u64,
    /// Jobs that faulted
    pub jobs_faulted: u64,
    /// Jobs dropped during shutdown
    pub jobs_discarded: u64,
    /// Time spent computing (microseconds)
    pub total_processing_time_us: u64,
}

/// State shared between a worker thread and the dispatcher
#[derive(Debug)]
struct WorkerShared {
    queue: Mutex<WorkerQueue>,
    available: Condvar,
    state: AtomicU8,
}

impl WorkerShared {
    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// A worker thread that owns one queue and computes everything spliced onto it
#[derive(Debug)]
pub struct Worker {
    id: usize,
    shared: Arc<CachePadded<WorkerShared>>,
    stats: Arc<WorkerStats>,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Worker {
    /// Create and start a new worker
    ///
    /// # Arguments
    ///
    /// * `id` - Index of this worker in the pool
    /// * `thread_name` - Name given to the spawned OS thread
    ///
    /// # Shutdown Behavior
    ///
    /// Once stopped, the worker discards whatever is still queued, resolving
    /// each batch's channel as discarded, and exits.
    pub fn new(id: usize, thread_name: String) -> Result<Self> {
        let shared = Arc::new(CachePadded::new(WorkerShared {
            queue: Mutex::new(WorkerQueue::new()),
            available: Condvar::new(),
            state: AtomicU8::new(WorkerState::Idle as u8),
        }));
        let stats = Arc::new(WorkerStats::new());

        let shared_clone = Arc::clone(&shared);
        let stats_clone = Arc::clone(&stats);
        let thread = thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                Self::run(id, &shared_clone, &stats_clone);
            })
            .map_err(|e| PoolError::init_with_source(id, "failed to spawn worker thread", e))?;

        Ok(Self {
            id,
            shared,
            stats,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Get worker index
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Current position in the worker loop
    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Number of jobs waiting in this worker's queue
    pub fn queued_jobs(&self) -> usize {
        self.shared.queue.lock().job_count()
    }

    /// Splice a batch onto the tail of the queue and wake the worker if it was idle.
    ///
    /// Returns the queue depth in jobs after the splice.
    pub(crate) fn enqueue(&self, batch: PendingBatch) -> QueueResult<usize> {
        let mut queue = self.shared.queue.lock();
        if queue.splice(batch)? {
            self.shared.available.notify_one();
        }
        Ok(queue.job_count())
    }

    /// Close the queue and wake the worker so it can exit.
    pub(crate) fn signal_stop(&self) {
        let mut queue = self.shared.queue.lock();
        queue.close();
        self.shared.available.notify_one();
    }

    /// Join the worker thread. Joining twice is a no-op.
    pub(crate) fn join(&self) -> Result<()> {
        let thread = self.thread.lock().take();
        if let Some(thread) = thread {
            thread
                .join()
                .map_err(|_| PoolError::join(self.id, "Worker panicked"))?;
        }
        Ok(())
    }

    /// Discard anything left in the queue after the thread is gone.
    ///
    /// Returns the number of jobs discarded.
    pub(crate) fn discard_remaining(&self) -> usize {
        let drained = self.shared.queue.lock().drain();
        let jobs = drained.job_count;
        Self::discard(self.id, drained, &self.stats);
        jobs
    }

    /// Main worker loop: Idle -> Draining -> Computing -> Reporting -> Idle.
    fn run(id: usize, shared: &WorkerShared, stats: &WorkerStats) {
        #[cfg(feature = "tracing")]
        let worker_span = span!(Level::DEBUG, "worker", id = id);
        #[cfg(feature = "tracing")]
        let _guard = worker_span.enter();

        #[cfg(feature = "tracing")]
        debug!("worker started");
        log::trace!("Worker {}: started", id);

        loop {
            let (drained, stopping) = {
                let mut queue = shared.queue.lock();
                shared.set_state(WorkerState::Idle);
                while queue.is_empty() && !queue.is_closed() {
                    shared.available.wait(&mut queue);
                }
                shared.set_state(WorkerState::Draining);
                (queue.drain(), queue.is_closed())
            };

            if stopping {
                Self::discard(id, drained, stats);
                break;
            }

            stats.record_drain();
            #[cfg(feature = "tracing")]
            crate::tracing::metrics::record_drain(id, drained.batches.len(), drained.job_count);

            Self::process(id, drained, shared, stats);
        }

        shared.set_state(WorkerState::Stopped);

        #[cfg(feature = "tracing")]
        debug!(
            jobs_processed = stats.get_jobs_processed(),
            jobs_discarded = stats.get_jobs_discarded(),
            "worker shutting down"
        );
        log::trace!("Worker {}: stopped", id);
    }

    /// Compute every drained batch, then report each one to its producer.
    fn process(id: usize, drained: Drained, shared: &WorkerShared, stats: &WorkerStats) {
        shared.set_state(WorkerState::Computing);

        let mut computed = Vec::with_capacity(drained.batches.len());
        for batch in drained.batches {
            let start = Instant::now();
            let results: Vec<JobResult> = batch
                .jobs
                .iter()
                .map(|job| {
                    let result = JobResult::compute(*job);
                    match result.outcome {
                        Ok(value) => log::debug!("Worker {}: {} = {}", id, job, value),
                        Err(fault) => log::warn!("Worker {}: {} faulted: {}", id, job, fault),
                    }
                    result
                })
                .collect();
            computed.push((batch.channel, results, start.elapsed()));
        }

        shared.set_state(WorkerState::Reporting);

        for (channel, results, elapsed) in computed {
            let jobs = results.len();
            let faults = results.iter().filter(|r| r.is_fault()).count();
            stats.record_batch(jobs, faults, elapsed);

            #[cfg(feature = "tracing")]
            crate::tracing::metrics::record_batch_complete(elapsed, jobs, faults);

            let batch_id = channel.batch_id();
            let delivered = channel.fulfill(BatchResults {
                batch_id,
                worker: id,
                results,
                completed_at: chrono::Utc::now(),
            });
            if !delivered {
                log::debug!(
                    "Worker {}: results of batch {} dropped, producer stopped waiting",
                    id,
                    batch_id
                );
            }
        }
    }

    fn discard(id: usize, drained: Drained, stats: &WorkerStats) {
        if drained.is_empty() {
            return;
        }
        for batch in drained.batches {
            log::warn!(
                "Worker {}: discarding batch {} ({} jobs) during shutdown",
                id,
                batch.id(),
                batch.len()
            );
            #[cfg(feature = "tracing")]
            crate::tracing::metrics::record_discard(id, batch.len());
            batch.channel.discard();
        }
        stats.record_discarded(drained.job_count);
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.get_mut().take() {
            self.signal_stop();

            // Use a timeout to prevent Drop from hanging indefinitely
            const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

            let start = Instant::now();
            loop {
                if thread.is_finished() {
                    if thread.join().is_err() {
                        log::error!("Worker {} panicked during shutdown", self.id);
                    }
                    break;
                }

                if start.elapsed() >= JOIN_TIMEOUT {
                    log::warn!(
                        "Worker {} did not finish within {}s timeout during drop. \
                         Thread may be leaked.",
                        self.id,
                        JOIN_TIMEOUT.as_secs()
                    );
                    break;
                }

                // Small sleep to avoid busy-waiting
                thread::sleep(Duration::from_millis(10));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BatchId, Job, JobFault, ResultChannel};

    fn pending(jobs: Vec<Job>) -> (PendingBatch, Arc<ResultChannel>) {
        let channel = ResultChannel::new(BatchId::new_v4());
        (PendingBatch::new(jobs, Arc::clone(&channel)), channel)
    }

    fn wait_for_state(worker: &Worker, state: WorkerState) {
        let start = Instant::now();
        while worker.state() != state {
            assert!(
                start.elapsed() < Duration::from_secs(5),
                "worker never reached {:?}",
                state
            );
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_worker_creation() {
        let worker = Worker::new(0, "test-worker-0".to_string()).expect("Failed to create worker");
        assert_eq!(worker.id(), 0);
        wait_for_state(&worker, WorkerState::Idle);

        worker.signal_stop();
        worker.join().expect("Failed to join worker");
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[test]
    fn test_worker_computes_batch_in_order() {
        let worker = Worker::new(1, "test-worker-1".to_string()).expect("Failed to create worker");
        let stats = worker.stats();

        let jobs = vec![Job::add(2, 3), Job::div(10, 0), Job::mul(6, 7)];
        let (batch, channel) = pending(jobs.clone());
        worker.enqueue(batch).expect("Failed to enqueue");

        let handle = crate::core::BatchHandle::new(1, jobs.len(), channel);
        let results = handle.wait().expect("results should arrive");

        assert_eq!(results.worker, 1);
        let returned: Vec<Job> = results.iter().map(|r| r.job).collect();
        assert_eq!(returned, jobs);
        assert_eq!(
            results.values(),
            vec![Ok(5), Err(JobFault::DivisionByZero), Ok(42)]
        );

        worker.signal_stop();
        worker.join().expect("Failed to join worker");

        assert_eq!(stats.get_jobs_processed(), 3);
        assert_eq!(stats.get_jobs_faulted(), 1);
        assert_eq!(stats.get_batches_completed(), 1);
    }

    #[test]
    fn test_stopped_worker_discards_queued_batches() {
        let worker = Worker::new(0, "test-worker-discard".to_string()).expect("Failed to create worker");
        let stats = worker.stats();
        wait_for_state(&worker, WorkerState::Idle);

        let (batch, channel) = pending(vec![Job::add(1, 1), Job::add(2, 2)]);
        {
            // Queue and stop in one critical section so the worker sees both at once
            let mut queue = worker.shared.queue.lock();
            queue.splice(batch).expect("open queue");
            queue.close();
            worker.shared.available.notify_one();
        }

        worker.join().expect("Failed to join worker");

        let handle = crate::core::BatchHandle::new(0, 2, channel);
        assert!(matches!(handle.wait(), Err(PoolError::Discarded { .. })));
        assert_eq!(stats.get_jobs_discarded(), 2);
        assert_eq!(stats.get_jobs_processed(), 0);
    }

    #[test]
    fn test_enqueue_after_stop_is_rejected() {
        let worker = Worker::new(0, "test-worker-closed".to_string()).expect("Failed to create worker");
        worker.signal_stop();
        worker.join().expect("Failed to join worker");

        let (batch, _channel) = pending(vec![Job::sub(4, 1)]);
        assert!(worker.enqueue(batch).is_err());
        assert_eq!(worker.discard_remaining(), 0);
    }

    #[test]
    fn test_join_twice_is_noop() {
        let worker = Worker::new(0, "test-worker-join".to_string()).expect("Failed to create worker");
        worker.signal_stop();
        worker.join().expect("first join");
        worker.join().expect("second join");
    }
}
