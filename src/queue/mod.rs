//! Per-worker FIFO of submitted batches.
//!
//! A [`WorkerQueue`] is never shared on its own: it lives inside a worker's
//! mutex, and every method assumes the caller holds that lock. Producers
//! [`splice`](WorkerQueue::splice) whole batches onto the tail; the owning
//! worker [`drain`](WorkerQueue::drain)s everything in one step.

use crate::core::{BatchId, Job, ResultChannel};
use std::collections::VecDeque;
use std::sync::Arc;

/// A batch on its way through a worker queue, still bound to its result channel
#[derive(Debug)]
pub(crate) struct PendingBatch {
    pub(crate) jobs: Vec<Job>,
    pub(crate) channel: Arc<ResultChannel>,
}

impl PendingBatch {
    pub(crate) fn new(jobs: Vec<Job>, channel: Arc<ResultChannel>) -> Self {
        Self { jobs, channel }
    }

    pub(crate) fn id(&self) -> BatchId {
        self.channel.batch_id()
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }
}

/// Errors returned by queue operations
#[derive(Debug)]
pub(crate) enum QueueError {
    /// Queue is closed; the rejected batch is handed back
    Closed(PendingBatch),
}

/// Result type for queue operations
pub(crate) type QueueResult<T> = std::result::Result<T, QueueError>;

/// Everything a worker took from its queue in one drain
#[derive(Debug, Default)]
pub(crate) struct Drained {
    pub(crate) batches: VecDeque<PendingBatch>,
    pub(crate) job_count: usize,
}

impl Drained {
    pub(crate) fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// FIFO of pending batches with a running job count.
///
/// Invariant: `job_count == 0` exactly when no batches are queued.
#[derive(Debug, Default)]
pub(crate) struct WorkerQueue {
    batches: VecDeque<PendingBatch>,
    job_count: usize,
    closed: bool,
}

impl WorkerQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a whole batch after the current tail.
    ///
    /// Returns whether the queue went from empty to non-empty, which is when the
    /// owning worker needs a wake-up.
    pub(crate) fn splice(&mut self, batch: PendingBatch) -> QueueResult<bool> {
        if self.closed {
            return Err(QueueError::Closed(batch));
        }
        let was_empty = self.batches.is_empty();
        self.job_count += batch.len();
        self.batches.push_back(batch);
        Ok(was_empty)
    }

    /// Detach the entire contents, leaving the queue empty.
    ///
    /// # Panics
    ///
    /// Panics if the job count disagrees with the queued batches. That only
    /// happens if the queue was mutated without its lock.
    pub(crate) fn drain(&mut self) -> Drained {
        self.check_invariant();
        Drained {
            batches: std::mem::take(&mut self.batches),
            job_count: std::mem::replace(&mut self.job_count, 0),
        }
    }

    /// Stop accepting batches. Already queued batches stay until drained.
    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub(crate) fn job_count(&self) -> usize {
        self.job_count
    }

    fn check_invariant(&self) {
        assert_eq!(
            self.job_count == 0,
            self.batches.is_empty(),
            "worker queue corrupted: job_count={} with {} queued batches",
            self.job_count,
            self.batches.len()
        );
        // Linear in queued batches, which the drain hands to the worker anyway
        let queued: usize = self.batches.iter().map(PendingBatch::len).sum();
        assert_eq!(
            self.job_count, queued,
            "worker queue corrupted: job_count disagrees with queued jobs"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(jobs: Vec<Job>) -> PendingBatch {
        PendingBatch::new(jobs, ResultChannel::new(BatchId::new_v4()))
    }

    #[test]
    fn test_splice_reports_empty_transition() {
        let mut queue = WorkerQueue::new();
        assert!(queue.is_empty());

        assert!(queue.splice(pending(vec![Job::add(1, 2)])).expect("open queue"));
        assert!(!queue
            .splice(pending(vec![Job::sub(3, 4), Job::mul(5, 6)]))
            .expect("open queue"));

        assert_eq!(queue.job_count(), 3);
        assert_eq!(queue.drain().batches.len(), 2);
    }

    #[test]
    fn test_drain_takes_everything_in_order() {
        let mut queue = WorkerQueue::new();
        let first = pending(vec![Job::add(1, 1)]);
        let second = pending(vec![Job::add(2, 2), Job::add(3, 3)]);
        let (first_id, second_id) = (first.id(), second.id());

        queue.splice(first).expect("open queue");
        queue.splice(second).expect("open queue");

        let drained = queue.drain();
        assert_eq!(drained.job_count, 3);
        let ids: Vec<_> = drained.batches.iter().map(PendingBatch::id).collect();
        assert_eq!(ids, vec![first_id, second_id]);

        assert!(queue.is_empty());
        assert_eq!(queue.job_count(), 0);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_closed_queue_hands_batch_back() {
        let mut queue = WorkerQueue::new();
        queue.close();
        assert!(queue.is_closed());

        let batch = pending(vec![Job::div(1, 0)]);
        let id = batch.id();
        match queue.splice(batch) {
            Err(QueueError::Closed(returned)) => assert_eq!(returned.id(), id),
            other => panic!("expected Closed, got {:?}", other),
        }
        assert_eq!(queue.job_count(), 0);
    }

    #[test]
    #[should_panic(expected = "worker queue corrupted")]
    fn test_corrupted_count_is_fatal() {
        let mut queue = WorkerQueue::new();
        queue.job_count = 4;
        queue.drain();
    }

    #[test]
    #[should_panic(expected = "job_count disagrees with queued jobs")]
    fn test_miscounted_jobs_are_fatal() {
        let mut queue = WorkerQueue::new();
        queue
            .splice(pending(vec![Job::add(1, 2), Job::add(3, 4)]))
            .expect("open queue");
        queue.job_count = 5;
        queue.drain();
    }
}
