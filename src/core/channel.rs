//! One-shot result hand-off between a worker and the producer of a batch
//!
//! Every submitted batch gets its own [`ResultChannel`]. The worker that computes
//! the batch writes the results exactly once; the producer blocks on the matching
//! [`BatchHandle`] until they arrive.
//!
//! # Example
//!
//! ```rust
//! use batch_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pool = BatchPool::new(2)?;
//!
//! let handle = pool.submit(Batch::new().with_job(Job::add(2, 3)))?;
//! let results = handle.wait()?;
//! assert_eq!(results.values(), vec![Ok(5)]);
//!
//! pool.shutdown()?;
//! # Ok(())
//! # }
//! ```

use crate::core::{BatchId, BatchResults, PoolError, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

enum ChannelState {
    /// Waiting for the worker
    Pending,
    /// Results delivered, not yet taken
    Ready(BatchResults),
    /// Worker dropped the batch during shutdown
    Discarded,
    /// Producer gave up waiting
    Abandoned,
    /// Producer consumed the results
    Taken,
}

impl ChannelState {
    fn name(&self) -> &'static str {
        match self {
            ChannelState::Pending => "pending",
            ChannelState::Ready(_) => "ready",
            ChannelState::Discarded => "discarded",
            ChannelState::Abandoned => "abandoned",
            ChannelState::Taken => "taken",
        }
    }
}

/// Rendezvous point pairing one worker and one producer for one batch
pub(crate) struct ResultChannel {
    batch_id: BatchId,
    state: Mutex<ChannelState>,
    ready: Condvar,
}

impl std::fmt::Debug for ResultChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultChannel")
            .field("batch_id", &self.batch_id)
            .field("state", &self.state.lock().name())
            .finish()
    }
}

impl ResultChannel {
    pub(crate) fn new(batch_id: BatchId) -> Arc<Self> {
        Arc::new(Self {
            batch_id,
            state: Mutex::new(ChannelState::Pending),
            ready: Condvar::new(),
        })
    }

    pub(crate) fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    /// Deliver results. Returns false if the producer already abandoned the batch
    /// or the channel was resolved before.
    pub(crate) fn fulfill(&self, results: BatchResults) -> bool {
        let mut state = self.state.lock();
        if !matches!(*state, ChannelState::Pending) {
            return false;
        }
        *state = ChannelState::Ready(results);
        self.ready.notify_one();
        true
    }

    /// Resolve the channel without results so the producer stops waiting.
    pub(crate) fn discard(&self) -> bool {
        let mut state = self.state.lock();
        if !matches!(*state, ChannelState::Pending) {
            return false;
        }
        *state = ChannelState::Discarded;
        self.ready.notify_one();
        true
    }

    fn is_resolved(&self) -> bool {
        !matches!(*self.state.lock(), ChannelState::Pending)
    }

    fn wait(&self) -> Result<BatchResults> {
        let mut state = self.state.lock();
        while matches!(*state, ChannelState::Pending) {
            self.ready.wait(&mut state);
        }
        self.take(&mut state)
    }

    fn wait_until(&self, deadline: Instant, timeout: Duration) -> Result<BatchResults> {
        let mut state = self.state.lock();
        while matches!(*state, ChannelState::Pending) {
            if self.ready.wait_until(&mut state, deadline).timed_out()
                && matches!(*state, ChannelState::Pending)
            {
                *state = ChannelState::Abandoned;
                return Err(PoolError::wait_timeout(
                    self.batch_id,
                    timeout.as_millis() as u64,
                ));
            }
        }
        self.take(&mut state)
    }

    fn take(&self, state: &mut ChannelState) -> Result<BatchResults> {
        match std::mem::replace(state, ChannelState::Taken) {
            ChannelState::Ready(results) => Ok(results),
            ChannelState::Discarded => {
                *state = ChannelState::Discarded;
                Err(PoolError::discarded(self.batch_id))
            }
            other => {
                let name = other.name();
                *state = other;
                Err(PoolError::invalid_state(format!(
                    "results of batch {} are {}",
                    self.batch_id, name
                )))
            }
        }
    }
}

/// Handle returned by [`BatchPool::submit`](crate::BatchPool::submit)
///
/// Consuming the handle with [`wait`](Self::wait) blocks until the assigned
/// worker reports the batch's results.
#[derive(Debug)]
pub struct BatchHandle {
    worker: usize,
    len: usize,
    channel: Arc<ResultChannel>,
}

impl BatchHandle {
    pub(crate) fn new(worker: usize, len: usize, channel: Arc<ResultChannel>) -> Self {
        Self {
            worker,
            len,
            channel,
        }
    }

    /// ID assigned to the batch at submission
    pub fn id(&self) -> BatchId {
        self.channel.batch_id()
    }

    /// Index of the worker the batch was dispatched to
    pub fn worker(&self) -> usize {
        self.worker
    }

    /// Number of jobs in the batch
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the batch had no jobs (never true for a submitted batch)
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the worker has resolved the batch, with results or by discarding it
    pub fn is_complete(&self) -> bool {
        self.channel.is_resolved()
    }

    /// Block until the batch's results are ready.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Discarded`] if the pool shut down before the batch
    /// was computed.
    pub fn wait(self) -> Result<BatchResults> {
        self.channel.wait()
    }

    /// Block for at most `timeout` waiting for results.
    ///
    /// On timeout the batch is abandoned: the worker still computes it, but its
    /// results are dropped instead of delivered. A timeout too large to form a
    /// deadline waits without bound.
    ///
    /// # Errors
    ///
    /// - `PoolError::WaitTimeout` - The deadline passed first
    /// - `PoolError::Discarded` - The pool shut down before the batch was computed
    pub fn wait_timeout(self, timeout: Duration) -> Result<BatchResults> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.channel.wait_until(deadline, timeout),
            None => self.channel.wait(),
        }
    }
}
