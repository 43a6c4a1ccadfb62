//! Tracing integration for observability.
//!
//! When the `tracing` feature is enabled, workers run inside a `worker` span and
//! the pool emits the structured events in [`metrics`]. Without the feature the
//! pool only logs through the `log` facade.
//!
//! # Example
//!
//! ```rust,ignore
//! use batch_pool::prelude::*;
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env()
//!         .add_directive("batch_pool=trace".parse().unwrap()))
//!     .init();
//!
//! let pool = BatchPool::new(4)?;
//! pool.execute(Batch::new().with_job(Job::add(2, 3)))?;
//! ```

/// Metrics recording functions for observability.
///
/// These functions emit tracing events that can be consumed by
/// metrics collection systems like Prometheus via tracing-opentelemetry.
#[cfg(feature = "tracing")]
pub mod metrics {
    use std::time::Duration;

    /// Records a batch being spliced onto a worker queue.
    #[inline]
    pub fn record_submission(worker_id: usize, batch_len: usize, queue_depth: usize) {
        ::tracing::trace!(
            counter.batches_submitted = 1,
            counter.jobs_submitted = batch_len as u64,
            gauge.queue_depth = queue_depth as i64,
            worker_id = worker_id,
            "batch submitted"
        );
    }

    /// Records a worker detaching its queue.
    #[inline]
    pub fn record_drain(worker_id: usize, batches: usize, jobs: usize) {
        ::tracing::trace!(
            counter.drains = 1,
            histogram.drained_jobs = jobs as u64,
            worker_id = worker_id,
            batches = batches,
            "queue drained"
        );
    }

    /// Records a batch whose results were handed to its producer.
    #[inline]
    pub fn record_batch_complete(duration: Duration, jobs: usize, faults: usize) {
        ::tracing::trace!(
            counter.batches_completed = 1,
            counter.jobs_completed = jobs as u64,
            counter.jobs_faulted = faults as u64,
            histogram.batch_duration_us = duration.as_micros() as u64,
            "batch completed"
        );
    }

    /// Records a batch dropped during shutdown.
    #[inline]
    pub fn record_discard(worker_id: usize, jobs: usize) {
        ::tracing::trace!(
            counter.jobs_discarded = jobs as u64,
            worker_id = worker_id,
            "batch discarded"
        );
    }

    /// Records pool startup.
    #[inline]
    pub fn record_pool_start(num_workers: usize) {
        ::tracing::info!(workers = num_workers, "batch pool started");
    }

    /// Records pool shutdown.
    #[inline]
    pub fn record_pool_shutdown(jobs_processed: u64, jobs_discarded: u64) {
        ::tracing::info!(
            jobs_processed = jobs_processed,
            jobs_discarded = jobs_discarded,
            "batch pool shutdown complete"
        );
    }
}
