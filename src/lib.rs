//! # Batch Pool
//!
//! A fixed-size worker pool that spreads batches of small arithmetic jobs across
//! independent per-worker queues.
//!
//! ## Features
//!
//! - **Per-worker queues**: Each worker owns a mutex-protected FIFO and a condition
//!   variable; no queue is shared between workers
//! - **Round-robin dispatch**: Each batch goes to the next worker in rotation,
//!   independent of load or timing
//! - **Whole-queue drains**: A worker detaches everything queued in one critical section
//! - **One-shot result channels**: Producers block on a per-batch handle until the
//!   worker reports
//! - **Per-job faults**: Division by zero and overflow are reported per job; sibling
//!   jobs still complete
//! - **Graceful Shutdown**: Workers are stopped and joined; batches still queued are
//!   discarded and their producers told so
//!
//! ## Quick Start
//!
//! ```rust
//! use batch_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pool = BatchPool::new(4)?;
//!
//! let batch = Batch::new()
//!     .with_job(Job::add(2, 3))
//!     .with_job(Job::div(10, 0))
//!     .with_job(Job::mul(6, 7));
//!
//! let results = pool.submit(batch)?.wait()?;
//! assert_eq!(
//!     results.values(),
//!     vec![Ok(5), Err(JobFault::DivisionByZero), Ok(42)]
//! );
//!
//! pool.shutdown()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use batch_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let config = PoolConfig::new(8)
//!     .with_max_batch_size(10)
//!     .with_thread_name_prefix("calc");
//!
//! let pool = BatchPool::with_config(config)?;
//! # pool.shutdown()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Worker Statistics
//!
//! ```rust
//! use batch_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! # let pool = BatchPool::new(2)?;
//! # for i in 0..10 {
//! #     pool.execute(Batch::new().with_job(Job::add(i, 1)))?;
//! # }
//! let stats = pool.get_stats();
//! for (i, stat) in stats.iter().enumerate() {
//!     println!("Worker {}: {} jobs processed", i, stat.get_jobs_processed());
//! }
//!
//! println!("Total jobs: {}", pool.total_jobs_processed());
//! # pool.shutdown()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod pool;
pub mod prelude;
pub(crate) mod queue;
pub mod tracing;

pub use crate::core::{
    evaluate, Batch, BatchHandle, BatchId, BatchResults, Job, JobFault, JobResult, Operation,
    Outcome, PoolError, Result,
};
pub use crate::pool::{BatchPool, PoolConfig, WorkerStatSnapshot, WorkerState, WorkerStats};
