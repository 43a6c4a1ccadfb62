//! Core types for the batch pool: jobs, batches, result channels and errors

pub mod batch;
pub mod channel;
pub mod error;
pub mod job;

pub use batch::{Batch, BatchId, BatchResults, JobResult};
pub use channel::BatchHandle;
pub(crate) use channel::ResultChannel;
pub use error::{PoolError, Result};
pub use job::{evaluate, Job, JobFault, Operation, Outcome};
