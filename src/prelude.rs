//! Convenient re-exports for common types and traits

pub use crate::core::{
    Batch, BatchHandle, BatchId, BatchResults, Job, JobFault, JobResult, Operation, PoolError,
    Result,
};
pub use crate::pool::{BatchPool, PoolConfig, WorkerState, WorkerStats};
