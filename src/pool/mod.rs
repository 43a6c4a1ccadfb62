//! Batch pool and worker implementations

pub mod thread_pool;
pub mod worker;

pub use thread_pool::{BatchPool, PoolConfig};
pub use worker::{Worker, WorkerStatSnapshot, WorkerState, WorkerStats};
