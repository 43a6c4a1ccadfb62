//! Error types for the batch pool

use crate::core::BatchId;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur while creating, using or tearing down a pool
///
/// Per-job computation faults are not pool errors; they travel inside
/// [`BatchResults`](crate::core::BatchResults) as [`JobFault`](crate::core::JobFault) values.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PoolError {
    /// Failed to initialize a worker during pool creation
    #[error("Failed to initialize worker #{worker}: {message}")]
    Init {
        /// Index of the worker that failed to initialize
        worker: usize,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// The pool is in a state that does not allow the operation
    #[error("Invalid pool state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// A batch without jobs was submitted
    #[error("Cannot submit an empty batch")]
    EmptyBatch,

    /// A batch exceeds the configured maximum size
    #[error("Batch of {len} jobs exceeds the maximum of {max}")]
    BatchTooLarge {
        /// Number of jobs in the rejected batch
        len: usize,
        /// Configured maximum batch size
        max: usize,
    },

    /// Invalid configuration with parameter
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// The batch was discarded by a shutting down worker before it was computed
    #[error("Batch {batch_id} was discarded during pool shutdown")]
    Discarded {
        /// ID of the discarded batch
        batch_id: BatchId,
    },

    /// Waiting for batch results timed out; the batch is abandoned
    #[error("Timed out after {timeout_ms}ms waiting for batch {batch_id}")]
    WaitTimeout {
        /// ID of the abandoned batch
        batch_id: BatchId,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Failed to join a worker thread
    #[error("Failed to join worker thread #{worker}: {message}")]
    Join {
        /// Index of the worker
        worker: usize,
        /// Error message
        message: String,
    },
}

impl PoolError {
    /// Create an initialization error
    pub fn init(worker: usize, message: impl Into<String>) -> Self {
        PoolError::Init {
            worker,
            message: message.into(),
            source: None,
        }
    }

    /// Create an initialization error with source
    pub fn init_with_source(
        worker: usize,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        PoolError::Init {
            worker,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        PoolError::InvalidState {
            message: message.into(),
        }
    }

    /// Create a batch too large error
    pub fn batch_too_large(len: usize, max: usize) -> Self {
        PoolError::BatchTooLarge { len, max }
    }

    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        PoolError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a discarded batch error
    pub fn discarded(batch_id: BatchId) -> Self {
        PoolError::Discarded { batch_id }
    }

    /// Create a wait timeout error
    pub fn wait_timeout(batch_id: BatchId, timeout_ms: u64) -> Self {
        PoolError::WaitTimeout {
            batch_id,
            timeout_ms,
        }
    }

    /// Create a join error
    pub fn join(worker: usize, message: impl Into<String>) -> Self {
        PoolError::Join {
            worker,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_creation() {
        let err = PoolError::init(3, "spawn failed");
        assert!(matches!(err, PoolError::Init { worker: 3, .. }));

        let err = PoolError::batch_too_large(20, 10);
        assert!(matches!(err, PoolError::BatchTooLarge { len: 20, max: 10 }));

        let err = PoolError::invalid_state("pool is shut down");
        assert!(matches!(err, PoolError::InvalidState { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = PoolError::batch_too_large(20, 10);
        assert_eq!(err.to_string(), "Batch of 20 jobs exceeds the maximum of 10");

        let err = PoolError::invalid_config("max_batch_size", "must be greater than 0");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for 'max_batch_size': must be greater than 0"
        );

        let id = Uuid::nil();
        let err = PoolError::wait_timeout(id, 250);
        assert_eq!(
            err.to_string(),
            format!("Timed out after 250ms waiting for batch {}", id)
        );
    }

    #[test]
    fn test_init_error_with_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::WouldBlock, "no more threads");
        let err = PoolError::init_with_source(5, "Cannot spawn worker thread", io_err);

        assert!(matches!(err, PoolError::Init { .. }));
        assert!(err.to_string().contains("worker #5"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
