use std::io;
use thiserror::Error;

/// Error type for pool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// A pool needs at least one worker.
    #[error("Invalid thread count: {0}")]
    InvalidThreadCount(u32),

    /// The OS refused to start a worker thread.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),

    /// The pool was shut down; the task was dropped without running.
    #[error("Pool is shut down, task rejected")]
    Rejected,

    /// A worker thread exited abnormally.
    #[error("Worker {id} panicked")]
    WorkerPanicked {
        /// Index of the worker.
        id: u32,
    },
}

/// Result type alias for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
