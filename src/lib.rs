#![deny(missing_docs)]

//! A fixed-size worker pool.
//!
//! A bounded set of persistent worker threads consumes jobs from one shared,
//! unbounded FIFO queue. Panicking jobs are caught and logged so the pool
//! keeps its full set of workers. Shutdown stops new submissions and lets the
//! workers drain whatever is already queued.

mod error;
/// Thread pool implementations sharing a single job queue.
pub mod thread_pool;

pub use error::{PoolError, Result};
pub use thread_pool::{ChannelThreadPool, SharedQueueThreadPool, ThreadPool};
