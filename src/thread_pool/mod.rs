use std::any::Any;
use std::mem;
use std::panic::{self, AssertUnwindSafe};

use log::error;

use crate::Result;

/// A unit of work handed to a pool.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed-size pool of worker threads fed from one shared queue.
///
/// Workers start when the pool is created and keep pulling jobs until the
/// pool is shut down and the queue is empty. A panicking job is logged and
/// never takes its worker down.
pub trait ThreadPool {
    /// Creates a new thread pool and starts `threads` workers.
    ///
    /// # Errors
    ///
    /// Returns an error if `threads` is zero or a worker thread cannot be
    /// started. Workers started before the failure are shut down.
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized;

    /// Queues a job to be run by exactly one worker.
    ///
    /// Jobs from a single caller are dequeued in submission order.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Rejected`](crate::PoolError::Rejected) once the
    /// pool is shut down. The job is dropped without running.
    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static;

    /// Stops accepting jobs and wakes every worker.
    ///
    /// Jobs already queued still run. Does not wait for workers to exit;
    /// calling it again is a no-op.
    fn shutdown(&self);

    /// Stops accepting jobs and interrupts every worker.
    ///
    /// Queued jobs are removed and dropped without running. Idle workers exit
    /// at once; busy workers finish their current job and then exit. Returns
    /// how many queued jobs were skipped.
    fn shutdown_now(&self) -> usize;

    /// Returns `true` once the pool no longer accepts jobs.
    fn is_shutdown(&self) -> bool;

    /// Number of jobs waiting in the queue.
    fn pending(&self) -> usize;

    /// Shuts the pool down and blocks until every worker has exited.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread died abnormally.
    fn join(self) -> Result<()>
    where
        Self: Sized;
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Runs a job, catching and logging any panic so the worker survives it.
pub(crate) fn run_job(id: u32, job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        error!(
            "Worker {id} job panicked: {}, continuing",
            panic_message(payload.as_ref())
        );
        // The payload's own destructor may panic as well.
        if let Err(inner) = panic::catch_unwind(AssertUnwindSafe(move || drop(payload))) {
            error!("Worker {id} job panic payload panicked on drop");
            mem::forget(inner);
        }
    }
}

mod channel;
mod shared_queue;

pub use self::channel::ChannelThreadPool;
pub use self::shared_queue::SharedQueueThreadPool;

#[cfg(test)]
mod tests {
    use super::panic_message;

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload = std::panic::catch_unwind(|| panic!("task {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "task 7");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(42_u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
