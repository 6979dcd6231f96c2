use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, error};

use super::{run_job, Job, ThreadPool};
use crate::{PoolError, Result};

/// A thread pool using a shared job queue.
///
/// All workers pull from one `VecDeque` guarded by a single `Mutex`, which
/// also guards the accepting flag. Idle workers sleep on a `Condvar`; each
/// `spawn` wakes one of them and `shutdown` wakes them all.
pub struct SharedQueueThreadPool {
    shared: Arc<Shared>,
    workers: Vec<(u32, JoinHandle<()>)>,
}

/// State shared by the pool handle and its workers.
struct Shared {
    state: Mutex<State>,
    available: Condvar,
}

struct State {
    queue: VecDeque<Job>,
    accepting: bool,
}

impl Shared {
    fn new() -> Self {
        Shared {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                accepting: true,
            }),
            available: Condvar::new(),
        }
    }

    // Jobs never run under this lock, so a poisoned guard still holds a
    // consistent queue.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until a job is available, or returns `None` once the pool is
    /// shut down and the queue is empty.
    fn next_job(&self, id: u32) -> Option<Job> {
        let mut state = self.lock();
        loop {
            if let Some(job) = state.queue.pop_front() {
                return Some(job);
            }
            if !state.accepting {
                debug!("Worker {id}: queue drained, shutting down");
                return None;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl ThreadPool for SharedQueueThreadPool {
    fn new(threads: u32) -> Result<Self> {
        if threads == 0 {
            return Err(PoolError::InvalidThreadCount(threads));
        }

        // On a failed spawn the partial pool is dropped, which shuts down
        // the workers already started.
        let mut pool = SharedQueueThreadPool {
            shared: Arc::new(Shared::new()),
            workers: Vec::with_capacity(threads as usize),
        };
        for id in 0..threads {
            let handle = spawn_worker(id, Arc::clone(&pool.shared))?;
            pool.workers.push((id, handle));
        }

        Ok(pool)
    }

    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.lock();
        if !state.accepting {
            debug!("Rejecting job, pool is shut down");
            return Err(PoolError::Rejected);
        }
        state.queue.push_back(Box::new(job));
        drop(state);

        self.shared.available.notify_one();
        Ok(())
    }

    fn shutdown(&self) {
        let mut state = self.shared.lock();
        if !state.accepting {
            return;
        }
        state.accepting = false;
        let pending = state.queue.len();
        drop(state);

        debug!("Shutting down, {pending} queued jobs left to drain");
        self.shared.available.notify_all();
    }

    fn shutdown_now(&self) -> usize {
        let mut state = self.shared.lock();
        state.accepting = false;
        let skipped = std::mem::take(&mut state.queue);
        drop(state);

        // Skipped jobs are dropped after the lock is released.
        debug!("Shutting down now, skipping {} queued jobs", skipped.len());
        self.shared.available.notify_all();
        skipped.len()
    }

    fn is_shutdown(&self) -> bool {
        !self.shared.lock().accepting
    }

    fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    fn join(mut self) -> Result<()> {
        self.shutdown();

        let mut result = Ok(());
        for (id, handle) in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("Worker {id} exited abnormally");
                result = Err(PoolError::WorkerPanicked { id });
            }
        }
        result
    }
}

/// Spawns a single worker thread that runs jobs until the queue is drained
/// after shutdown.
fn spawn_worker(id: u32, shared: Arc<Shared>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("pool-worker-{id}"))
        .spawn(move || {
            debug!("Worker {id} started");
            while let Some(job) = shared.next_job(id) {
                run_job(id, job);
            }
        })
}

impl Drop for SharedQueueThreadPool {
    fn drop(&mut self) {
        // Wakes idle workers so they exit once the queue is drained
        self.shutdown();
    }
}
