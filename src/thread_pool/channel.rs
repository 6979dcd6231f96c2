use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, error};

use super::{run_job, Job, ThreadPool};
use crate::{PoolError, Result};

/// A thread pool built on an unbounded MPMC channel.
///
/// Workers pull jobs from a single `crossbeam` channel. Shutdown drops the
/// only sender, so workers drain what is left and exit once the channel
/// reports it is disconnected.
pub struct ChannelThreadPool {
    tx: Mutex<Option<Sender<Job>>>,
    rx: Receiver<Job>,
    workers: Vec<(u32, JoinHandle<()>)>,
}

impl ChannelThreadPool {
    fn sender(&self) -> MutexGuard<'_, Option<Sender<Job>>> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ThreadPool for ChannelThreadPool {
    fn new(threads: u32) -> Result<Self> {
        if threads == 0 {
            return Err(PoolError::InvalidThreadCount(threads));
        }

        let (tx, rx) = channel::unbounded::<Job>();
        // On a failed spawn the partial pool is dropped, which closes the
        // channel and lets the workers already started exit.
        let mut pool = ChannelThreadPool {
            tx: Mutex::new(Some(tx)),
            rx,
            workers: Vec::with_capacity(threads as usize),
        };
        for id in 0..threads {
            let handle = spawn_worker(id, pool.rx.clone())?;
            pool.workers.push((id, handle));
        }

        Ok(pool)
    }

    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        // Held across the send so a job cannot slip in after shutdown.
        let tx = self.sender();
        match tx.as_ref() {
            Some(tx) => tx.send(Box::new(job)).map_err(|_| PoolError::Rejected),
            None => {
                debug!("Rejecting job, pool is shut down");
                Err(PoolError::Rejected)
            }
        }
    }

    fn shutdown(&self) {
        if let Some(tx) = self.sender().take() {
            debug!("Shutting down, {} queued jobs left to drain", tx.len());
            drop(tx);
        }
    }

    fn shutdown_now(&self) -> usize {
        drop(self.sender().take());
        let skipped: Vec<Job> = self.rx.try_iter().collect();
        debug!("Shutting down now, skipping {} queued jobs", skipped.len());
        skipped.len()
    }

    fn is_shutdown(&self) -> bool {
        self.sender().is_none()
    }

    fn pending(&self) -> usize {
        self.rx.len()
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

/// Spawns a single worker thread that pulls jobs from the receiver until
/// the channel is closed and empty.
fn spawn_worker(id: u32, rx: Receiver<Job>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("pool-worker-{id}"))
        .spawn(move || {
            debug!("Worker {id} started");
            loop {
                match rx.recv() {
                    Ok(job) => run_job(id, job),
                    Err(_) => {
                        debug!("Worker {id}: channel closed, shutting down");
                        return;
                    }
                }
            }
        })
}

impl Drop for ChannelThreadPool {
    fn drop(&mut self) {
        // Dropping the sender closes the channel, causing workers to exit
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn zero_threads_is_rejected() {
        assert!(matches!(
            ChannelThreadPool::new(0),
            Err(PoolError::InvalidThreadCount(0))
        ));
    }

    #[test]
    fn repeated_shutdown_keeps_queued_jobs() {
        let pool = ChannelThreadPool::new(1).unwrap();
        let (started_tx, started_rx) = channel::bounded(1);
        let (release_tx, release_rx) = channel::bounded::<()>(1);
        pool.spawn(move || {
            started_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        })
        .unwrap();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let (done_tx, done_rx) = channel::unbounded();
        pool.spawn(move || done_tx.send(()).unwrap()).unwrap();
        pool.shutdown();
        pool.shutdown();

        assert!(pool.is_shutdown());
        assert_eq!(pool.pending(), 1);
        assert!(matches!(pool.spawn(|| {}), Err(PoolError::Rejected)));

        release_tx.send(()).unwrap();
        pool.join().unwrap();
        assert!(done_rx.try_recv().is_ok());
    }
}
