//! Fixed-size pool of OS threads for blocking browser work
//!
//! Jobs are boxed closures sent over a crossbeam channel; each worker thread
//! pulls the next job as soon as it is free. The pool size is independent of
//! the concurrency gate: the gate bounds how many jobs are submitted, the pool
//! bounds how many run at once.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, unbounded};
use log::{debug, error, warn};
use tokio::sync::oneshot;

use super::async_wrappers::{JobHandle, WorkerError};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    threads: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` worker threads (at least one)
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to create a thread.
    pub fn new(size: usize) -> std::io::Result<Self> {
        let size = size.max(1);
        let (sender, receiver) = unbounded::<Job>();

        let mut threads = Vec::with_capacity(size);
        for idx in 0..size {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("harvest-worker-{idx}"))
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        job();
                    }
                    debug!(target: "listing_harvest::runtime", "Worker {idx} exiting");
                })?;
            threads.push(handle);
        }

        debug!(target: "listing_harvest::runtime", "Started worker pool with {size} threads");
        Ok(Self {
            sender: Some(sender),
            threads,
        })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.threads.len()
    }

    /// Run `f` on the next free worker and return an awaitable handle to its result
    ///
    /// A panic inside `f` is caught and reported as [`WorkerError::Panicked`].
    pub fn spawn<F, T>(&self, f: F) -> JobHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            let result = catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
                let message = panic_message(payload.as_ref());
                error!(target: "listing_harvest::runtime", "Worker job panicked: {message}");
                WorkerError::Panicked(message)
            });
            // Receiver gone means nobody is waiting for the result
            let _ = tx.send(result);
        });

        match &self.sender {
            Some(sender) => {
                if sender.send(job).is_err() {
                    warn!(target: "listing_harvest::runtime", "Worker pool channel closed; job dropped");
                }
            }
            None => warn!(target: "listing_harvest::runtime", "Worker pool shut down; job dropped"),
        }

        JobHandle::new(rx)
    }

    /// Stop accepting jobs and wait for queued jobs to finish
    pub fn join(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.sender.take();
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                warn!(target: "listing_harvest::runtime", "Worker thread exited by panic");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Detach rather than join: dropping may happen on the async scheduler thread.
        self.sender.take();
        self.threads.clear();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_returns_job_result() {
        let pool = WorkerPool::new(2).unwrap();
        let value = pool.spawn(|| 21 * 2).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn panic_is_reported_not_propagated() {
        let pool = WorkerPool::new(1).unwrap();
        let result = pool.spawn(|| -> u32 { panic!("kaboom") }).await;
        assert_eq!(result, Err(WorkerError::Panicked("kaboom".to_string())));

        // Worker thread survives the panic
        assert_eq!(pool.spawn(|| 7).await, Ok(7));
    }

    #[test]
    fn size_is_at_least_one() {
        let pool = WorkerPool::new(0).unwrap();
        assert_eq!(pool.size(), 1);
        pool.join();
    }
}
