//! Bounded-concurrency executor for per-item conversion work.
//!
//! Concurrency is capped by a semaphore rather than thread count: the scarce
//! resource is CPU/IO for the external tools. Each job wraps exactly one
//! external-tool invocation and runs on the blocking pool.

use std::mem;
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use log::{debug, error};
use tokio::sync::Semaphore;
use tokio::task::spawn_blocking;
use tokio_util::sync::CancellationToken;

use anyhow::Result;

type Job = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

pub struct WorkerPool {
    max_concurrency: usize,
    cancel: CancellationToken,
    queue: Mutex<Vec<(String, Job)>>,
}

impl WorkerPool {
    pub fn new(max_concurrency: usize, cancel: CancellationToken) -> Self {
        WorkerPool {
            max_concurrency: max_concurrency.max(1),
            cancel,
            queue: Mutex::new(Vec::new()),
        }
    }

    /// Enqueue one unit of work; `label` identifies it in failure logs.
    pub fn submit<F>(&self, label: String, job: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.queue.lock().unwrap().push((label, Box::new(job)));
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Drain the queue with at most `max_concurrency` jobs active at once.
    ///
    /// Returning is the barrier: every submitted job has either completed or
    /// been dropped by cancellation. A failed job is logged and dropped; the
    /// missing artifact makes it eligible again on the next sweep.
    pub async fn run_all(&self) {
        let jobs = mem::take(&mut *self.queue.lock().unwrap());
        if jobs.is_empty() {
            return;
        }
        debug!("Dispatching {} jobs", jobs.len());

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut handles = Vec::with_capacity(jobs.len());

        for (label, job) in jobs {
            if self.cancel.is_cancelled() {
                debug!("Cancelled, dropping remaining jobs");
                break;
            }
            let semaphore = semaphore.clone();
            let cancel = self.cancel.clone();
            handles.push(tokio::spawn(async move {
                // Cancellation is observed while waiting for the guard; a job
                // that already holds it runs its tool invocation to completion.
                let _permit = tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Cancelled before start: {}", label);
                        return;
                    }
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return,
                    },
                };

                match spawn_blocking(job).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => error!("{} failed: {:#}", label, err),
                    Err(err) => error!("{} panicked: {}", label, err),
                }
            }));
        }

        join_all(handles).await;
    }
}
