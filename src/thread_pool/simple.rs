use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use log::debug;

use super::worker::{execute, lock, Counters, Job, Workers};
use super::{PoolStats, ThreadPool};
use crate::config::PoolConfig;
use crate::{PoolError, Result};

/// A thread pool using a single shared job queue.
///
/// Workers pop jobs from one FIFO queue guarded by a mutex and sleep on a
/// condition variable while it is empty. Jobs start in submission order,
/// including jobs submitted from inside other jobs, which join the tail.
pub struct SimpleThreadPool {
    shared: Arc<Shared>,
    workers: Workers,
}

struct Shared {
    queue: Mutex<Queue>,
    /// Signalled when a job is queued or the pool starts stopping.
    available: Condvar,
    counters: Counters,
}

struct Queue {
    jobs: VecDeque<Job>,
    stopping: bool,
}

impl ThreadPool for SimpleThreadPool {
    fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                jobs: VecDeque::new(),
                stopping: false,
            }),
            available: Condvar::new(),
            counters: Counters::default(),
        });

        let bodies = (0..config.threads() as usize).map(|id| {
            let shared = Arc::clone(&shared);
            move || run_worker(id, &shared)
        });
        let workers = Workers::spawn(&config, bodies, || shared.begin_stop())?;

        Ok(SimpleThreadPool { shared, workers })
    }

    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = lock(&self.shared.queue);
        if queue.stopping {
            return Err(PoolError::ShutDown);
        }
        self.shared.counters.accepted();
        queue.jobs.push_back(Box::new(job));
        drop(queue);

        // One job needs one worker.
        self.shared.available.notify_one();
        Ok(())
    }

    fn shutdown(&self) {
        self.shared.begin_stop();
        self.workers.join_all();
    }

    fn is_shutdown(&self) -> bool {
        lock(&self.shared.queue).stopping
    }

    fn threads(&self) -> usize {
        self.workers.len()
    }

    fn stats(&self) -> PoolStats {
        self.shared.counters.snapshot(self.workers.len())
    }
}

impl Shared {
    fn begin_stop(&self) {
        let mut queue = lock(&self.queue);
        if !queue.stopping {
            queue.stopping = true;
            debug!("Shutting down, {} queued jobs left to drain", queue.jobs.len());
        }
        drop(queue);
        self.available.notify_all();
    }

    /// Blocks until a job is available, or returns `None` once the pool is
    /// stopping and the queue has been drained.
    fn next_job(&self) -> Option<Job> {
        let mut queue = lock(&self.queue);
        loop {
            if let Some(job) = queue.jobs.pop_front() {
                return Some(job);
            }
            if queue.stopping {
                return None;
            }
            queue = self
                .available
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

fn run_worker(id: usize, shared: &Shared) {
    debug!("Worker {id} started");
    while let Some(job) = shared.next_job() {
        execute(id, job, &shared.counters);
    }
    debug!("Worker {id}: queue drained, shutting down");
}

impl Drop for SimpleThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
