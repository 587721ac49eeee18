use std::fmt;

use clap::ValueEnum;
use serde::Serialize;

use crate::config::PoolConfig;
use crate::Result;

/// A fixed-size pool of worker threads executing submitted jobs.
///
/// Implementors differ only in how jobs travel from submitters to
/// workers. All of them guarantee that every accepted job runs exactly
/// once, that jobs accepted before [`shutdown`](ThreadPool::shutdown)
/// still run before it returns, and that a panicking job neither kills
/// its worker nor the pool.
///
/// Jobs may submit further jobs to the same pool; share the pool through
/// an `Arc` to do so.
pub trait ThreadPool: Send + Sync {
    /// Creates a new thread pool with the given number of threads.
    ///
    /// # Errors
    ///
    /// Returns an error if `threads` is zero or a worker cannot be spawned.
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized,
    {
        Self::with_config(PoolConfig::new(threads))
    }

    /// Creates a new thread pool from a full configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a worker cannot
    /// be spawned. Workers spawned before the failure are joined first.
    fn with_config(config: PoolConfig) -> Result<Self>
    where
        Self: Sized;

    /// Spawns a function into the thread pool without waiting for it.
    ///
    /// The function will be executed by exactly one of the threads in the
    /// pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ShutDown`](crate::PoolError::ShutDown) once
    /// shutdown has begun; the function is dropped unexecuted.
    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static;

    /// Submits a function and returns a handle to its result.
    ///
    /// # Errors
    ///
    /// Same as [`spawn`](ThreadPool::spawn).
    fn submit<F, T>(&self, job: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (job, handle) = TaskHandle::wrap(job);
        self.spawn(job)?;
        Ok(handle)
    }

    /// Stops accepting jobs, runs every job already accepted, and joins all
    /// workers.
    ///
    /// Calling it again is a no-op once every worker has been joined. A
    /// concurrent call waits for the first one to finish joining.
    ///
    /// Calling it from a job running on this pool is allowed: it joins the
    /// other workers and returns without waiting for its own. A later call
    /// from outside the pool, or dropping the pool, joins that last worker.
    fn shutdown(&self);

    /// Returns `true` once shutdown has begun.
    fn is_shutdown(&self) -> bool;

    /// Number of worker threads.
    fn threads(&self) -> usize;

    /// Snapshot of the pool's task counters.
    fn stats(&self) -> PoolStats;
}

/// The scheduling strategy of a pool, for choosing one at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// [`SimpleThreadPool`]: one shared FIFO queue.
    Simple,
    /// [`ProactiveThreadPool`]: direct handoff to idle workers.
    Proactive,
}

impl Strategy {
    /// Every available strategy.
    pub const ALL: [Strategy; 2] = [Strategy::Proactive, Strategy::Simple];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Simple => f.write_str("Simple"),
            Strategy::Proactive => f.write_str("Proactive"),
        }
    }
}

/// Point-in-time task counters of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Number of worker threads.
    pub threads: usize,
    /// Jobs accepted since construction.
    pub submitted: u64,
    /// Jobs that finished running, including panicked ones.
    pub completed: u64,
    /// Jobs that panicked.
    pub panicked: u64,
    /// Jobs accepted but not yet finished.
    pub outstanding: usize,
}

mod handle;
mod proactive;
mod simple;
mod worker;

pub use self::handle::TaskHandle;
pub use self::proactive::ProactiveThreadPool;
pub use self::simple::SimpleThreadPool;
