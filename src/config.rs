use crate::{PoolError, Result};

const DEFAULT_THREAD_NAME: &str = "pool-worker";

/// Construction parameters shared by every thread pool strategy.
///
/// The thread count is fixed for the lifetime of a pool. Workers are
/// named `"{thread_name}-{index}"`.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    threads: u32,
    thread_name: String,
    stack_size: Option<usize>,
}

impl Default for PoolConfig {
    /// One worker per logical CPU.
    fn default() -> Self {
        PoolConfig::new(num_cpus::get() as u32)
    }
}

impl PoolConfig {
    /// Creates a configuration for a pool of `threads` workers.
    pub fn new(threads: u32) -> Self {
        PoolConfig {
            threads,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            stack_size: None,
        }
    }

    /// Sets the prefix used to name worker threads.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Sets the stack size of each worker thread, in bytes.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Number of workers the pool will spawn.
    pub fn threads(&self) -> u32 {
        self.threads
    }

    /// Checks that a pool can be built from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidThreadCount`] for a zero thread count.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(PoolError::InvalidThreadCount(self.threads));
        }
        Ok(())
    }

    pub(crate) fn worker_builder(&self, id: usize) -> std::thread::Builder {
        let builder = std::thread::Builder::new().name(format!("{}-{id}", self.thread_name));
        match self.stack_size {
            Some(size) => builder.stack_size(size),
            None => builder,
        }
    }
}
