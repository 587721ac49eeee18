#![deny(missing_docs)]

//! Fixed-size thread pools with interchangeable scheduling strategies.
//!
//! Two strategies implement the [`ThreadPool`] trait: a
//! [`SimpleThreadPool`] whose workers share one FIFO queue, and a
//! [`ProactiveThreadPool`] that hands jobs directly to idle workers and
//! falls back to an overflow queue when all of them are busy. Both accept
//! jobs submitted from inside running jobs, drain accepted jobs on
//! shutdown, and survive panicking jobs.

mod config;
mod error;
/// Benchmark scenarios exercising the pools.
pub mod scenarios;
/// Thread pool implementations.
pub mod thread_pool;

pub use config::PoolConfig;
pub use error::{PoolError, Result};
pub use thread_pool::{
    PoolStats, ProactiveThreadPool, SimpleThreadPool, Strategy, TaskHandle, ThreadPool,
};
