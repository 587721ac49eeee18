use std::io;
use thiserror::Error;

/// Error type for thread pool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The pool was configured with a thread count it cannot run with.
    #[error("Invalid thread count {0}: a pool needs at least one worker")]
    InvalidThreadCount(u32),

    /// A task was submitted after shutdown had begun.
    #[error("Thread pool is shut down, submission rejected")]
    ShutDown,

    /// The OS refused to create a worker thread.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    /// IO error while writing a report.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The task behind a completion handle panicked.
    #[error("Task panicked: {0}")]
    TaskPanicked(String),

    /// The task behind a completion handle was dropped without running.
    #[error("Task was canceled before producing a result")]
    Canceled,

    /// Serialization error while writing a report.
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A benchmark scenario observed a result it did not expect.
    #[error("Scenario check failed: {0}")]
    ScenarioCheck(String),
}

/// Result type alias for thread pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
