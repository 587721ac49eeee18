use std::panic::{self, AssertUnwindSafe};

use crossbeam::channel::{self, Receiver};

use super::worker::panic_message;
use crate::{PoolError, Result};

/// A handle to the result of a task submitted with
/// [`ThreadPool::submit`](super::ThreadPool::submit).
///
/// Dropping the handle does not cancel the task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: Receiver<std::result::Result<T, String>>,
}

impl<T: Send + 'static> TaskHandle<T> {
    /// Wraps `f` into a fire-and-forget job that reports its outcome to the
    /// returned handle.
    ///
    /// A panic is reported to the handle first and then resumed, so the
    /// worker still logs and counts it.
    pub(crate) fn wrap<F>(f: F) -> (impl FnOnce() + Send + 'static, TaskHandle<T>)
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = channel::bounded(1);
        let job = move || match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => {
                let _ = tx.send(Ok(value));
            }
            Err(payload) => {
                let _ = tx.send(Err(panic_message(&*payload)));
                panic::resume_unwind(payload);
            }
        };
        (job, TaskHandle { rx })
    }
}

impl<T> TaskHandle<T> {
    /// Blocks until the task has run and returns its value.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::TaskPanicked`] if the task panicked, or
    /// [`PoolError::Canceled`] if it was dropped without running.
    pub fn join(self) -> Result<T> {
        match self.rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(msg)) => Err(PoolError::TaskPanicked(msg)),
            Err(_) => Err(PoolError::Canceled),
        }
    }

    /// Returns `true` once the task's result is ready to be joined.
    pub fn is_finished(&self) -> bool {
        !self.rx.is_empty()
    }
}
