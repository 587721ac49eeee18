use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use log::{debug, error, warn};

use super::PoolStats;
use crate::config::PoolConfig;
use crate::{PoolError, Result};

/// A unit of work as stored by a dispatcher.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Locks `mutex`, ignoring poisoning.
///
/// Jobs never run while a dispatch lock is held, so a poisoned lock can
/// only come from a panic in the pool itself, after which the guarded
/// state is still consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Task accounting shared between submitters and workers.
#[derive(Default)]
pub(crate) struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
    outstanding: AtomicUsize,
}

impl Counters {
    /// Records an accepted task. Must be called before the task becomes
    /// visible to workers so `outstanding` cannot underflow.
    pub(crate) fn accepted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.outstanding.fetch_add(1, Ordering::AcqRel);
    }

    fn finished(&self, panicked: bool) {
        if panicked {
            self.panicked.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn snapshot(&self, threads: usize) -> PoolStats {
        PoolStats {
            threads,
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            outstanding: self.outstanding.load(Ordering::Acquire),
        }
    }
}

/// Runs one job on worker `id`, catching panics so the worker survives.
pub(crate) fn execute(id: usize, job: Job, counters: &Counters) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(job));
    if let Err(payload) = &outcome {
        error!(
            "Worker {id} job panicked: {}, continuing",
            panic_message(&**payload)
        );
    }
    counters.finished(outcome.is_err());
}

/// Fixed-index arena of worker threads owned by a pool.
///
/// A handle leaves the arena only to be joined, so every worker is joined
/// at most once.
pub(crate) struct Workers {
    arena: Mutex<Arena>,
    /// Signalled when an in-progress `join_all` finishes.
    joined: Condvar,
    ids: Vec<ThreadId>,
}

struct Arena {
    handles: Vec<Option<JoinHandle<()>>>,
    joining: bool,
}

impl Workers {
    /// Spawns one named worker per body; body `i` runs on worker `i`.
    ///
    /// If a spawn fails, `abort` is invoked so the already running workers
    /// can exit, they are joined, and the spawn error is returned.
    pub(crate) fn spawn<I, W, A>(config: &PoolConfig, bodies: I, abort: A) -> Result<Workers>
    where
        I: IntoIterator<Item = W>,
        W: FnOnce() + Send + 'static,
        A: FnOnce(),
    {
        let mut handles = Vec::with_capacity(config.threads() as usize);
        for (id, body) in bodies.into_iter().enumerate() {
            match config.worker_builder(id).spawn(body) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    error!("Failed to spawn worker {id}: {e}");
                    abort();
                    Workers::from_handles(handles).join_all();
                    return Err(PoolError::Spawn(e));
                }
            }
        }
        Ok(Workers::from_handles(handles))
    }

    fn from_handles(handles: Vec<JoinHandle<()>>) -> Workers {
        Workers {
            ids: handles.iter().map(|h| h.thread().id()).collect(),
            arena: Mutex::new(Arena {
                handles: handles.into_iter().map(Some).collect(),
                joining: false,
            }),
            joined: Condvar::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    /// Joins every worker that has not been joined yet.
    ///
    /// A caller outside the pool waits for any concurrent `join_all` to
    /// finish first, so it returns only once every worker has terminated.
    ///
    /// A worker cannot join itself. Called from one of the pool's own
    /// workers, this joins the other workers, leaves the caller's handle in
    /// the arena for a later call, and never waits on another `join_all`.
    pub(crate) fn join_all(&self) {
        let current = thread::current().id();
        let own = self.ids.iter().position(|id| *id == current);

        let mut arena = lock(&self.arena);
        if arena.joining {
            if own.is_some() {
                return;
            }
            while arena.joining {
                arena = self
                    .joined
                    .wait(arena)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        arena.joining = true;
        let pending: Vec<_> = arena
            .handles
            .iter_mut()
            .enumerate()
            .filter(|(id, _)| Some(*id) != own)
            .filter_map(|(id, handle)| handle.take().map(|handle| (id, handle)))
            .collect();
        drop(arena);

        if let Some(id) = own {
            warn!("Worker {id} is shutting down its own pool, leaving it to a later join");
        }
        for (id, handle) in pending {
            if handle.join().is_err() {
                error!("Worker {id} terminated abnormally");
            }
        }

        lock(&self.arena).joining = false;
        self.joined.notify_all();
        debug!("Workers joined");
    }
}
