use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use log::{debug, warn};

use super::worker::{execute, lock, Counters, Job, Workers};
use super::{PoolStats, ThreadPool};
use crate::config::PoolConfig;
use crate::{PoolError, Result};

/// A thread pool that hands jobs directly to idle workers.
///
/// Every worker owns a single-slot channel. A job submitted while some
/// worker is idle goes straight into that worker's slot and wakes only
/// that worker; otherwise it waits in an overflow queue, which busy workers
/// drain before they declare themselves idle again.
///
/// Jobs handed directly to an idle worker may start before older jobs
/// still sitting in the overflow queue. Only jobs that pass through the
/// overflow queue keep their relative FIFO order.
pub struct ProactiveThreadPool {
    shared: Arc<Shared>,
    workers: Workers,
}

enum Message {
    Run(Job),
    Stop,
}

/// What a worker does after finishing a job.
enum Next {
    Run(Job),
    Wait,
    Exit,
}

struct Shared {
    dispatch: Mutex<Dispatch>,
    /// Sending half of each worker's slot, indexed by worker id.
    slots: Vec<Sender<Message>>,
    counters: Counters,
}

struct Dispatch {
    /// Workers blocked on their own slot. A worker is listed here exactly
    /// while its slot is empty and it is waiting on it.
    idle: Vec<usize>,
    overflow: VecDeque<Job>,
    stopping: bool,
}

impl ThreadPool for ProactiveThreadPool {
    fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let (slots, receivers): (Vec<_>, Vec<_>) = (0..config.threads())
            .map(|_| channel::bounded::<Message>(1))
            .unzip();

        let shared = Arc::new(Shared {
            dispatch: Mutex::new(Dispatch {
                idle: Vec::with_capacity(slots.len()),
                overflow: VecDeque::new(),
                stopping: false,
            }),
            slots,
            counters: Counters::default(),
        });

        let bodies = receivers.into_iter().enumerate().map(|(id, slot)| {
            let shared = Arc::clone(&shared);
            move || run_worker(id, &shared, &slot)
        });
        let workers = Workers::spawn(&config, bodies, || shared.begin_stop())?;

        Ok(ProactiveThreadPool { shared, workers })
    }

    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut dispatch = lock(&self.shared.dispatch);
        if dispatch.stopping {
            return Err(PoolError::ShutDown);
        }
        self.shared.counters.accepted();
        let job: Job = Box::new(job);

        // Leaving the idle set and filling the slot happen under one lock.
        let Some(id) = dispatch.idle.pop() else {
            dispatch.overflow.push_back(job);
            return Ok(());
        };
        match self.shared.slots[id].try_send(Message::Run(job)) {
            Ok(()) => {}
            Err(TrySendError::Full(msg)) | Err(TrySendError::Disconnected(msg)) => {
                warn!("Worker {id} slot rejected a handoff, queueing the job");
                if let Message::Run(job) = msg {
                    dispatch.overflow.push_back(job);
                }
            }
        }
        Ok(())
    }

    fn shutdown(&self) {
        self.shared.begin_stop();
        self.workers.join_all();
    }

    fn is_shutdown(&self) -> bool {
        lock(&self.shared.dispatch).stopping
    }

    fn threads(&self) -> usize {
        self.workers.len()
    }

    fn stats(&self) -> PoolStats {
        self.shared.counters.snapshot(self.workers.len())
    }
}

impl Shared {
    /// Sets the stopping flag and signals every idle worker through its own
    /// slot. Busy workers observe the flag when they next look for work.
    fn begin_stop(&self) {
        let mut dispatch = lock(&self.dispatch);
        if dispatch.stopping {
            return;
        }
        dispatch.stopping = true;
        debug!(
            "Shutting down, waking {} idle workers, {} queued jobs left to drain",
            dispatch.idle.len(),
            dispatch.overflow.len()
        );
        for id in dispatch.idle.drain(..) {
            // An idle worker's slot is empty, so this cannot be full.
            if let Err(e) = self.slots[id].try_send(Message::Stop) {
                warn!("Worker {id} slot rejected the stop signal: {e}");
            }
        }
    }

    /// Takes the oldest overflow job, or registers worker `id` as idle.
    fn overflow_or_idle(&self, id: usize) -> Next {
        let mut dispatch = lock(&self.dispatch);
        if let Some(job) = dispatch.overflow.pop_front() {
            return Next::Run(job);
        }
        if dispatch.stopping {
            return Next::Exit;
        }
        dispatch.idle.push(id);
        Next::Wait
    }
}

fn run_worker(id: usize, shared: &Shared, slot: &Receiver<Message>) {
    debug!("Worker {id} started");
    loop {
        // Backlog first, so a job never waits in overflow while its worker
        // sits idle.
        let job = match shared.overflow_or_idle(id) {
            Next::Run(job) => job,
            Next::Wait => match slot.recv() {
                Ok(Message::Run(job)) => job,
                Ok(Message::Stop) | Err(_) => break,
            },
            Next::Exit => break,
        };
        execute(id, job, &shared.counters);
    }
    debug!("Worker {id}: stopping");
}

impl Drop for ProactiveThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
