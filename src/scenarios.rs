use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::ValueEnum;
use crossbeam::channel::{self, Sender};
use log::error;
use serde::Serialize;

use crate::{PoolError, ProactiveThreadPool, Result, SimpleThreadPool, Strategy, ThreadPool};

/// A workload used to compare strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// One chain per thread; every job in a chain spawns the next one from
    /// inside the pool.
    Linear,
    /// No-op jobs followed by shutdown.
    Empty,
    /// Jobs incrementing a shared counter followed by shutdown.
    Atomic,
}

impl Scenario {
    /// Every scenario, in reporting order.
    pub const ALL: [Scenario; 3] = [Scenario::Linear, Scenario::Empty, Scenario::Atomic];

    /// Human readable name.
    pub fn title(self) -> &'static str {
        match self {
            Scenario::Linear => "Linear Insertions",
            Scenario::Empty => "Empty Jobs",
            Scenario::Atomic => "Atomic Add",
        }
    }

    /// Runs this scenario on a freshly built pool of type `P`.
    pub fn measure<P: ThreadPool + 'static>(
        self,
        threads: u32,
        tasks: usize,
    ) -> Result<Duration> {
        match self {
            Scenario::Linear => linear_insertions::<P>(threads, tasks),
            Scenario::Empty => empty_jobs::<P>(threads, tasks),
            Scenario::Atomic => atomic_add::<P>(threads, tasks),
        }
    }
}

/// The outcome of one scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Scenario that ran.
    pub scenario: Scenario,
    /// Strategy of the pool it ran on.
    pub strategy: Strategy,
    /// Worker count.
    pub threads: u32,
    /// Total number of jobs.
    pub tasks: usize,
    /// Wall-clock time including pool construction and shutdown.
    pub elapsed_ms: f64,
}

/// Runs `scenario` on a pool built with `strategy`.
pub fn run(scenario: Scenario, strategy: Strategy, threads: u32, tasks: usize) -> Result<Report> {
    let elapsed = match strategy {
        Strategy::Simple => scenario.measure::<SimpleThreadPool>(threads, tasks)?,
        Strategy::Proactive => scenario.measure::<ProactiveThreadPool>(threads, tasks)?,
    };
    Ok(Report {
        scenario,
        strategy,
        threads,
        tasks,
        elapsed_ms: elapsed.as_secs_f64() * 1000.0,
    })
}

/// Signals the waiting caller once every chain reached its base case.
struct Completion {
    finished: AtomicUsize,
    chains: usize,
    done: Sender<usize>,
}

impl Completion {
    fn chain_finished(&self) {
        let finished = self.finished.fetch_add(1, Ordering::AcqRel) + 1;
        if finished == self.chains {
            let _ = self.done.send(finished);
        }
    }
}

fn insert<P: ThreadPool + 'static>(
    pool: &Arc<P>,
    remaining: usize,
    completion: &Arc<Completion>,
) -> Result<()> {
    if remaining == 0 {
        completion.chain_finished();
        return Ok(());
    }
    let next_pool = Arc::clone(pool);
    let completion = Arc::clone(completion);
    pool.spawn(move || {
        if let Err(e) = insert(&next_pool, remaining - 1, &completion) {
            error!("Insertion chain broken: {e}");
        }
    })
}

/// Starts one chain per thread, each `tasks / threads` jobs long, where
/// every job spawns its successor, and waits for all chains to end.
pub fn linear_insertions<P: ThreadPool + 'static>(threads: u32, tasks: usize) -> Result<Duration> {
    let start = Instant::now();
    let pool = Arc::new(P::new(threads)?);

    let chains = threads as usize;
    let (done_tx, done_rx) = channel::bounded(1);
    let completion = Arc::new(Completion {
        finished: AtomicUsize::new(0),
        chains,
        done: done_tx,
    });
    for _ in 0..chains {
        insert(&pool, tasks / chains, &completion)?;
    }
    // Broken chains drop their handle on the sender; once all are gone
    // `recv` fails instead of blocking forever.
    drop(completion);

    let finished = done_rx
        .recv()
        .map_err(|_| PoolError::ScenarioCheck("insertion chains never finished".to_owned()))?;
    if finished != chains {
        return Err(PoolError::ScenarioCheck(format!(
            "{finished} of {chains} insertion chains finished"
        )));
    }

    pool.shutdown();
    Ok(start.elapsed())
}

/// Spawns `tasks` no-op jobs and shuts the pool down.
pub fn empty_jobs<P: ThreadPool>(threads: u32, tasks: usize) -> Result<Duration> {
    let start = Instant::now();
    let pool = P::new(threads)?;
    for _ in 0..tasks {
        pool.spawn(|| {})?;
    }
    pool.shutdown();
    Ok(start.elapsed())
}

/// Spawns `tasks` jobs incrementing a shared counter, shuts the pool down
/// and checks the counter.
pub fn atomic_add<P: ThreadPool>(threads: u32, tasks: usize) -> Result<Duration> {
    let counter = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();
    let pool = P::new(threads)?;
    for _ in 0..tasks {
        let counter = Arc::clone(&counter);
        pool.spawn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })?;
    }
    pool.shutdown();
    let elapsed = start.elapsed();

    let count = counter.load(Ordering::SeqCst);
    if count != tasks {
        return Err(PoolError::ScenarioCheck(format!(
            "counter reached {count}, expected {tasks}"
        )));
    }
    Ok(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_scenario_runs_on_every_strategy() {
        for scenario in Scenario::ALL {
            for strategy in Strategy::ALL {
                let report = run(scenario, strategy, 4, 100).unwrap();
                assert_eq!(report.scenario, scenario);
                assert_eq!(report.strategy, strategy);
                assert!(report.elapsed_ms >= 0.0);
            }
        }
    }

    #[test]
    fn fewer_tasks_than_threads() {
        linear_insertions::<SimpleThreadPool>(4, 2).unwrap();
        linear_insertions::<ProactiveThreadPool>(4, 2).unwrap();
    }

    #[test]
    fn zero_threads_fail_before_running() {
        let err = run(Scenario::Atomic, Strategy::Simple, 0, 10).unwrap_err();
        assert!(matches!(err, PoolError::InvalidThreadCount(0)));
    }
}
