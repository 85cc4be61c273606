//! The table: owns the ring of forks and philosophers and drives a run.
//!
//! Philosopher *i* is bound to forks *i* and *(i+1) mod N*, so the ring is
//! closed and every fork is shared by exactly two neighbors. A run spawns
//! one named worker thread per philosopher, releases a fresh start gate
//! exactly once, and joins every worker before returning.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::RunOptions;
use crate::error::SimulationError;
use crate::fork::Fork;
use crate::gate::StartGate;
use crate::logln;
use crate::philosopher::{Philosopher, PhilosopherId};
use crate::sync_log::SyncLog;

/// How long `run` lets workers reach the start gate before opening it, so
/// the start is observed simultaneously rather than staggered by spawn
/// order.
const START_GRACE: Duration = Duration::from_millis(20);

/// What one completed run looked like.
#[derive(Debug)]
pub struct RunSummary {
    pub protocol: crate::protocol::Protocol,
    /// Wall-clock time of the whole run, spawn to last join.
    pub elapsed: Duration,
    /// Per-philosopher eating time, gate open to last bite.
    pub per_philosopher: Vec<(PhilosopherId, Duration)>,
}

pub struct Table {
    forks: Vec<Arc<Fork>>,
    philosophers: Vec<Arc<Philosopher>>,
    log: Arc<SyncLog>,
}

impl Table {
    /// Builds `seats` forks and `seats` philosophers arranged in a ring.
    pub fn new(seats: usize, log: Arc<SyncLog>) -> Result<Self, SimulationError> {
        if seats < 2 {
            return Err(SimulationError::TooFewSeats { seats });
        }
        let forks: Vec<Arc<Fork>> = (0..seats).map(|_| Arc::new(Fork::new())).collect();
        let philosophers = (0..seats)
            .map(|i| {
                Arc::new(Philosopher::new(
                    Arc::clone(&forks[i]),
                    Arc::clone(&forks[(i + 1) % seats]),
                ))
            })
            .collect();
        Ok(Table {
            forks,
            philosophers,
            log,
        })
    }

    pub fn forks(&self) -> &[Arc<Fork>] {
        &self.forks
    }

    pub fn philosophers(&self) -> &[Arc<Philosopher>] {
        &self.philosophers
    }

    /// Runs one simulation to completion. A fresh gate is created per call,
    /// so the same table can host repeated runs.
    pub fn run(&self, options: &RunOptions) -> Result<RunSummary, SimulationError> {
        let gate = Arc::new(StartGate::new());
        let started = Instant::now();

        type Worker = (PhilosopherId, JoinHandle<Result<Duration, SimulationError>>);
        let mut workers: Vec<Worker> = Vec::with_capacity(self.philosophers.len());

        for philosopher in &self.philosophers {
            let id = philosopher.id();
            let philosopher = Arc::clone(philosopher);
            let worker_gate = Arc::clone(&gate);
            let log = Arc::clone(&self.log);
            let options = options.clone();

            let spawned = thread::Builder::new()
                .name(format!("philosopher-{id}"))
                .spawn(move || philosopher.eat(&options, &worker_gate, &log));

            match spawned {
                Ok(handle) => workers.push((id, handle)),
                Err(source) => {
                    // Wake the workers that did start so they exit instead
                    // of waiting on a gate that will never open, then wait
                    // for them before reporting the failure.
                    gate.abandon()?;
                    for (_, handle) in workers {
                        let _ = handle.join();
                    }
                    return Err(SimulationError::Spawn { id, source });
                }
            }
        }

        thread::sleep(START_GRACE);
        logln!(self.log, "Starting all philosophers")?;
        gate.open()?;

        let mut per_philosopher = Vec::with_capacity(workers.len());
        let mut first_error: Option<SimulationError> = None;
        for (id, handle) in workers {
            match handle.join() {
                Ok(Ok(elapsed)) => per_philosopher.push((id, elapsed)),
                Ok(Err(err)) => {
                    first_error.get_or_insert(err);
                }
                Err(_) => {
                    first_error.get_or_insert(SimulationError::WorkerPanicked { id });
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        Ok(RunSummary {
            protocol: options.protocol,
            elapsed: started.elapsed(),
            per_philosopher,
        })
    }
}
