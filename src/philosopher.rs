//! A philosopher: the simulated actor that repeatedly eats with its two
//! neighboring forks.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::RunOptions;
use crate::error::SimulationError;
use crate::fork::{Fork, ForkId};
use crate::gate::{StartGate, StartSignal};
use crate::identity;
use crate::logln;
use crate::sync_log::SyncLog;

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Stable numeric identity, assigned from a global counter in construction
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhilosopherId(u32);

impl PhilosopherId {
    pub(crate) fn next() -> Self {
        PhilosopherId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PhilosopherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One seat at the table: an identity plus shared references to the left
/// and right forks.
#[derive(Debug)]
pub struct Philosopher {
    id: PhilosopherId,
    left: Arc<Fork>,
    right: Arc<Fork>,
}

impl Philosopher {
    pub fn new(left: Arc<Fork>, right: Arc<Fork>) -> Self {
        Philosopher {
            id: PhilosopherId::next(),
            left,
            right,
        }
    }

    pub fn id(&self) -> PhilosopherId {
        self.id
    }

    /// The ids of the two forks this philosopher is bound to, in
    /// left/right binding order.
    pub fn fork_ids(&self) -> (ForkId, ForkId) {
        (self.left.id(), self.right.id())
    }

    /// The full worker body: binds the thread-local identity, waits at the
    /// start gate, then eats `options.bites` bites. Returns the time spent
    /// eating, measured from the moment the gate opened for this worker.
    pub fn eat(
        &self,
        options: &RunOptions,
        gate: &StartGate,
        log: &SyncLog,
    ) -> Result<Duration, SimulationError> {
        identity::bind(self.id);
        let strategy = options.protocol.strategy();

        logln!(log, "Philosopher {} waiting for start", self.id)?;
        match gate.wait()? {
            StartSignal::Go => {}
            StartSignal::Abandoned => return Ok(Duration::ZERO),
        }

        let started = Instant::now();
        for bite in 1..=options.bites {
            strategy.acquire_pair(&self.left, &self.right, log)?;
            logln!(
                log,
                "Philosopher {} starts eating bite {} with fork {} and fork {}",
                self.id,
                bite,
                self.left.id(),
                self.right.id()
            )?;
            thread::sleep(options.bite_duration);
            logln!(log, "Philosopher {} finishes eating bite {}", self.id, bite)?;
            strategy.release_pair(&self.left, &self.right, log)?;
        }

        let elapsed = started.elapsed();
        logln!(
            log,
            "Philosopher {} finished eating in {:.3} seconds",
            self.id,
            elapsed.as_secs_f64()
        )?;
        Ok(elapsed)
    }
}
