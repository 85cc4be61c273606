//! Run-level error taxonomy.
//!
//! Everything here is fatal to the run: fork misuse, a poisoned primitive,
//! a worker that could not be spawned or that panicked, or a log write
//! failure. The backoff protocol's failed try-acquire is deliberately NOT
//! an error; it is control flow inside [`acquire_pair`].
//!
//! [`acquire_pair`]: crate::protocol::PairAcquire::acquire_pair

use std::io;

use thiserror::Error;

use crate::fork::ForkError;
use crate::gate::GateError;
use crate::philosopher::PhilosopherId;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Fork(#[from] ForkError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("a dining table needs at least two seats, got {seats}")]
    TooFewSeats { seats: usize },

    #[error("failed to spawn worker for philosopher {id}")]
    Spawn {
        id: PhilosopherId,
        #[source]
        source: io::Error,
    },

    #[error("worker for philosopher {id} panicked")]
    WorkerPanicked { id: PhilosopherId },

    #[error("failed to write log line")]
    Log(#[from] io::Error),
}
