//! A concurrent dining-philosophers simulation.
//!
//! N philosophers sit around a ring of N forks; each fork is shared by its
//! two neighbors. Every philosopher runs on its own worker thread, waits at
//! a one-shot start gate, then eats a configured number of bites, where one
//! bite is acquire-both-forks / hold / release-both. Two deadlock-free
//! acquisition protocols are provided behind the [`PairAcquire`] trait:
//! backoff (try the second fork, put the first back on failure) and ordered
//! (always lock the globally lower fork first).
//!
//! The observable output is the console trace written through [`SyncLog`];
//! every acquisition attempt, success, release, and bite is one atomic
//! line, attributed via a per-thread philosopher identity.

pub mod config;
pub mod error;
pub mod fork;
pub mod gate;
pub mod identity;
pub mod philosopher;
pub mod protocol;
pub mod sync_log;
pub mod table;

pub use config::{ConfigError, ProtocolChoice, RunOptions, SimConfig};
pub use error::SimulationError;
pub use fork::{Fork, ForkError, ForkId};
pub use gate::{GateError, StartGate, StartSignal};
pub use philosopher::{Philosopher, PhilosopherId};
pub use protocol::{BackoffAcquire, OrderedAcquire, PairAcquire, Protocol};
pub use sync_log::{LogCapture, SyncLog};
pub use table::{RunSummary, Table};
