//! A fork: one shared utensil with a stable identity and exclusive ownership.
//!
//! Every acquisition attempt, success, and release is traced through the
//! shared log, attributed to the philosopher bound to the calling thread.
//! The holder slot is guarded by a `Mutex` + `Condvar` pair so `acquire` can
//! block, `try_acquire` can back off, and `release` can wake one waiter.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

use thiserror::Error;

use crate::identity;
use crate::logln;
use crate::philosopher::PhilosopherId;
use crate::sync_log::SyncLog;

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Stable numeric identity, assigned from a global counter in construction
/// order. Doubles as the total-order key for ordered pair acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ForkId(u32);

impl fmt::Display for ForkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Error)]
pub enum ForkError {
    #[error("philosopher {holder} already holds fork {fork}")]
    AlreadyHeld {
        fork: ForkId,
        holder: PhilosopherId,
    },

    #[error("philosopher {holder} released fork {fork} without holding it")]
    NotHeld {
        fork: ForkId,
        holder: PhilosopherId,
    },

    #[error("fork {fork} state poisoned by a panicked worker")]
    Poisoned { fork: ForkId },

    #[error("fork used from a thread with no philosopher bound")]
    NoIdentity,

    #[error("failed to write log line")]
    Log(#[from] io::Error),
}

#[derive(Debug)]
pub struct Fork {
    id: ForkId,
    holder: Mutex<Option<PhilosopherId>>,
    freed: Condvar,
}

impl Fork {
    pub fn new() -> Self {
        Fork {
            id: ForkId(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
            holder: Mutex::new(None),
            freed: Condvar::new(),
        }
    }

    pub fn id(&self) -> ForkId {
        self.id
    }

    /// The comparable handle: a key every philosopher agrees on, used only
    /// to put two forks in a global order.
    pub fn order_key(&self) -> ForkId {
        self.id
    }

    /// Blocks until the fork is free, then records the calling philosopher
    /// as holder. Must only be called under a protocol that cannot form a
    /// circular wait.
    pub fn acquire(&self, log: &SyncLog) -> Result<(), ForkError> {
        let me = identity::current().ok_or(ForkError::NoIdentity)?;
        logln!(log, "Philosopher {me} taking fork {}", self.id)?;

        let mut holder = self.lock_holder()?;
        if *holder == Some(me) {
            return Err(ForkError::AlreadyHeld {
                fork: self.id,
                holder: me,
            });
        }
        while holder.is_some() {
            holder = self
                .freed
                .wait(holder)
                .map_err(|_| ForkError::Poisoned { fork: self.id })?;
        }
        *holder = Some(me);
        drop(holder);

        logln!(log, "Philosopher {me} took fork {}", self.id)?;
        Ok(())
    }

    /// Non-blocking variant. Returns `false` without holding anything when
    /// the fork is busy; both outcomes appear in the trace.
    pub fn try_acquire(&self, log: &SyncLog) -> Result<bool, ForkError> {
        let me = identity::current().ok_or(ForkError::NoIdentity)?;
        logln!(log, "Philosopher {me} taking fork {}", self.id)?;

        let mut holder = self.lock_holder()?;
        if *holder == Some(me) {
            return Err(ForkError::AlreadyHeld {
                fork: self.id,
                holder: me,
            });
        }
        if holder.is_some() {
            drop(holder);
            logln!(log, "Philosopher {me} did not get fork {}", self.id)?;
            return Ok(false);
        }
        *holder = Some(me);
        drop(holder);

        logln!(log, "Philosopher {me} took fork {}", self.id)?;
        Ok(true)
    }

    /// Puts the fork down and wakes one blocked acquirer. The `leaving`
    /// line is written while the fork is still held, so per-fork trace
    /// order matches hold order.
    pub fn release(&self, log: &SyncLog) -> Result<(), ForkError> {
        let me = identity::current().ok_or(ForkError::NoIdentity)?;
        logln!(log, "Philosopher {me} leaving fork {}", self.id)?;

        let mut holder = self.lock_holder()?;
        if *holder != Some(me) {
            return Err(ForkError::NotHeld {
                fork: self.id,
                holder: me,
            });
        }
        *holder = None;
        drop(holder);
        self.freed.notify_one();
        Ok(())
    }

    fn lock_holder(&self) -> Result<MutexGuard<'_, Option<PhilosopherId>>, ForkError> {
        self.holder
            .lock()
            .map_err(|_| ForkError::Poisoned { fork: self.id })
    }
}

impl Default for Fork {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;

    fn bound_thread<T: Send + 'static>(
        body: impl FnOnce(PhilosopherId) -> T + Send + 'static,
    ) -> T {
        thread::spawn(move || {
            let id = PhilosopherId::next();
            identity::bind(id);
            body(id)
        })
        .join()
        .unwrap()
    }

    #[test]
    fn test_ids_are_unique() {
        let forks: Vec<Fork> = (0..8).map(|_| Fork::new()).collect();
        for (i, a) in forks.iter().enumerate() {
            for b in &forks[i + 1..] {
                assert_ne!(a.id(), b.id());
            }
        }
    }

    #[test]
    fn test_acquire_release_traces_holder() {
        let fork = Fork::new();
        let fork_id = fork.id();
        let (id, capture) = bound_thread(move |id| {
            let (log, capture) = SyncLog::captured();
            fork.acquire(&log).unwrap();
            fork.release(&log).unwrap();
            (id, capture)
        });
        let lines = capture.lines();
        assert_eq!(
            lines,
            vec![
                format!("Philosopher {id} taking fork {fork_id}"),
                format!("Philosopher {id} took fork {fork_id}"),
                format!("Philosopher {id} leaving fork {fork_id}"),
            ]
        );
    }

    #[test]
    fn test_try_acquire_backs_off_when_busy() {
        let fork = Arc::new(Fork::new());
        let (log, capture) = SyncLog::captured();
        let log = Arc::new(log);

        let (held_tx, held_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let holder_fork = Arc::clone(&fork);
        let holder_log = Arc::clone(&log);
        let holder = thread::spawn(move || {
            identity::bind(PhilosopherId::next());
            holder_fork.acquire(&holder_log).unwrap();
            held_tx.send(()).unwrap();
            done_rx.recv().unwrap();
            holder_fork.release(&holder_log).unwrap();
        });

        held_rx.recv().unwrap();
        let contender_fork = Arc::clone(&fork);
        let contender_log = Arc::clone(&log);
        thread::spawn(move || {
            identity::bind(PhilosopherId::next());
            assert!(!contender_fork.try_acquire(&contender_log).unwrap());
            done_tx.send(()).unwrap();
        })
        .join()
        .unwrap();
        holder.join().unwrap();

        let trace = capture.contents();
        assert!(trace.contains(&format!("did not get fork {}", fork.id())));
    }

    #[test]
    fn test_try_acquire_succeeds_when_free() {
        let fork = Fork::new();
        bound_thread(move |_| {
            let (log, _capture) = SyncLog::captured();
            assert!(fork.try_acquire(&log).unwrap());
            fork.release(&log).unwrap();
        });
    }

    #[test]
    fn test_double_acquire_is_misuse() {
        let fork = Fork::new();
        bound_thread(move |_| {
            let (log, _capture) = SyncLog::captured();
            fork.acquire(&log).unwrap();
            assert!(matches!(
                fork.acquire(&log),
                Err(ForkError::AlreadyHeld { .. })
            ));
        });
    }

    #[test]
    fn test_release_without_holding_is_misuse() {
        let fork = Fork::new();
        bound_thread(move |_| {
            let (log, _capture) = SyncLog::captured();
            assert!(matches!(
                fork.release(&log),
                Err(ForkError::NotHeld { .. })
            ));
        });
    }

    #[test]
    fn test_unbound_thread_is_rejected() {
        let fork = Fork::new();
        thread::spawn(move || {
            let (log, _capture) = SyncLog::captured();
            assert!(matches!(fork.acquire(&log), Err(ForkError::NoIdentity)));
        })
        .join()
        .unwrap();
    }
}
