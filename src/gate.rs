//! The one-shot start gate.
//!
//! Every worker parks on the gate after announcing itself; the table opens
//! it exactly once per run so all philosophers start together. Abandoning
//! the gate is the cleanup path when worker spawning fails part-way: the
//! already-running workers wake up and exit instead of waiting forever.

use std::sync::{Condvar, Mutex};

use thiserror::Error;

#[derive(Debug, Error)]
#[error("start gate poisoned by a panicked worker")]
pub struct GateError;

/// What a waiter observes once the gate is no longer closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartSignal {
    /// The run is on; enter the eating loop.
    Go,
    /// The run was called off before it started; exit without eating.
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Closed,
    Open,
    Abandoned,
}

#[derive(Debug)]
pub struct StartGate {
    state: Mutex<GateState>,
    released: Condvar,
}

impl StartGate {
    pub fn new() -> Self {
        StartGate {
            state: Mutex::new(GateState::Closed),
            released: Condvar::new(),
        }
    }

    /// Blocks until the gate is opened or abandoned. A waiter arriving
    /// after the fact passes straight through.
    pub fn wait(&self) -> Result<StartSignal, GateError> {
        let mut state = self.state.lock().map_err(|_| GateError)?;
        while *state == GateState::Closed {
            state = self.released.wait(state).map_err(|_| GateError)?;
        }
        Ok(if *state == GateState::Open {
            StartSignal::Go
        } else {
            StartSignal::Abandoned
        })
    }

    /// Opens the gate. Called exactly once per run.
    pub fn open(&self) -> Result<(), GateError> {
        let mut state = self.state.lock().map_err(|_| GateError)?;
        *state = GateState::Open;
        drop(state);
        self.released.notify_all();
        Ok(())
    }

    /// Calls the run off; all current and future waiters observe
    /// [`StartSignal::Abandoned`].
    pub fn abandon(&self) -> Result<(), GateError> {
        let mut state = self.state.lock().map_err(|_| GateError)?;
        *state = GateState::Abandoned;
        drop(state);
        self.released.notify_all();
        Ok(())
    }
}

impl Default for StartGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_waiters_blocked_until_open() {
        let gate = Arc::new(StartGate::new());
        let passed = Arc::new(AtomicUsize::new(0));
        let workers = 4;

        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let passed = Arc::clone(&passed);
                thread::spawn(move || {
                    let signal = gate.wait().unwrap();
                    passed.fetch_add(1, Ordering::SeqCst);
                    signal
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        assert_eq!(passed.load(Ordering::SeqCst), 0);

        gate.open().unwrap();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), StartSignal::Go);
        }
        assert_eq!(passed.load(Ordering::SeqCst), workers);
    }

    #[test]
    fn test_late_waiter_passes_through() {
        let gate = StartGate::new();
        gate.open().unwrap();
        assert_eq!(gate.wait().unwrap(), StartSignal::Go);
    }

    #[test]
    fn test_abandon_wakes_waiters() {
        let gate = Arc::new(StartGate::new());
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.wait().unwrap())
        };
        thread::sleep(Duration::from_millis(20));
        gate.abandon().unwrap();
        assert_eq!(waiter.join().unwrap(), StartSignal::Abandoned);
    }
}
