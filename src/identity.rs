//! Per-thread philosopher identity.
//!
//! Each worker binds its philosopher id once at entry; every later lookup is
//! a plain thread-local read with no shared lock on the logging path.

use std::cell::Cell;

use crate::philosopher::PhilosopherId;

thread_local! {
    static CURRENT: Cell<Option<PhilosopherId>> = Cell::new(None);
}

/// Binds the calling thread to a philosopher. Called once at worker entry.
pub fn bind(id: PhilosopherId) {
    CURRENT.with(|current| current.set(Some(id)));
}

/// The philosopher bound to the calling thread, if any.
pub fn current() -> Option<PhilosopherId> {
    CURRENT.with(|current| current.get())
}
