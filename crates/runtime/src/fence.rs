use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Monotonic completion counter for one timeline.
///
/// `completed()` never decreases: signalling a value lower than the current
/// one is ignored. Waiters block on a condition variable, never spin.
#[derive(Debug)]
pub struct Fence {
    name: &'static str,
    completed: Mutex<u64>,
    cond: Condvar,
}

impl Fence {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            completed: Mutex::new(0),
            cond: Condvar::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn completed(&self) -> u64 {
        *self.completed.lock()
    }

    #[must_use]
    pub fn is_complete(&self, value: u64) -> bool {
        self.completed() >= value
    }

    /// Records that all work up to `value` has finished.
    pub fn signal(&self, value: u64) {
        let mut completed = self.completed.lock();
        if value > *completed {
            *completed = value;
            self.cond.notify_all();
        }
    }

    /// Blocks until `completed() >= value`.
    pub fn wait_until(&self, value: u64) {
        let mut completed = self.completed.lock();
        if *completed >= value {
            return;
        }
        tracing::debug!(fence = self.name, value, completed = *completed, "blocking on fence");
        while *completed < value {
            self.cond.wait(&mut completed);
        }
    }

    /// Like [`wait_until`](Self::wait_until) but gives up after `timeout`.
    /// Returns whether the value was reached.
    pub fn wait_until_timeout(&self, value: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut completed = self.completed.lock();
        while *completed < value {
            if self.cond.wait_until(&mut completed, deadline).timed_out() {
                return *completed >= value;
            }
        }
        true
    }
}
