use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Largest frame delta the timer reports.
pub const MAX_DELTA: Duration = Duration::from_secs(1);

/// Source of monotonic time since some fixed origin.
pub trait Clock: Send {
    fn elapsed(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock advanced by hand. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        *self.now.lock()
    }
}

/// Per-frame delta and running total, with deltas clamped to [`MAX_DELTA`].
pub struct StepTimer {
    clock: Box<dyn Clock>,
    last: Duration,
    total: Duration,
}

impl StepTimer {
    #[must_use]
    pub fn new(clock: Box<dyn Clock>) -> Self {
        let last = clock.elapsed();
        Self {
            clock,
            last,
            total: Duration::ZERO,
        }
    }

    /// Seconds since the previous tick, at most one.
    pub fn tick(&mut self) -> f64 {
        let now = self.clock.elapsed();
        let delta = now.saturating_sub(self.last).min(MAX_DELTA);
        self.last = now;
        self.total += delta;
        delta.as_secs_f64()
    }

    /// Sum of all clamped deltas so far.
    #[must_use]
    pub fn total_seconds(&self) -> f64 {
        self.total.as_secs_f64()
    }
}
