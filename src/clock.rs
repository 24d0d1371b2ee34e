//! Time source for the monitoring loop.

use std::time::{Duration, Instant};

/// Elapsed time since monitoring started, plus the blocking wait between polls.
pub trait Clock {
    /// Seconds since the clock was started.
    fn elapsed_seconds(&self) -> f64;

    /// Blocks for `period`.
    fn sleep(&mut self, period: Duration);
}

/// Monotonic wall clock with a blocking thread sleep.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Starts a clock at the current instant.
    #[must_use]
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for SystemClock {
    fn elapsed_seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn sleep(&mut self, period: Duration) {
        std::thread::sleep(period);
    }
}
