//! External stop requests.
//!
//! The monitoring loop polls a [`StopSignal`] once per cycle. When it is set
//! the loop goes straight to draining, so averages and sink data are still
//! flushed when the monitor itself is asked to terminate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MonitorError, Result};

/// Shared stop flag, settable from a signal handler or another thread.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    /// Creates a flag that is only set through [`trigger`](Self::trigger).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a flag that is also set on SIGINT, SIGTERM and SIGHUP.
    ///
    /// Only one handler can be installed per process.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::SignalHandler`] if registration fails.
    pub fn install() -> Result<Self> {
        let signal = Self::new();
        let flag = Arc::clone(&signal.flag);

        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .map_err(|e| MonitorError::SignalHandler(e.to_string()))?;

        Ok(signal)
    }

    /// Requests a stop.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Checks whether a stop has been requested (non-blocking).
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_requested_initially() {
        assert!(!StopSignal::new().is_requested());
    }

    #[test]
    fn test_trigger_sets_flag() {
        let signal = StopSignal::new();
        signal.trigger();
        assert!(signal.is_requested());
    }

    #[test]
    fn test_clones_share_state() {
        let signal = StopSignal::new();
        let clone = signal.clone();

        assert!(!clone.is_requested());
        signal.trigger();
        assert!(clone.is_requested());
    }

    #[test]
    fn test_trigger_from_another_thread() {
        let signal = StopSignal::new();
        let remote = signal.clone();

        std::thread::spawn(move || remote.trigger()).join().expect("thread should finish");
        assert!(signal.is_requested());
    }
}
