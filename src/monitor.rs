//! The monitoring loop.
//!
//! ```text
//! Starting ──► Running ──► Draining ──► Done
//!                 │  ▲
//!                 └──┘ poll: timestamp, liveness, sleep, sample, gate, record
//! ```
//!
//! The loop leaves `Running` the moment the target is seen to have exited
//! (before that cycle's sample is taken) or a stop is requested. Draining
//! computes the final averages and flushes the sink; a flush failure is fatal.

use crate::clock::Clock;
use crate::error::Result;
use crate::handle::Liveness;
use crate::sampler::Sampler;
use crate::signal::StopSignal;
use crate::sink::RecordSink;
use crate::state::{AggregationPolicy, MonitorState};
use crate::types::Averages;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default poll period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle phase of a [`Monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Target resolved, loop not entered yet.
    Starting,
    /// Polling the target.
    Running,
    /// Computing averages and flushing sinks.
    Draining,
    /// Finished.
    Done,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The liveness check reported the target gone.
    TargetExited,
    /// An external stop was requested.
    StopRequested,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    /// Final averages.
    pub averages: Averages,
    /// Samples forwarded to the sink.
    pub record_count: u64,
    /// Polls taken, persisted or not.
    pub polls: u64,
    /// Why the loop stopped.
    pub exit: ExitReason,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.averages, f)
    }
}

/// Drives one target from start to finished record.
pub struct Monitor<T, C, S> {
    target: T,
    clock: C,
    sampler: Sampler,
    sink: S,
    state: MonitorState,
    stop: StopSignal,
    poll_interval: Duration,
    phase: Phase,
    report: Option<Report>,
}

impl<T: Liveness, C: Clock, S: RecordSink> Monitor<T, C, S> {
    /// Creates a monitor in the `Starting` phase with the default poll period,
    /// the persisted aggregation policy and a stop signal nobody triggers.
    pub fn new(target: T, clock: C, sampler: Sampler, sink: S) -> Self {
        Self {
            target,
            clock,
            sampler,
            sink,
            state: MonitorState::new(AggregationPolicy::default()),
            stop: StopSignal::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            phase: Phase::Starting,
            report: None,
        }
    }

    /// Sets the aggregation policy.
    #[must_use]
    pub fn with_policy(mut self, policy: AggregationPolicy) -> Self {
        self.state = MonitorState::new(policy);
        self
    }

    /// Sets the poll period.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Uses `stop` to end the run early.
    #[must_use]
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Runs the loop to completion.
    ///
    /// Calling this again after the run finished returns the same report
    /// without polling.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects a sample or cannot be flushed.
    pub fn run(&mut self) -> Result<Report> {
        if let Some(report) = self.report {
            return Ok(report);
        }

        let pid = self.target.pid();
        self.enter(Phase::Running);
        info!(pid, policy = %self.state.policy(), "monitoring started");

        let exit = match self.poll_until_exit(pid) {
            Ok(exit) => exit,
            Err(e) => {
                self.enter(Phase::Draining);
                if let Err(flush) = self.sink.flush() {
                    warn!("flush after failed write also failed: {flush}");
                }
                self.enter(Phase::Done);
                return Err(e);
            }
        };

        self.enter(Phase::Draining);
        let averages = self.state.averages();
        self.sink.flush()?;

        let report = Report {
            averages,
            record_count: self.state.record_count(),
            polls: self.state.poll_count(),
            exit,
        };
        info!(pid, records = report.record_count, polls = report.polls, ?exit, "monitoring finished");

        self.enter(Phase::Done);
        self.report = Some(report);
        Ok(report)
    }

    fn poll_until_exit(&mut self, pid: u32) -> Result<ExitReason> {
        loop {
            // Stamped at the top of the cycle so the first poll is at ~0 s.
            let elapsed = self.clock.elapsed_seconds();

            if self.stop.is_requested() {
                return Ok(ExitReason::StopRequested);
            }
            if !self.target.is_running() {
                return Ok(ExitReason::TargetExited);
            }

            self.clock.sleep(self.poll_interval);

            let sample = self.sampler.sample(pid, elapsed);
            if let Some(persisted) = self.state.observe(sample) {
                self.sink.record(self.state.record_count(), &persisted)?;
            }
        }
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "phase transition");
        self.phase = phase;
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Loop state (schedule, aggregator and counters).
    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// The sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The target, e.g. to reap a spawned child after the run.
    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Splits the monitor into its target and sink.
    pub fn into_parts(self) -> (T, S) {
        (self.target, self.sink)
    }
}

impl<T, C, S> fmt::Debug for Monitor<T, C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("phase", &self.phase)
            .field("poll_interval", &self.poll_interval)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
