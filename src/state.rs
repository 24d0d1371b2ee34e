//! Per-run monitoring state.

use crate::aggregator::Aggregator;
use crate::scheduler::RecordSchedule;
use crate::types::{Averages, Sample};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which samples feed the running averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// Only samples forwarded to the sinks; averages describe the saved series.
    #[default]
    Persisted,
    /// Every raw poll, persisted or not.
    EveryPoll,
}

impl FromStr for AggregationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "persisted" => Ok(Self::Persisted),
            "every_poll" => Ok(Self::EveryPoll),
            other => Err(format!("unknown aggregation policy '{other}' (expected persisted or every_poll)")),
        }
    }
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Persisted => "persisted",
            Self::EveryPoll => "every_poll",
        })
    }
}

/// State owned by the monitoring loop for the lifetime of one run.
///
/// Nothing here is shared; the loop passes samples in and gets back the ones
/// that should go to the sinks.
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    schedule: RecordSchedule,
    aggregator: Aggregator,
    policy: AggregationPolicy,
    record_count: u64,
    poll_count: u64,
}

impl MonitorState {
    /// Creates fresh state for a run.
    #[must_use]
    pub fn new(policy: AggregationPolicy) -> Self {
        Self { policy, ..Self::default() }
    }

    /// Feeds one polled sample through the record gate.
    ///
    /// Returns the sample if it should be forwarded to the sinks. The caller
    /// must forward every returned sample, in order, so that `record_count`
    /// matches what the sinks received.
    pub fn observe(&mut self, sample: Sample) -> Option<Sample> {
        self.poll_count += 1;
        if self.policy == AggregationPolicy::EveryPoll {
            self.aggregator.accumulate(&sample);
        }

        if !self.schedule.admit(sample.elapsed_seconds()) {
            return None;
        }

        self.record_count += 1;
        if self.policy == AggregationPolicy::Persisted {
            self.aggregator.accumulate(&sample);
        }
        Some(sample)
    }

    /// Elapsed time at or after which the next poll is persisted.
    #[must_use]
    pub fn next_record_time(&self) -> f64 {
        self.schedule.next_record_time()
    }

    /// Number of samples forwarded to the sinks.
    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Number of polls observed, persisted or not.
    #[must_use]
    pub fn poll_count(&self) -> u64 {
        self.poll_count
    }

    /// The aggregation policy in effect.
    #[must_use]
    pub fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    /// Current averages.
    #[must_use]
    pub fn averages(&self) -> Averages {
        self.aggregator.averages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn at(elapsed: f64, cpu: f64) -> Sample {
        Sample::new(elapsed, cpu, 100.0, 5.0, 50.0)
    }

    #[test]
    fn test_first_poll_is_persisted() {
        let mut state = MonitorState::new(AggregationPolicy::Persisted);
        assert!(state.observe(at(0.0, 1.0)).is_some());
        assert_eq!(state.record_count(), 1);
    }

    #[test]
    fn test_persisted_policy_ignores_skipped_polls() {
        let mut state = MonitorState::new(AggregationPolicy::Persisted);

        assert!(state.observe(at(0.0, 10.0)).is_some());
        assert!(state.observe(at(0.05, 1000.0)).is_none());
        assert!(state.observe(at(0.15, 30.0)).is_some());

        assert_eq!(state.poll_count(), 3);
        assert_eq!(state.record_count(), 2);
        assert_relative_eq!(state.averages().cpu, 20.0);
    }

    #[test]
    fn test_every_poll_policy_counts_skipped_polls() {
        let mut state = MonitorState::new(AggregationPolicy::EveryPoll);

        state.observe(at(0.0, 10.0));
        state.observe(at(0.05, 20.0));
        state.observe(at(0.15, 30.0));

        assert_eq!(state.record_count(), 2);
        assert_relative_eq!(state.averages().cpu, 20.0);
    }

    #[test]
    fn test_next_record_time_never_decreases() {
        let mut state = MonitorState::new(AggregationPolicy::Persisted);
        let mut last = state.next_record_time();
        for elapsed in [0.0, 0.05, 0.15, 1.2, 9.99, 10.0, 10.5, 61.0, 61.5, 3600.0] {
            state.observe(at(elapsed, 1.0));
            assert!(state.next_record_time() >= last);
            last = state.next_record_time();
        }
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("persisted".parse::<AggregationPolicy>(), Ok(AggregationPolicy::Persisted));
        assert_eq!("every-poll".parse::<AggregationPolicy>(), Ok(AggregationPolicy::EveryPoll));
        assert_eq!("EVERY_POLL".parse::<AggregationPolicy>(), Ok(AggregationPolicy::EveryPoll));
        assert!("sometimes".parse::<AggregationPolicy>().is_err());
    }

    #[test]
    fn test_policy_display_round_trips() {
        for policy in [AggregationPolicy::Persisted, AggregationPolicy::EveryPoll] {
            assert_eq!(policy.to_string().parse::<AggregationPolicy>(), Ok(policy));
        }
    }
}
