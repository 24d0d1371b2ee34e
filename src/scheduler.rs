//! Adaptive record schedule.
//!
//! Polls happen at a fixed short period, but only some of them are persisted.
//! The gap between persisted samples grows with the age of the run: dense at
//! the start so short-lived targets still get a useful series, sparse over
//! multi-hour jobs so the record stays small.
//!
//! | elapsed (s)      | interval (s) |
//! |------------------|--------------|
//! | `[0, 10)`        | 0.1          |
//! | `[10, 60)`       | 1            |
//! | `[60, 3600)`     | 60           |
//! | `[3600, 36000)`  | 300          |
//! | `[36000, ∞)`     | 600          |

/// Upper bounds (exclusive) and the interval used below each bound.
const TIERS: [(f64, f64); 4] = [(10.0, 0.1), (60.0, 1.0), (3600.0, 60.0), (36_000.0, 300.0)];

/// Interval used once every tier bound has been passed.
const FINAL_INTERVAL: f64 = 600.0;

/// Returns the record interval in seconds for a run that is `elapsed_seconds` old.
///
/// Pure step function. Negative or NaN input is treated as the start of the run.
#[must_use]
pub fn interval(elapsed_seconds: f64) -> f64 {
    let elapsed = if elapsed_seconds.is_nan() { 0.0 } else { elapsed_seconds };
    TIERS
        .iter()
        .find(|(bound, _)| elapsed < *bound)
        .map_or(FINAL_INTERVAL, |(_, step)| *step)
}

/// Gate deciding which polls are persisted.
///
/// `next_record_time` starts at zero, so the first poll is always persisted.
/// It never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RecordSchedule {
    next_record_time: f64,
}

impl RecordSchedule {
    /// Creates a schedule whose first poll is due immediately.
    #[must_use]
    pub fn new() -> Self {
        Self { next_record_time: 0.0 }
    }

    /// Elapsed time at or after which the next poll is persisted.
    #[must_use]
    pub fn next_record_time(&self) -> f64 {
        self.next_record_time
    }

    /// Returns true if a poll taken at `elapsed_seconds` should be persisted.
    #[must_use]
    pub fn is_due(&self, elapsed_seconds: f64) -> bool {
        elapsed_seconds >= self.next_record_time
    }

    /// Moves the gate past a persisted poll taken at `elapsed_seconds`.
    ///
    /// The next record time becomes `elapsed_seconds + interval(elapsed_seconds)`.
    pub fn advance(&mut self, elapsed_seconds: f64) {
        let next = elapsed_seconds + interval(elapsed_seconds);
        if next > self.next_record_time {
            self.next_record_time = next;
        }
    }

    /// Checks a poll and advances the gate if it is due.
    ///
    /// Returns true if the poll should be persisted.
    pub fn admit(&mut self, elapsed_seconds: f64) -> bool {
        if !self.is_due(elapsed_seconds) {
            return false;
        }
        self.advance(elapsed_seconds);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_interval_at_boundaries() {
        assert_relative_eq!(interval(0.0), 0.1);
        assert_relative_eq!(interval(9.999), 0.1);
        assert_relative_eq!(interval(10.0), 1.0);
        assert_relative_eq!(interval(59.999), 1.0);
        assert_relative_eq!(interval(60.0), 60.0);
        assert_relative_eq!(interval(3599.999), 60.0);
        assert_relative_eq!(interval(3600.0), 300.0);
        assert_relative_eq!(interval(35_999.999), 300.0);
        assert_relative_eq!(interval(36_000.0), 600.0);
        assert_relative_eq!(interval(1e9), 600.0);
    }

    #[test]
    fn test_interval_just_below_boundaries_uses_lower_tier() {
        for (bound, step) in TIERS {
            let below = bound - f64::EPSILON * bound;
            assert_relative_eq!(interval(below), step);
        }
    }

    #[test]
    fn test_interval_degenerate_input() {
        assert_relative_eq!(interval(-5.0), 0.1);
        assert_relative_eq!(interval(f64::NAN), 0.1);
        assert_relative_eq!(interval(f64::INFINITY), 600.0);
    }

    #[test]
    fn test_first_poll_always_due() {
        let schedule = RecordSchedule::new();
        assert!(schedule.is_due(0.0));
        assert_eq!(schedule.next_record_time(), 0.0);
    }

    #[test]
    fn test_admit_advances_from_poll_time() {
        let mut schedule = RecordSchedule::new();

        assert!(schedule.admit(0.0));
        assert_relative_eq!(schedule.next_record_time(), 0.1);

        assert!(!schedule.admit(0.05));
        assert_relative_eq!(schedule.next_record_time(), 0.1);

        assert!(schedule.admit(0.15));
        assert_relative_eq!(schedule.next_record_time(), 0.25);

        assert!(schedule.admit(12.0));
        assert_relative_eq!(schedule.next_record_time(), 13.0);

        assert!(!schedule.admit(12.9));
        assert!(schedule.admit(61.0));
        assert_relative_eq!(schedule.next_record_time(), 121.0);
    }
}
