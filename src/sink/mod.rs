//! Consumers of persisted samples.
//!
//! A [`RecordSink`] receives every persisted sample in poll order and is
//! flushed once when monitoring drains. Sinks never feed back into the loop.
//!
//! - [`csv::CsvSink`]: durable tabular record
//! - [`live::LiveTableSink`]: scrolling terminal table (feature `live`)
//! - [`MemorySink`]: in-memory record, for embedding and tests
//! - [`SinkSet`]: fan-out to several sinks

pub mod csv;

#[cfg(feature = "live")]
#[cfg_attr(docsrs, doc(cfg(feature = "live")))]
pub mod live;

pub use self::csv::CsvSink;

#[cfg(feature = "live")]
pub use self::live::{LiveTable, LiveTableSink};

use crate::error::Result;
use crate::types::Sample;

/// Receiver of persisted samples.
pub trait RecordSink {
    /// Returns the unique identifier for this sink.
    fn id(&self) -> &'static str;

    /// Appends one persisted sample. `index` is its 1-based record number.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample could not be written.
    fn record(&mut self, index: u64, sample: &Sample) -> Result<()>;

    /// Makes everything recorded so far durable and releases display resources.
    ///
    /// # Errors
    ///
    /// Returns an error if buffered data could not be saved.
    fn flush(&mut self) -> Result<()>;
}

/// A boxed sink for dynamic dispatch.
pub type BoxedSink = Box<dyn RecordSink>;

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn id(&self) -> &'static str {
        (**self).id()
    }

    fn record(&mut self, index: u64, sample: &Sample) -> Result<()> {
        (**self).record(index, sample)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Fans each sample out to several sinks in insertion order.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<BoxedSink>,
}

impl SinkSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    pub fn push(&mut self, sink: impl RecordSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// Number of sinks in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true if the set has no sinks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl RecordSink for SinkSet {
    fn id(&self) -> &'static str {
        "set"
    }

    fn record(&mut self, index: u64, sample: &Sample) -> Result<()> {
        for sink in &mut self.sinks {
            sink.record(index, sample)?;
        }
        Ok(())
    }

    /// Flushes every sink even if an earlier one fails, returning the first error.
    fn flush(&mut self) -> Result<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.flush() {
                tracing::error!(sink = sink.id(), "flush failed: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for SinkSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<_> = self.sinks.iter().map(|s| s.id()).collect();
        f.debug_struct("SinkSet").field("sinks", &ids).finish()
    }
}

/// Keeps persisted samples in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Vec<(u64, Sample)>,
    flushed: bool,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded samples in arrival order.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.records.iter().map(|(_, s)| s)
    }

    /// Recorded `(index, sample)` pairs in arrival order.
    #[must_use]
    pub fn records(&self) -> &[(u64, Sample)] {
        &self.records
    }

    /// Number of recorded samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns true once [`RecordSink::flush`] has been called.
    #[must_use]
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }
}

impl RecordSink for MemorySink {
    fn id(&self) -> &'static str {
        "memory"
    }

    fn record(&mut self, index: u64, sample: &Sample) -> Result<()> {
        self.records.push((index, *sample));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;

    struct BrokenSink {
        flushed: bool,
    }

    impl RecordSink for BrokenSink {
        fn id(&self) -> &'static str {
            "broken"
        }

        fn record(&mut self, _index: u64, _sample: &Sample) -> Result<()> {
            Err(MonitorError::Sink { sink: "broken", message: "read-only".to_string() })
        }

        fn flush(&mut self) -> Result<()> {
            self.flushed = true;
            Err(MonitorError::Sink { sink: "broken", message: "read-only".to_string() })
        }
    }

    fn sample(t: f64) -> Sample {
        Sample::new(t, 1.0, 2.0, 3.0, 4.0)
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        sink.record(1, &sample(0.0)).unwrap();
        sink.record(2, &sample(0.2)).unwrap();

        let times: Vec<f64> = sink.samples().map(Sample::elapsed_seconds).collect();
        assert_eq!(times, vec![0.0, 0.2]);
        assert_eq!(sink.records()[1].0, 2);
        assert!(!sink.is_flushed());

        sink.flush().unwrap();
        assert!(sink.is_flushed());
    }

    #[test]
    fn test_sink_set_fans_out() {
        let mut set = SinkSet::new();
        set.push(MemorySink::new());
        set.push(MemorySink::new());

        set.record(1, &sample(0.0)).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.flush().is_ok());
    }

    #[test]
    fn test_sink_set_record_error_propagates() {
        let mut set = SinkSet::new();
        set.push(BrokenSink { flushed: false });

        assert!(matches!(set.record(1, &sample(0.0)), Err(MonitorError::Sink { .. })));
    }

    #[test]
    fn test_sink_set_flushes_all_and_reports_first_error() {
        let mut set = SinkSet::new();
        set.push(BrokenSink { flushed: false });
        set.push(MemorySink::new());

        assert!(set.flush().is_err());
    }

    #[test]
    fn test_empty_sink_set() {
        let mut set = SinkSet::new();
        assert!(set.is_empty());
        assert!(set.record(1, &sample(0.0)).is_ok());
        assert!(set.flush().is_ok());
    }

    #[test]
    fn test_boxed_sink_delegates() {
        let mut sink: BoxedSink = Box::new(MemorySink::new());
        assert_eq!(sink.id(), "memory");
        assert!(sink.record(1, &sample(0.0)).is_ok());
    }
}
