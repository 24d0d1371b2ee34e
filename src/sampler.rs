//! Builds one normalized [`Sample`] per poll from all metric sources.

use crate::types::{BoxedSource, MetricSource, Reading, Sample};
use tracing::debug;

/// Polls every available source and merges the readings.
///
/// Per-source failures stay inside the sampler: they are logged at debug
/// level and the source's fields read as zero.
pub struct Sampler {
    sources: Vec<BoxedSource>,
}

impl Sampler {
    /// Creates a sampler over the given sources.
    #[must_use]
    pub fn new(sources: Vec<BoxedSource>) -> Self {
        Self { sources }
    }

    /// Creates a sampler with no sources; every sample reads zero.
    #[must_use]
    pub fn empty() -> Self {
        Self { sources: Vec::new() }
    }

    /// Adds a source.
    pub fn push(&mut self, source: impl MetricSource + Send + 'static) {
        self.sources.push(Box::new(source));
    }

    /// Ids of the sources that are currently available.
    #[must_use]
    pub fn available_sources(&self) -> Vec<&'static str> {
        self.sources.iter().filter(|s| s.is_available()).map(|s| s.id()).collect()
    }

    /// Reads every available source for `pid` and packages the result.
    pub fn sample(&mut self, pid: u32, elapsed_seconds: f64) -> Sample {
        let mut reading = Reading::default();

        for source in self.sources.iter_mut().filter(|s| s.is_available()) {
            match source.read(pid) {
                Ok(part) => reading = reading.merge(part),
                Err(e) => debug!(source = source.id(), pid, "reading dropped: {e}"),
            }
        }

        Sample::from_reading(elapsed_seconds, reading)
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler").field("sources", &self.available_sources()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MonitorError, Result};
    use approx::assert_relative_eq;

    struct StaticSource {
        id: &'static str,
        reading: Reading,
        available: bool,
    }

    impl MetricSource for StaticSource {
        fn id(&self) -> &'static str {
            self.id
        }

        fn read(&mut self, _pid: u32) -> Result<Reading> {
            Ok(self.reading)
        }

        fn is_available(&self) -> bool {
            self.available
        }
    }

    struct FailingSource;

    impl MetricSource for FailingSource {
        fn id(&self) -> &'static str {
            "failing"
        }

        fn read(&mut self, pid: u32) -> Result<Reading> {
            Err(MonitorError::ProcessNotFound(pid))
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn cpu_ram(cpu: f64, ram: f64) -> StaticSource {
        StaticSource {
            id: "process",
            reading: Reading { cpu_percent: Some(cpu), ram_megabytes: Some(ram), ..Default::default() },
            available: true,
        }
    }

    fn gpu(share: f64, vram: f64) -> StaticSource {
        StaticSource {
            id: "gpu",
            reading: Reading { gpu_percent: Some(share), vram_megabytes: Some(vram), ..Default::default() },
            available: true,
        }
    }

    #[test]
    fn test_sample_merges_sources() {
        let mut sampler = Sampler::empty();
        sampler.push(cpu_ram(10.0, 100.0));
        sampler.push(gpu(5.0, 50.0));

        let s = sampler.sample(7, 1.5);
        assert_relative_eq!(s.elapsed_seconds(), 1.5);
        assert_relative_eq!(s.cpu_percent(), 10.0);
        assert_relative_eq!(s.ram_megabytes(), 100.0);
        assert_relative_eq!(s.gpu_percent(), 5.0);
        assert_relative_eq!(s.vram_megabytes(), 50.0);
    }

    #[test]
    fn test_failing_source_reads_zero() {
        let mut sampler = Sampler::empty();
        sampler.push(FailingSource);
        sampler.push(gpu(5.0, 50.0));

        let s = sampler.sample(7, 0.0);
        assert_eq!(s.cpu_percent(), 0.0);
        assert_eq!(s.ram_megabytes(), 0.0);
        assert_relative_eq!(s.gpu_percent(), 5.0);
    }

    #[test]
    fn test_unavailable_source_is_skipped() {
        let mut sampler = Sampler::empty();
        let mut source = gpu(5.0, 50.0);
        source.available = false;
        sampler.push(source);

        assert!(sampler.available_sources().is_empty());
        assert_eq!(sampler.sample(1, 0.0).gpu_percent(), 0.0);
    }

    #[test]
    fn test_negative_reading_is_normalized() {
        let mut sampler = Sampler::empty();
        sampler.push(cpu_ram(-4.0, f64::NAN));

        let s = sampler.sample(1, 0.0);
        assert_eq!(s.cpu_percent(), 0.0);
        assert_eq!(s.ram_megabytes(), 0.0);
    }

    #[test]
    fn test_empty_sampler_is_all_zero() {
        let mut sampler = Sampler::empty();
        let s = sampler.sample(1, 3.0);
        assert_eq!(s, Sample::new(3.0, 0.0, 0.0, 0.0, 0.0));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::error::Result;
    use proptest::prelude::*;

    struct RawSource(Reading);

    impl MetricSource for RawSource {
        fn id(&self) -> &'static str {
            "raw"
        }

        fn read(&mut self, _pid: u32) -> Result<Reading> {
            Ok(self.0)
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn raw_value() -> impl Strategy<Value = Option<f64>> {
        prop_oneof![
            Just(None),
            Just(Some(f64::NAN)),
            Just(Some(f64::NEG_INFINITY)),
            (-1e6f64..1e6).prop_map(Some),
        ]
    }

    proptest! {
        /// No sample field is ever negative or non-finite.
        #[test]
        fn prop_sample_fields_never_negative(
            cpu in raw_value(), ram in raw_value(), gpu in raw_value(), vram in raw_value(),
            elapsed in -10.0f64..1e5,
        ) {
            let mut sampler = Sampler::empty();
            sampler.push(RawSource(Reading {
                cpu_percent: cpu,
                ram_megabytes: ram,
                gpu_percent: gpu,
                vram_megabytes: vram,
            }));

            let s = sampler.sample(1, elapsed);
            for v in [s.elapsed_seconds(), s.cpu_percent(), s.ram_megabytes(), s.gpu_percent(), s.vram_megabytes()] {
                prop_assert!(v.is_finite() && v >= 0.0, "field {} out of range", v);
            }
        }
    }
}
