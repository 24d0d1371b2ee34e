//! Core types shared by the sampler, the aggregator and the sinks.
//!
//! - [`Reading`]: a partial, unnormalized result from one [`MetricSource`]
//! - [`Sample`]: one normalized observation of all four metrics
//! - [`Averages`]: arithmetic means over a run
//! - [`MetricSource`]: trait for per-process metric families

use super::error::Result;
use std::fmt;

/// Column headers of the tabular record, in order.
pub const COLUMNS: [&str; 5] = ["Time (s)", "CPU (%)", "RAM (MB)", "GPU (%)", "VRAM (MB)"];

/// Bytes per megabyte as reported in the record (2^20).
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Clamps a raw reading to a valid metric value.
///
/// Missing, negative and non-finite readings all become `0.0`.
#[must_use]
pub fn normalize(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

/// Raw values reported by one metric source for one poll.
///
/// Each source fills only the fields of its own family and leaves the rest
/// as `None`. Readings from several sources are combined with [`Reading::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reading {
    /// CPU usage percent (may exceed 100 on multi-core hosts).
    pub cpu_percent: Option<f64>,
    /// Resident memory in megabytes.
    pub ram_megabytes: Option<f64>,
    /// GPU percent (memory-share proxy, see [`crate::collectors`]).
    pub gpu_percent: Option<f64>,
    /// GPU memory in megabytes.
    pub vram_megabytes: Option<f64>,
}

impl Reading {
    /// Combines two readings; fields already set in `self` win.
    #[must_use]
    pub fn merge(self, other: Reading) -> Reading {
        Reading {
            cpu_percent: self.cpu_percent.or(other.cpu_percent),
            ram_megabytes: self.ram_megabytes.or(other.ram_megabytes),
            gpu_percent: self.gpu_percent.or(other.gpu_percent),
            vram_megabytes: self.vram_megabytes.or(other.vram_megabytes),
        }
    }
}

/// A single normalized observation, tagged with elapsed time.
///
/// Fields are private so a `Sample` can only be built through
/// [`Sample::new`] or [`Sample::from_reading`], which both normalize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    elapsed_seconds: f64,
    cpu_percent: f64,
    ram_megabytes: f64,
    gpu_percent: f64,
    vram_megabytes: f64,
}

impl Sample {
    /// Creates a sample, clamping every field to a non-negative finite value.
    #[must_use]
    pub fn new(
        elapsed_seconds: f64,
        cpu_percent: f64,
        ram_megabytes: f64,
        gpu_percent: f64,
        vram_megabytes: f64,
    ) -> Self {
        Self {
            elapsed_seconds: normalize(Some(elapsed_seconds)),
            cpu_percent: normalize(Some(cpu_percent)),
            ram_megabytes: normalize(Some(ram_megabytes)),
            gpu_percent: normalize(Some(gpu_percent)),
            vram_megabytes: normalize(Some(vram_megabytes)),
        }
    }

    /// Builds a sample from a merged reading; missing fields become zero.
    #[must_use]
    pub fn from_reading(elapsed_seconds: f64, reading: Reading) -> Self {
        Self {
            elapsed_seconds: normalize(Some(elapsed_seconds)),
            cpu_percent: normalize(reading.cpu_percent),
            ram_megabytes: normalize(reading.ram_megabytes),
            gpu_percent: normalize(reading.gpu_percent),
            vram_megabytes: normalize(reading.vram_megabytes),
        }
    }

    /// Seconds since monitoring started.
    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    /// CPU usage percent.
    #[must_use]
    pub fn cpu_percent(&self) -> f64 {
        self.cpu_percent
    }

    /// Resident memory in megabytes.
    #[must_use]
    pub fn ram_megabytes(&self) -> f64 {
        self.ram_megabytes
    }

    /// GPU percent (memory-share proxy).
    #[must_use]
    pub fn gpu_percent(&self) -> f64 {
        self.gpu_percent
    }

    /// GPU memory in megabytes.
    #[must_use]
    pub fn vram_megabytes(&self) -> f64 {
        self.vram_megabytes
    }

    /// The sample as a record row, each column rounded to three decimals.
    #[must_use]
    pub fn row(&self) -> [String; 5] {
        [
            format!("{:.3}", self.elapsed_seconds),
            format!("{:.3}", self.cpu_percent),
            format!("{:.3}", self.ram_megabytes),
            format!("{:.3}", self.gpu_percent),
            format!("{:.3}", self.vram_megabytes),
        ]
    }
}

/// Mean of each metric over the accumulated samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Averages {
    /// Mean CPU percent.
    pub cpu: f64,
    /// Mean resident memory in megabytes.
    pub ram: f64,
    /// Mean GPU percent.
    pub gpu: f64,
    /// Mean GPU memory in megabytes.
    pub vram: f64,
}

impl fmt::Display for Averages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Average CPU: {:.3}% | Average RAM: {:.3}MB | Average GPU: {:.3}% | Average VRAM: {:.3}MB",
            self.cpu, self.ram, self.gpu, self.vram
        )
    }
}

/// A source of per-process metrics, one implementation per metric family.
///
/// Sources are polled once per cycle by the [`Sampler`](crate::sampler::Sampler).
/// An `Err` from [`read`](MetricSource::read) is a per-sample failure: the
/// sampler logs it and reports the source's fields as zero.
pub trait MetricSource {
    /// Returns the unique identifier for this source.
    fn id(&self) -> &'static str;

    /// Reads the current values for `pid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the accounting backend could not answer, e.g. the
    /// process exited between the liveness check and this read.
    fn read(&mut self, pid: u32) -> Result<Reading>;

    /// Returns true if this source can produce readings on this system.
    fn is_available(&self) -> bool;

    /// Returns a human-readable name for this source.
    fn display_name(&self) -> &'static str {
        self.id()
    }
}

/// A boxed source for dynamic dispatch.
pub type BoxedSource = Box<dyn MetricSource + Send>;
