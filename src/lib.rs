//! # perfwatch
//!
//! Resource monitor for a single process: CPU, resident memory, GPU compute
//! share and GPU memory, sampled over the process lifetime.
//!
//! Polls are frequent (100 ms) but only a time-bucketed subset is persisted:
//! every 0.1 s for the first ten seconds, then every second, every minute,
//! every five minutes and finally every ten minutes. A short run gets a
//! detailed curve and a long run stays small.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use perfwatch::prelude::*;
//!
//! let spec = LaunchSpec::from_args(&["python", "train.py"])?;
//! let handle = ProcessHandle::resolve(&spec)?;
//!
//! let mut sampler = Sampler::empty();
//! sampler.push(ProcessAccountingSource::new());
//!
//! let sink = CsvSink::create("Performance.csv")?;
//! let report = Monitor::new(handle, SystemClock::start(), sampler, sink).run()?;
//! println!("{report}");
//! ```
//!
//! ## Feature Flags
//!
//! - `nvidia`: GPU share and VRAM through NVML (default)
//! - `live`: scrolling terminal table of persisted samples (default)

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only - banned in production code
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Error Types
// ============================================================================

pub mod error;
pub use error::{MonitorError, Result};

// ============================================================================
// Core Types
// ============================================================================

pub mod ring_buffer;
pub mod types;

// ============================================================================
// Sampling Core
// ============================================================================

pub mod scheduler;

pub mod aggregator;

pub mod state;

pub mod sampler;

pub mod collectors;

// ============================================================================
// Target and Loop
// ============================================================================

pub mod clock;
pub mod handle;
pub mod monitor;
pub mod signal;

// ============================================================================
// Output
// ============================================================================

pub mod sink;

// ============================================================================
// Configuration
// ============================================================================

pub mod config;

/// Common imports for driving a monitor.
pub mod prelude {
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::collectors::ProcessAccountingSource;
    pub use crate::config::Config;
    pub use crate::error::{MonitorError, Result};
    pub use crate::handle::{LaunchSpec, Liveness, LivenessCheck, ProcessHandle};
    pub use crate::monitor::{ExitReason, Monitor, Phase, Report};
    pub use crate::sampler::Sampler;
    pub use crate::signal::StopSignal;
    pub use crate::sink::{CsvSink, MemorySink, RecordSink, SinkSet};
    pub use crate::state::{AggregationPolicy, MonitorState};
    pub use crate::types::{Averages, MetricSource, Reading, Sample};

    #[cfg(feature = "nvidia")]
    pub use crate::collectors::NvidiaGpuSource;

    #[cfg(feature = "live")]
    pub use crate::sink::{LiveTable, LiveTableSink};
}
