//! Error types for perfwatch.
//!
//! Errors fall into three groups:
//!
//! - **Startup**: invalid launch arguments, a target that cannot be spawned or
//!   opened for accounting, bad configuration. These abort before sampling.
//! - **Per-sample**: a metric source failing for one poll. These never leave
//!   the [`Sampler`](crate::sampler::Sampler); the reading is normalized to zero.
//! - **Drain**: the durable sink cannot be written after the target exited.

use std::io;
use thiserror::Error;

/// Error type for monitoring operations.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The launch arguments name neither a program nor a process id.
    #[error("invalid target: {0}")]
    InvalidLaunch(String),

    /// The target program could not be started.
    #[error("failed to start '{program}'")]
    SpawnFailed {
        /// Program that was being spawned.
        program: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// No process with this id is visible to process accounting.
    #[error("process {0} not found")]
    ProcessNotFound(u32),

    /// A metric source is not available on this system.
    #[error("collector '{0}' is not available on this system")]
    CollectorUnavailable(&'static str),

    /// Failed to read a metric from a source.
    #[error("failed to collect metrics from '{collector}': {message}")]
    CollectionFailed {
        /// The source that failed.
        collector: &'static str,
        /// Error message describing the failure.
        message: String,
    },

    /// Configuration parsing error with line number.
    #[error("configuration error at line {line}: {message}")]
    ConfigParse {
        /// Line number where the error occurred (1-indexed).
        line: usize,
        /// Error message describing the issue.
        message: String,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {0}")]
    ConfigNotFound(String),

    /// Invalid configuration value.
    #[error("invalid configuration value for '{key}': {message}")]
    ConfigInvalid {
        /// The configuration key with invalid value.
        key: String,
        /// Error message describing why the value is invalid.
        message: String,
    },

    /// A record sink rejected a write or flush.
    #[error("sink '{sink}' failed: {message}")]
    Sink {
        /// The sink that failed.
        sink: &'static str,
        /// Error message describing the failure.
        message: String,
    },

    /// CSV encoding error from the durable sink.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// File or terminal I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stop-signal handler could not be installed.
    #[error("failed to install signal handler: {0}")]
    SignalHandler(String),

    /// NVML error that could not be degraded to a zero reading.
    #[cfg(feature = "nvidia")]
    #[error("NVIDIA GPU error: {0}")]
    Gpu(String),
}

impl MonitorError {
    /// Returns true for errors that abort the monitor before sampling starts.
    #[must_use]
    pub fn is_fatal_startup(&self) -> bool {
        match self {
            Self::InvalidLaunch(_)
            | Self::SpawnFailed { .. }
            | Self::ProcessNotFound(_)
            | Self::ConfigParse { .. }
            | Self::ConfigNotFound(_)
            | Self::ConfigInvalid { .. }
            | Self::SignalHandler(_) => true,
            #[cfg(feature = "nvidia")]
            Self::Gpu(_) => true,
            _ => false,
        }
    }
}

/// Result type alias for monitoring operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
