//! Configuration.
//!
//! YAML with precedence: CLI > file > defaults. Every key has a serde default,
//! so a partial file (or none at all) is valid.

use crate::error::{MonitorError, Result};
use crate::state::AggregationPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Highest configuration schema version understood by this build.
pub const CONFIG_VERSION: u32 = 1;

/// GPU accounting settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuConfig {
    /// Query the GPU at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// NVML device index to sample.
    #[serde(default)]
    pub device_index: u32,

    /// Fail at startup instead of reading zeros when the GPU cannot be opened.
    #[serde(default)]
    pub required: bool,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self { enabled: true, device_index: 0, required: false }
    }
}

/// Live table settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Show the live table.
    #[serde(default)]
    pub enabled: bool,

    /// Rows kept for the table. Older rows remain in the durable record.
    #[serde(default = "default_history_rows")]
    pub history_rows: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self { enabled: false, history_rows: default_history_rows() }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Poll period in milliseconds.
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,

    /// Durable record path.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Which samples feed the averages.
    #[serde(default)]
    pub aggregate: AggregationPolicy,

    /// GPU accounting.
    #[serde(default)]
    pub gpu: GpuConfig,

    /// Live table.
    #[serde(default)]
    pub live: LiveConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_poll_ms() -> u64 {
    100
}
fn default_output() -> PathBuf {
    PathBuf::from("Performance.csv")
}
fn default_history_rows() -> usize {
    1000
}
fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            poll_ms: default_poll_ms(),
            output: default_output(),
            aggregate: AggregationPolicy::default(),
            gpu: GpuConfig::default(),
            live: LiveConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default file location: `<config dir>/perfwatch/config.yaml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("perfwatch").join("config.yaml"))
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| MonitorError::ConfigNotFound(path.display().to_string()))?;

        Self::parse(&content)
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error with line number if parsing fails.
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(yaml).map_err(|e| {
            let line = e.location().map_or(0, |l| l.line());
            MonitorError::ConfigParse { line, message: e.to_string() }
        })
    }

    /// Resolves the configuration for a run.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used if present and defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing or any file is malformed.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => {
                debug!(path = %path.display(), "loading configuration");
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(invalid("version", format!("unsupported version {}", self.version)));
        }
        if self.poll_ms == 0 {
            return Err(invalid("poll_ms", "must be greater than 0"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(invalid("output", "must not be empty"));
        }
        if self.live.history_rows == 0 {
            return Err(invalid("live.history_rows", "must be greater than 0"));
        }
        Ok(())
    }

    /// Returns the poll period as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

fn invalid(key: &str, message: impl Into<String>) -> MonitorError {
    MonitorError::ConfigInvalid { key: key.to_string(), message: message.into() }
}
