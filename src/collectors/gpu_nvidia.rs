//! NVIDIA GPU source via NVML.
//!
//! Binds to one device for the lifetime of the run and attributes usage to
//! the target by matching its pid against the device's running compute
//! processes. See [`super::gpu`] for the meaning of the GPU percent column.
//!
//! ## Feature Flag
//!
//! Requires the `nvidia` feature.

use super::gpu::{process_share, GpuProcessUsage};
use crate::error::{MonitorError, Result};
use crate::types::{MetricSource, Reading};
use nvml_wrapper::enums::device::UsedGpuMemory;
use nvml_wrapper::Nvml;
use tracing::{debug, warn};

/// Source for per-process GPU memory on one NVIDIA device.
#[derive(Debug)]
pub struct NvidiaGpuSource {
    /// NVML instance, `None` when the driver could not be loaded.
    nvml: Option<Nvml>,
    /// Index of the bound device.
    device_index: u32,
    /// Total device memory in bytes, read once at startup.
    total_memory: u64,
}

impl NvidiaGpuSource {
    /// Binds to `device_index`, failing if NVML or the device is unavailable.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Gpu`] if NVML cannot be initialized or the
    /// device cannot be opened.
    pub fn open(device_index: u32) -> Result<Self> {
        let nvml = Nvml::init().map_err(|e| MonitorError::Gpu(format!("NVML init failed: {e}")))?;
        let total_memory = nvml
            .device_by_index(device_index)
            .and_then(|device| device.memory_info())
            .map(|m| m.total)
            .map_err(|e| MonitorError::Gpu(format!("GPU {device_index} unavailable: {e}")))?;

        debug!(device_index, total_memory, "bound NVIDIA device");
        Ok(Self { nvml: Some(nvml), device_index, total_memory })
    }

    /// Binds to `device_index`, degrading to an unavailable source on failure.
    #[must_use]
    pub fn new(device_index: u32) -> Self {
        Self::open(device_index).unwrap_or_else(|e| {
            warn!("GPU accounting disabled: {e}");
            Self { nvml: None, device_index, total_memory: 0 }
        })
    }

    /// Index of the bound device.
    #[must_use]
    pub fn device_index(&self) -> u32 {
        self.device_index
    }

    /// Total memory of the bound device in bytes (0 when unavailable).
    #[must_use]
    pub fn total_memory(&self) -> u64 {
        self.total_memory
    }

    fn compute_processes(&self) -> Result<Vec<GpuProcessUsage>> {
        let nvml = self.nvml.as_ref().ok_or(MonitorError::CollectorUnavailable("nvidia_gpu"))?;

        let device = nvml.device_by_index(self.device_index).map_err(|e| {
            MonitorError::CollectionFailed {
                collector: "nvidia_gpu",
                message: format!("Failed to get GPU {}: {e}", self.device_index),
            }
        })?;

        let processes = device.running_compute_processes().map_err(|e| {
            MonitorError::CollectionFailed {
                collector: "nvidia_gpu",
                message: format!("Failed to list compute processes: {e}"),
            }
        })?;

        Ok(processes
            .into_iter()
            .map(|p| GpuProcessUsage {
                pid: p.pid,
                used_bytes: match p.used_gpu_memory {
                    UsedGpuMemory::Used(bytes) => Some(bytes),
                    UsedGpuMemory::Unavailable => None,
                },
            })
            .collect())
    }
}

impl MetricSource for NvidiaGpuSource {
    fn id(&self) -> &'static str {
        "nvidia_gpu"
    }

    fn read(&mut self, pid: u32) -> Result<Reading> {
        let processes = self.compute_processes()?;
        Ok(process_share(&processes, pid, self.total_memory))
    }

    fn is_available(&self) -> bool {
        self.nvml.is_some()
    }

    fn display_name(&self) -> &'static str {
        "NVIDIA GPU"
    }
}
