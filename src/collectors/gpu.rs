//! Per-process GPU attribution shared by the GPU sources.
//!
//! "GPU percent" here is a memory-share proxy: the fraction of total device
//! memory held by the target process. It is not SM occupancy and will read
//! low for compute-heavy kernels with a small footprint.

use crate::types::{Reading, BYTES_PER_MB};

/// One compute process as reported by the GPU driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuProcessUsage {
    /// Process id.
    pub pid: u32,
    /// Device memory held by the process, if the driver exposes it.
    pub used_bytes: Option<u64>,
}

/// Attributes GPU usage to `pid` from the driver's compute-process list.
///
/// A pid with no entry is a process not using the GPU right now, which is a
/// valid state: both fields read `0.0`. If the driver lists the process but
/// hides its memory, both fields are left missing.
#[must_use]
pub fn process_share(processes: &[GpuProcessUsage], pid: u32, total_bytes: u64) -> Reading {
    let Some(entry) = processes.iter().find(|p| p.pid == pid) else {
        return Reading { gpu_percent: Some(0.0), vram_megabytes: Some(0.0), ..Reading::default() };
    };

    let Some(used) = entry.used_bytes else {
        return Reading::default();
    };

    let gpu_percent = (total_bytes > 0).then(|| used as f64 * 100.0 / total_bytes as f64);
    Reading {
        gpu_percent,
        vram_megabytes: Some(used as f64 / BYTES_PER_MB),
        ..Reading::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const GIB: u64 = 1024 * 1024 * 1024;

    #[test]
    fn test_matching_pid_share_of_total() {
        let procs = [
            GpuProcessUsage { pid: 10, used_bytes: Some(GIB) },
            GpuProcessUsage { pid: 42, used_bytes: Some(2 * GIB) },
        ];
        let reading = process_share(&procs, 42, 8 * GIB);

        assert_relative_eq!(reading.gpu_percent.unwrap_or_default(), 25.0);
        assert_relative_eq!(reading.vram_megabytes.unwrap_or_default(), 2048.0);
        assert!(reading.cpu_percent.is_none());
    }

    #[test]
    fn test_no_matching_pid_is_zero() {
        let procs = [GpuProcessUsage { pid: 10, used_bytes: Some(GIB) }];
        let reading = process_share(&procs, 42, 8 * GIB);

        assert_eq!(reading.gpu_percent, Some(0.0));
        assert_eq!(reading.vram_megabytes, Some(0.0));
    }

    #[test]
    fn test_empty_process_list_is_zero() {
        let reading = process_share(&[], 42, 8 * GIB);
        assert_eq!(reading.gpu_percent, Some(0.0));
    }

    #[test]
    fn test_hidden_memory_is_missing() {
        let procs = [GpuProcessUsage { pid: 42, used_bytes: None }];
        let reading = process_share(&procs, 42, 8 * GIB);

        assert!(reading.gpu_percent.is_none());
        assert!(reading.vram_megabytes.is_none());
    }

    #[test]
    fn test_zero_total_does_not_divide() {
        let procs = [GpuProcessUsage { pid: 42, used_bytes: Some(GIB) }];
        let reading = process_share(&procs, 42, 0);

        assert!(reading.gpu_percent.is_none());
        assert_relative_eq!(reading.vram_megabytes.unwrap_or_default(), 1024.0);
    }
}
