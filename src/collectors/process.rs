//! CPU and resident-memory source backed by OS process accounting.
//!
//! Uses `sysinfo` so the same code path serves Linux, macOS and Windows.
//! Only the target pid is refreshed on each read.

use crate::error::{MonitorError, Result};
use crate::types::{MetricSource, Reading, BYTES_PER_MB};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Reads CPU percent and RSS for a single process.
///
/// CPU percent is measured between consecutive reads, so the first read for
/// a pid reports `0.0`. Values above 100 mean more than one core is busy.
///
/// sysinfo only recomputes CPU usage once [`sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`]
/// has passed since the previous refresh (200 ms on Linux). At the default
/// 100 ms poll consecutive readings can repeat the same CPU value. RSS is
/// fresh on every read.
pub struct ProcessAccountingSource {
    system: System,
}

impl ProcessAccountingSource {
    /// Creates a new source.
    #[must_use]
    pub fn new() -> Self {
        Self { system: System::new() }
    }

    fn refresh(&mut self, pid: Pid) {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );
    }
}

impl Default for ProcessAccountingSource {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProcessAccountingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessAccountingSource").finish_non_exhaustive()
    }
}

impl MetricSource for ProcessAccountingSource {
    fn id(&self) -> &'static str {
        "process"
    }

    fn read(&mut self, pid: u32) -> Result<Reading> {
        let pid = Pid::from_u32(pid);
        self.refresh(pid);

        let process = self
            .system
            .process(pid)
            .ok_or_else(|| MonitorError::ProcessNotFound(pid.as_u32()))?;

        Ok(Reading {
            cpu_percent: Some(f64::from(process.cpu_usage())),
            ram_megabytes: Some(process.memory() as f64 / BYTES_PER_MB),
            ..Reading::default()
        })
    }

    fn is_available(&self) -> bool {
        sysinfo::IS_SUPPORTED_SYSTEM
    }

    fn display_name(&self) -> &'static str {
        "Process accounting"
    }
}
