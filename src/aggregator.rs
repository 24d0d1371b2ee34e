//! Running averages over a run.

use crate::types::{Averages, Sample};

/// Running sums and count of accumulated samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregator {
    total_cpu: f64,
    total_ram: f64,
    total_gpu: f64,
    total_vram: f64,
    count: u64,
}

impl Aggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sample's four metrics to the running sums.
    pub fn accumulate(&mut self, sample: &Sample) {
        self.total_cpu += sample.cpu_percent();
        self.total_ram += sample.ram_megabytes();
        self.total_gpu += sample.gpu_percent();
        self.total_vram += sample.vram_megabytes();
        self.count += 1;
    }

    /// Number of accumulated samples.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean per metric, or all zeros when nothing has been accumulated.
    #[must_use]
    pub fn averages(&self) -> Averages {
        if self.count == 0 {
            return Averages::default();
        }
        let n = self.count as f64;
        Averages {
            cpu: self.total_cpu / n,
            ram: self.total_ram / n,
            gpu: self.total_gpu / n,
            vram: self.total_vram / n,
        }
    }
}
