//! Metric sources for the target process.
//!
//! - **Process accounting**: CPU percent and resident memory (all platforms)
//! - **GPU**: per-process device memory on NVIDIA devices via NVML

pub mod gpu;
pub mod process;

pub use gpu::{process_share, GpuProcessUsage};
pub use process::ProcessAccountingSource;

// GPU sources (feature-gated)
#[cfg(feature = "nvidia")]
#[cfg_attr(docsrs, doc(cfg(feature = "nvidia")))]
pub mod gpu_nvidia;

#[cfg(feature = "nvidia")]
pub use gpu_nvidia::NvidiaGpuSource;
