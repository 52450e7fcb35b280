//! hwprobe - CPU and GPU capability probe
//!
//! Collects a CPU report (SoC identity, ABI, SIMD support, cache hierarchy)
//! and a GPU report (Vulkan device properties, memory heaps, extensions,
//! features) and serializes them to the JSON shapes consumed by benchmark
//! hosts.

pub mod config;
pub mod cpu;
pub mod error;
pub mod format;
pub mod gpu;
pub mod logging;
pub mod version;

use serde::Serialize;

pub use config::ProbeConfig;
pub use cpu::{detect_cpu, CpuProbe, CpuReport};
pub use error::{Error, Result};
pub use gpu::{detect_gpu, GpuProbe, GpuReport};

/// Combined CPU and GPU report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HardwareReport {
    pub cpu: CpuReport,
    pub gpu: GpuReport,
}

impl HardwareReport {
    /// Run both probes with the given configuration
    pub fn collect(config: &ProbeConfig) -> Self {
        Self {
            cpu: CpuProbe::from_settings(&config.cpu).probe(),
            gpu: gpu::detect_gpu_with(&config.gpu),
        }
    }
}
