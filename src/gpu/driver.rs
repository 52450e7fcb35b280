//! Graphics driver seam
//!
//! A driver creates instances; an instance enumerates and queries physical
//! devices and releases its driver handle when dropped. Holding the instance
//! by value is what ties teardown to every exit path of a probe.

use crate::error::{Error, Result};

use super::DeviceFeatures;

/// Baseline API version requested at instance creation (1.0.0)
pub const BASELINE_API_VERSION: u32 = 1 << 22;

/// Parameters for instance creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRequest {
    pub application_name: String,
    /// Packed API version
    pub api_version: u32,
}

impl Default for InstanceRequest {
    fn default() -> Self {
        Self {
            application_name: env!("CARGO_PKG_NAME").to_string(),
            api_version: BASELINE_API_VERSION,
        }
    }
}

/// Static properties of a physical device, as raw driver values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProperties {
    pub name: String,
    pub vendor_id: u32,
    pub device_id: u32,
    /// Raw `VkPhysicalDeviceType` value
    pub device_type: i32,
    /// Packed driver version (vendor-encoded)
    pub driver_version: u32,
    /// Packed API version supported by the device
    pub api_version: u32,
}

/// One memory heap as reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMemoryHeap {
    pub size: u64,
    /// Raw `VkMemoryHeapFlags` bits
    pub flags: u32,
}

/// Entry point into a graphics driver
pub trait GpuDriver {
    type Instance: DriverInstance;

    /// Driver family name used in report messages ("Vulkan")
    fn name(&self) -> &'static str;

    /// Create a connection to the driver. The returned instance owns the
    /// driver handle and releases it on drop.
    fn create_instance(&self, request: &InstanceRequest) -> Result<Self::Instance>;
}

/// A live driver connection
pub trait DriverInstance {
    /// Handle for a physical device, valid while the instance lives
    type Device: Copy;

    /// Physical devices in driver order
    fn enumerate_devices(&self) -> Result<Vec<Self::Device>>;

    fn properties(&self, device: Self::Device) -> DeviceProperties;

    /// Memory heaps, bounded by the heap count the driver reports
    fn memory_heaps(&self, device: Self::Device) -> Vec<RawMemoryHeap>;

    fn features(&self, device: Self::Device) -> DeviceFeatures;

    /// Names of supported device extensions, in driver order
    fn device_extensions(&self, device: Self::Device) -> Result<Vec<String>>;
}

// ─────────────────────────────────────────────────────────────────
// Unavailable Driver
// ─────────────────────────────────────────────────────────────────

/// Driver used when this build carries no GPU backend; creation always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableDriver;

/// Instance type of [`UnavailableDriver`]; it can never be constructed.
#[derive(Debug)]
pub enum NoInstance {}

impl GpuDriver for UnavailableDriver {
    type Instance = NoInstance;

    fn name(&self) -> &'static str {
        "Vulkan"
    }

    fn create_instance(&self, _request: &InstanceRequest) -> Result<NoInstance> {
        Err(Error::NotSupported(
            "GPU probing is not compiled into this build".to_string(),
        ))
    }
}

impl DriverInstance for NoInstance {
    type Device = ();

    fn enumerate_devices(&self) -> Result<Vec<()>> {
        match *self {}
    }

    fn properties(&self, _device: ()) -> DeviceProperties {
        match *self {}
    }

    fn memory_heaps(&self, _device: ()) -> Vec<RawMemoryHeap> {
        match *self {}
    }

    fn features(&self, _device: ()) -> DeviceFeatures {
        match *self {}
    }

    fn device_extensions(&self, _device: ()) -> Result<Vec<String>> {
        match *self {}
    }
}
