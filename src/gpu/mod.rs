//! GPU detection
//!
//! Provides:
//! - GPU capability reports (properties, memory heaps, extensions, features)
//! - A driver seam with a Vulkan backend and a scripted mock
//! - Explicit device selection policy

mod driver;
pub mod mock;
#[cfg(feature = "vulkan")]
mod vulkan;

pub use driver::*;
#[cfg(feature = "vulkan")]
pub use vulkan::{VulkanDriver, VulkanInstance};

use std::str::FromStr;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::config::GpuSettings;
use crate::error::{Error, Result};
use crate::format::{decode_version, format_bytes};

/// Driver used by [`detect_gpu`]
#[cfg(feature = "vulkan")]
pub type DefaultDriver = VulkanDriver;

/// Driver used by [`detect_gpu`]
#[cfg(not(feature = "vulkan"))]
pub type DefaultDriver = UnavailableDriver;

// ─────────────────────────────────────────────────────────────────
// GPU Vendor Identification
// ─────────────────────────────────────────────────────────────────

/// Known GPU vendors identified by PCI (or Khronos) vendor ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Amd,
    Nvidia,
    Intel,
    Apple,
    Arm,
    Qualcomm,
    Imagination,
    Unknown(u32),
}

impl GpuVendor {
    pub const AMD_VENDOR_ID: u32 = 0x1002;
    pub const NVIDIA_VENDOR_ID: u32 = 0x10DE;
    pub const INTEL_VENDOR_ID: u32 = 0x8086;
    pub const APPLE_VENDOR_ID: u32 = 0x106B;
    pub const ARM_VENDOR_ID: u32 = 0x13B5;
    pub const QUALCOMM_VENDOR_ID: u32 = 0x5143;
    pub const IMAGINATION_VENDOR_ID: u32 = 0x1010;

    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            Self::AMD_VENDOR_ID => GpuVendor::Amd,
            Self::NVIDIA_VENDOR_ID => GpuVendor::Nvidia,
            Self::INTEL_VENDOR_ID => GpuVendor::Intel,
            Self::APPLE_VENDOR_ID => GpuVendor::Apple,
            Self::ARM_VENDOR_ID => GpuVendor::Arm,
            Self::QUALCOMM_VENDOR_ID => GpuVendor::Qualcomm,
            Self::IMAGINATION_VENDOR_ID => GpuVendor::Imagination,
            other => GpuVendor::Unknown(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GpuVendor::Amd => "AMD",
            GpuVendor::Nvidia => "NVIDIA",
            GpuVendor::Intel => "Intel",
            GpuVendor::Apple => "Apple",
            GpuVendor::Arm => "ARM",
            GpuVendor::Qualcomm => "Qualcomm",
            GpuVendor::Imagination => "Imagination",
            GpuVendor::Unknown(_) => "Unknown",
        }
    }
}

impl std::fmt::Display for GpuVendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ─────────────────────────────────────────────────────────────────
// Report Types
// ─────────────────────────────────────────────────────────────────

/// Physical device category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalDeviceType {
    #[serde(rename = "IntegratedGPU")]
    IntegratedGpu,
    #[serde(rename = "DiscreteGPU")]
    DiscreteGpu,
    #[serde(rename = "VirtualGPU")]
    VirtualGpu,
    #[serde(rename = "CPU")]
    Cpu,
    Other,
}

impl PhysicalDeviceType {
    /// Map a raw `VkPhysicalDeviceType`. Total: undefined values are `Other`.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => PhysicalDeviceType::IntegratedGpu,
            2 => PhysicalDeviceType::DiscreteGpu,
            3 => PhysicalDeviceType::VirtualGpu,
            4 => PhysicalDeviceType::Cpu,
            _ => PhysicalDeviceType::Other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PhysicalDeviceType::IntegratedGpu => "IntegratedGPU",
            PhysicalDeviceType::DiscreteGpu => "DiscreteGPU",
            PhysicalDeviceType::VirtualGpu => "VirtualGPU",
            PhysicalDeviceType::Cpu => "CPU",
            PhysicalDeviceType::Other => "Other",
        }
    }
}

impl std::fmt::Display for PhysicalDeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PhysicalDeviceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['_', '-', ' '], "").as_str() {
            "integrated" | "integratedgpu" => Ok(PhysicalDeviceType::IntegratedGpu),
            "discrete" | "discretegpu" => Ok(PhysicalDeviceType::DiscreteGpu),
            "virtual" | "virtualgpu" => Ok(PhysicalDeviceType::VirtualGpu),
            "cpu" => Ok(PhysicalDeviceType::Cpu),
            "other" => Ok(PhysicalDeviceType::Other),
            _ => Err(Error::config_field_invalid(
                "gpu.prefer_device_types",
                format!("Unknown device type '{}'", s),
            )),
        }
    }
}

/// Named memory heap capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeapFlag {
    DeviceLocal,
    MultiInstance,
}

impl HeapFlag {
    /// `VK_MEMORY_HEAP_DEVICE_LOCAL_BIT`
    pub const DEVICE_LOCAL_BIT: u32 = 0x1;
    /// `VK_MEMORY_HEAP_MULTI_INSTANCE_BIT`
    pub const MULTI_INSTANCE_BIT: u32 = 0x2;

    /// Named flags present in `bits`; unrecognised bits are dropped
    pub fn from_bits(bits: u32) -> Vec<HeapFlag> {
        [
            (Self::DEVICE_LOCAL_BIT, HeapFlag::DeviceLocal),
            (Self::MULTI_INSTANCE_BIT, HeapFlag::MultiInstance),
        ]
        .into_iter()
        .filter(|(bit, _)| bits & bit != 0)
        .map(|(_, flag)| flag)
        .collect()
    }
}

/// One memory heap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryHeap {
    /// Size in bytes
    pub size: u64,
    pub flags: Vec<HeapFlag>,
}

/// Core device features reported to the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceFeatures {
    pub geometry_shader: bool,
    pub tessellation_shader: bool,
    pub multi_viewport: bool,
    #[serde(rename = "textureCompressionETC2")]
    pub texture_compression_etc2: bool,
    #[serde(rename = "textureCompressionASTC_LDR")]
    pub texture_compression_astc_ldr: bool,
    #[serde(rename = "textureCompressionBC")]
    pub texture_compression_bc: bool,
    pub sparse_binding: bool,
    pub variable_multisample_rate: bool,
}

/// Everything reported about the selected device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuDetails {
    pub api_version: String,
    pub driver_version: String,
    pub physical_device_name: String,
    pub physical_device_type: PhysicalDeviceType,
    pub vendor_id: u32,
    pub memory_heaps: Vec<MemoryHeap>,
    pub device_extensions: Vec<String>,
    pub features: DeviceFeatures,
}

/// GPU capability report; exactly one shape per probe call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuReport {
    /// No usable driver
    Unsupported { error: String },
    /// Driver present, no devices
    NoDevice { error: String },
    /// A device was found and queried
    Full(GpuDetails),
}

impl GpuReport {
    pub fn unsupported(error: impl Into<String>) -> Self {
        GpuReport::Unsupported { error: error.into() }
    }

    pub fn no_device(error: impl Into<String>) -> Self {
        GpuReport::NoDevice { error: error.into() }
    }

    /// `false` only for the unsupported shape
    pub fn is_supported(&self) -> bool {
        !matches!(self, GpuReport::Unsupported { .. })
    }

    /// Degradation message, absent for a full report
    pub fn error(&self) -> Option<&str> {
        match self {
            GpuReport::Unsupported { error } | GpuReport::NoDevice { error } => Some(error),
            GpuReport::Full(_) => None,
        }
    }

    pub fn details(&self) -> Option<&GpuDetails> {
        match self {
            GpuReport::Full(details) => Some(details),
            _ => None,
        }
    }
}

impl Serialize for GpuReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            GpuReport::Unsupported { error } | GpuReport::NoDevice { error } => {
                let mut state = serializer.serialize_struct("GpuReport", 2)?;
                state.serialize_field("supported", &self.is_supported())?;
                state.serialize_field("error", error)?;
                state.end()
            }
            GpuReport::Full(details) => {
                let mut state = serializer.serialize_struct("GpuReport", 9)?;
                state.serialize_field("supported", &true)?;
                state.serialize_field("apiVersion", &details.api_version)?;
                state.serialize_field("driverVersion", &details.driver_version)?;
                state.serialize_field("physicalDeviceName", &details.physical_device_name)?;
                state.serialize_field("physicalDeviceType", &details.physical_device_type)?;
                state.serialize_field("vendorId", &details.vendor_id)?;
                state.serialize_field("memoryHeaps", &details.memory_heaps)?;
                state.serialize_field("deviceExtensions", &details.device_extensions)?;
                state.serialize_field("features", &details.features)?;
                state.end()
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Device Selection
// ─────────────────────────────────────────────────────────────────

/// Which enumerated device the probe reports on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeviceSelection {
    /// First device in driver order, no ranking
    #[default]
    First,
    /// First device matching the earliest listed type; index 0 if none match
    PreferTypes(Vec<PhysicalDeviceType>),
}

impl DeviceSelection {
    /// Build a policy from configured type names (empty list = `First`)
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Ok(DeviceSelection::First);
        }
        let types = names
            .iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<PhysicalDeviceType>>>()?;
        Ok(DeviceSelection::PreferTypes(types))
    }

    /// Pick one of `devices`. `device_type` is only consulted by `PreferTypes`.
    pub fn select<T, F>(&self, devices: &[T], device_type: F) -> Option<T>
    where
        T: Copy,
        F: Fn(T) -> PhysicalDeviceType,
    {
        let first = devices.first().copied();
        match self {
            DeviceSelection::First => first,
            DeviceSelection::PreferTypes(preferred) => {
                let types: Vec<PhysicalDeviceType> = devices.iter().map(|&d| device_type(d)).collect();
                preferred
                    .iter()
                    .find_map(|wanted| types.iter().position(|t| t == wanted))
                    .map(|index| devices[index])
                    .or(first)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Detection
// ─────────────────────────────────────────────────────────────────

/// GPU probe over a driver
pub struct GpuProbe<D> {
    driver: D,
    request: InstanceRequest,
    selection: DeviceSelection,
}

impl<D: GpuDriver> GpuProbe<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            request: InstanceRequest::default(),
            selection: DeviceSelection::default(),
        }
    }

    pub fn with_selection(mut self, selection: DeviceSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.request.application_name = name.into();
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Assemble a report. The driver instance lives only inside this call and
    /// is dropped on every return path.
    pub fn probe(&self) -> GpuReport {
        let driver_name = self.driver.name();

        let instance = match self.driver.create_instance(&self.request) {
            Ok(instance) => instance,
            Err(e) => {
                warn!(error = %e.format_for_log(), "GPU driver instance unavailable");
                return GpuReport::unsupported(format!("Failed to create {} instance", driver_name));
            }
        };

        let devices = instance.enumerate_devices().unwrap_or_else(|e| {
            warn!(error = %e.format_for_log(), "Physical device enumeration failed");
            Vec::new()
        });
        debug!(count = devices.len(), "Enumerated physical devices");

        let selected = self.selection.select(&devices, |device| {
            PhysicalDeviceType::from_raw(instance.properties(device).device_type)
        });

        let Some(device) = selected else {
            info!("No GPU devices found");
            return GpuReport::no_device(format!("No {} devices found", driver_name));
        };

        let details = query_device(&instance, device);
        info!(
            device = %details.physical_device_name,
            vendor = %GpuVendor::from_vendor_id(details.vendor_id),
            device_type = %details.physical_device_type,
            api = %details.api_version,
            driver = %details.driver_version,
            extensions = details.device_extensions.len(),
            "GPU probe complete"
        );

        GpuReport::Full(details)
    }
}

/// Query every reported attribute of one device
fn query_device<I: DriverInstance>(instance: &I, device: I::Device) -> GpuDetails {
    let properties = instance.properties(device);

    let memory_heaps: Vec<MemoryHeap> = instance
        .memory_heaps(device)
        .into_iter()
        .map(|heap| MemoryHeap {
            size: heap.size,
            flags: HeapFlag::from_bits(heap.flags),
        })
        .collect();
    for (index, heap) in memory_heaps.iter().enumerate() {
        debug!(index, size = %format_bytes(heap.size), flags = ?heap.flags, "Memory heap");
    }

    let device_extensions = instance.device_extensions(device).unwrap_or_else(|e| {
        warn!(error = %e.format_for_log(), "Device extension enumeration failed");
        Vec::new()
    });

    GpuDetails {
        api_version: decode_version(properties.api_version),
        driver_version: decode_version(properties.driver_version),
        physical_device_name: properties.name,
        physical_device_type: PhysicalDeviceType::from_raw(properties.device_type),
        vendor_id: properties.vendor_id,
        memory_heaps,
        device_extensions,
        features: instance.features(device),
    }
}

/// Probe the GPU through the default driver with default settings
pub fn detect_gpu() -> GpuReport {
    GpuProbe::new(DefaultDriver::default()).probe()
}

/// Probe the GPU honouring configuration
pub fn detect_gpu_with(settings: &GpuSettings) -> GpuReport {
    if !settings.enable {
        info!("GPU probing disabled by configuration");
        return GpuReport::unsupported("GPU probing disabled");
    }

    let selection = settings.selection().unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring invalid device preference");
        DeviceSelection::First
    });

    GpuProbe::new(DefaultDriver::default())
        .with_application_name(settings.application_name.clone())
        .with_selection(selection)
        .probe()
}
