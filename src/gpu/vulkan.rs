//! Vulkan driver backed by `ash`
//!
//! The Vulkan loader is opened at runtime, so a missing `libvulkan` surfaces
//! as an instance creation failure instead of a link error.

use std::ffi::{CStr, CString};

use ash::vk;
use tracing::debug;

use crate::error::{Error, Result};
use crate::gpu::DeviceFeatures;

use super::driver::{DeviceProperties, DriverInstance, GpuDriver, InstanceRequest, RawMemoryHeap};

/// Vulkan entry point
#[derive(Debug, Clone, Copy, Default)]
pub struct VulkanDriver;

impl VulkanDriver {
    /// Check if a Vulkan loader can be opened on this system
    pub fn is_available() -> bool {
        unsafe { ash::Entry::load().is_ok() }
    }
}

impl GpuDriver for VulkanDriver {
    type Instance = VulkanInstance;

    fn name(&self) -> &'static str {
        "Vulkan"
    }

    fn create_instance(&self, request: &InstanceRequest) -> Result<VulkanInstance> {
        let entry = unsafe {
            ash::Entry::load().map_err(|e| Error::DriverLoad {
                message: format!("Failed to load Vulkan: {}", e),
            })?
        };

        let app_name = CString::new(request.application_name.as_str())
            .unwrap_or_else(|_| CString::from(c"hwprobe"));

        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(c"hwprobe")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(request.api_version);

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info);

        let instance = unsafe {
            entry.create_instance(&create_info, None).map_err(|e| {
                Error::instance_creation(format!("vkCreateInstance returned {:?}", e))
            })?
        };

        debug!(application = %request.application_name, "Vulkan instance created");
        Ok(VulkanInstance { instance, _entry: entry })
    }
}

/// Live Vulkan instance; destroyed on drop.
///
/// Field order matters: the instance is destroyed in `Drop::drop`, then the
/// entry (and with it the loader library) is released.
pub struct VulkanInstance {
    instance: ash::Instance,
    _entry: ash::Entry,
}

impl DriverInstance for VulkanInstance {
    type Device = vk::PhysicalDevice;

    fn enumerate_devices(&self) -> Result<Vec<vk::PhysicalDevice>> {
        unsafe { self.instance.enumerate_physical_devices() }.map_err(vulkan_error)
    }

    fn properties(&self, device: vk::PhysicalDevice) -> DeviceProperties {
        let properties = unsafe { self.instance.get_physical_device_properties(device) };

        let name = unsafe {
            CStr::from_ptr(properties.device_name.as_ptr())
                .to_string_lossy()
                .to_string()
        };

        DeviceProperties {
            name,
            vendor_id: properties.vendor_id,
            device_id: properties.device_id,
            device_type: properties.device_type.as_raw(),
            driver_version: properties.driver_version,
            api_version: properties.api_version,
        }
    }

    fn memory_heaps(&self, device: vk::PhysicalDevice) -> Vec<RawMemoryHeap> {
        let memory = unsafe { self.instance.get_physical_device_memory_properties(device) };
        let count = (memory.memory_heap_count as usize).min(memory.memory_heaps.len());

        memory.memory_heaps[..count]
            .iter()
            .map(|heap| RawMemoryHeap {
                size: heap.size,
                flags: heap.flags.as_raw(),
            })
            .collect()
    }

    fn features(&self, device: vk::PhysicalDevice) -> DeviceFeatures {
        let features = unsafe { self.instance.get_physical_device_features(device) };
        let on = |flag: vk::Bool32| flag == vk::TRUE;

        DeviceFeatures {
            geometry_shader: on(features.geometry_shader),
            tessellation_shader: on(features.tessellation_shader),
            multi_viewport: on(features.multi_viewport),
            texture_compression_etc2: on(features.texture_compression_etc2),
            texture_compression_astc_ldr: on(features.texture_compression_astc_ldr),
            texture_compression_bc: on(features.texture_compression_bc),
            sparse_binding: on(features.sparse_binding),
            variable_multisample_rate: on(features.variable_multisample_rate),
        }
    }

    fn device_extensions(&self, device: vk::PhysicalDevice) -> Result<Vec<String>> {
        let extensions = unsafe { self.instance.enumerate_device_extension_properties(device) }
            .map_err(vulkan_error)?;

        Ok(extensions
            .iter()
            .map(|ext| unsafe {
                CStr::from_ptr(ext.extension_name.as_ptr())
                    .to_string_lossy()
                    .to_string()
            })
            .collect())
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            self.instance.destroy_instance(None);
        }
        debug!("Vulkan instance destroyed");
    }
}

fn vulkan_error(result: vk::Result) -> Error {
    Error::Vulkan {
        message: format!("{:?}", result),
        error_code: Some(result.as_raw()),
    }
}
