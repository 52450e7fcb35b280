//! Mock driver for testing
//!
//! Serves scripted devices and tracks instance lifetimes so tests can check
//! that a probe never leaves a driver connection open.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::driver::{DeviceProperties, DriverInstance, GpuDriver, InstanceRequest, RawMemoryHeap};
use super::DeviceFeatures;

// ─────────────────────────────────────────────────────────────────
// Scripted Devices
// ─────────────────────────────────────────────────────────────────

/// A physical device served by [`MockDriver`]
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub properties: DeviceProperties,
    pub heaps: Vec<RawMemoryHeap>,
    pub features: DeviceFeatures,
    pub extensions: Vec<String>,
    /// Make extension enumeration return an error
    pub fail_extensions: bool,
}

impl MockDevice {
    pub fn new(name: impl Into<String>, vendor_id: u32, device_type: i32) -> Self {
        Self {
            properties: DeviceProperties {
                name: name.into(),
                vendor_id,
                device_id: 0,
                device_type,
                driver_version: 0,
                api_version: 1 << 22,
            },
            heaps: Vec::new(),
            features: DeviceFeatures::default(),
            extensions: Vec::new(),
            fail_extensions: false,
        }
    }

    pub fn with_versions(mut self, api_version: u32, driver_version: u32) -> Self {
        self.properties.api_version = api_version;
        self.properties.driver_version = driver_version;
        self
    }

    pub fn with_heap(mut self, size: u64, flags: u32) -> Self {
        self.heaps.push(RawMemoryHeap { size, flags });
        self
    }

    pub fn with_extensions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_features(mut self, features: DeviceFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn failing_extensions(mut self) -> Self {
        self.fail_extensions = true;
        self
    }
}

// ─────────────────────────────────────────────────────────────────
// Instance Tracking
// ─────────────────────────────────────────────────────────────────

/// Lifetime bookkeeping shared between a driver and its instances
#[derive(Debug, Default)]
struct Tracker {
    created: usize,
    destroyed: usize,
    requests: Vec<InstanceRequest>,
    queried_devices: Vec<usize>,
}

// ─────────────────────────────────────────────────────────────────
// Mock Driver
// ─────────────────────────────────────────────────────────────────

/// Scripted driver for probe tests
#[derive(Debug, Clone)]
pub struct MockDriver {
    devices: Vec<MockDevice>,
    fail_create: bool,
    fail_enumerate: bool,
    tracker: Arc<Mutex<Tracker>>,
}

impl MockDriver {
    /// Driver exposing `devices` in the given order
    pub fn new(devices: Vec<MockDevice>) -> Self {
        Self {
            devices,
            fail_create: false,
            fail_enumerate: false,
            tracker: Arc::new(Mutex::new(Tracker::default())),
        }
    }

    /// Driver whose instance creation always fails
    pub fn failing() -> Self {
        Self {
            fail_create: true,
            ..Self::new(Vec::new())
        }
    }

    /// Make device enumeration return an error
    pub fn with_enumeration_failure(mut self) -> Self {
        self.fail_enumerate = true;
        self
    }

    /// Instances created and not yet dropped
    pub fn live_instances(&self) -> usize {
        let tracker = self.tracker.lock();
        tracker.created - tracker.destroyed
    }

    /// Total instances created
    pub fn instances_created(&self) -> usize {
        self.tracker.lock().created
    }

    /// Requests passed to `create_instance`, including failed ones
    pub fn requests(&self) -> Vec<InstanceRequest> {
        self.tracker.lock().requests.clone()
    }

    /// Device indices whose properties were queried, in call order
    pub fn queried_devices(&self) -> Vec<usize> {
        self.tracker.lock().queried_devices.clone()
    }
}

impl GpuDriver for MockDriver {
    type Instance = MockInstance;

    fn name(&self) -> &'static str {
        "Vulkan"
    }

    fn create_instance(&self, request: &InstanceRequest) -> Result<MockInstance> {
        let mut tracker = self.tracker.lock();
        tracker.requests.push(request.clone());

        if self.fail_create {
            return Err(Error::instance_creation("ERROR_INCOMPATIBLE_DRIVER"));
        }

        tracker.created += 1;
        Ok(MockInstance {
            devices: self.devices.clone(),
            fail_enumerate: self.fail_enumerate,
            tracker: Arc::clone(&self.tracker),
        })
    }
}

/// Instance handed out by [`MockDriver`]; devices are addressed by index
#[derive(Debug)]
pub struct MockInstance {
    devices: Vec<MockDevice>,
    fail_enumerate: bool,
    tracker: Arc<Mutex<Tracker>>,
}

impl MockInstance {
    fn device(&self, index: usize) -> &MockDevice {
        &self.devices[index]
    }
}

impl DriverInstance for MockInstance {
    type Device = usize;

    fn enumerate_devices(&self) -> Result<Vec<usize>> {
        if self.fail_enumerate {
            return Err(Error::Vulkan {
                message: "ERROR_INITIALIZATION_FAILED".to_string(),
                error_code: Some(-3),
            });
        }
        Ok((0..self.devices.len()).collect())
    }

    fn properties(&self, device: usize) -> DeviceProperties {
        self.tracker.lock().queried_devices.push(device);
        self.device(device).properties.clone()
    }

    fn memory_heaps(&self, device: usize) -> Vec<RawMemoryHeap> {
        self.device(device).heaps.clone()
    }

    fn features(&self, device: usize) -> DeviceFeatures {
        self.device(device).features
    }

    fn device_extensions(&self, device: usize) -> Result<Vec<String>> {
        let device = self.device(device);
        if device.fail_extensions {
            return Err(Error::Vulkan {
                message: "ERROR_OUT_OF_HOST_MEMORY".to_string(),
                error_code: Some(-1),
            });
        }
        Ok(device.extensions.clone())
    }
}

impl Drop for MockInstance {
    fn drop(&mut self) {
        self.tracker.lock().destroyed += 1;
    }
}
