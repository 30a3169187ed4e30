use std::collections::BTreeMap;
use std::sync::Arc;

use crate::default::default_config;
use crate::device::VkmsDevice;
use crate::error::{DeviceError, Result};
use crate::options::DeviceOptions;

/// Name of the device [`VkmsContext::init`] brings up.
pub const DEFAULT_DEVICE_NAME: &str = "vkms";

/// Every device of one driver instance, keyed by name.
#[derive(Debug, Default)]
pub struct VkmsContext {
    options: DeviceOptions,
    devices: BTreeMap<String, Arc<VkmsDevice>>,
}

impl VkmsContext {
    /// Creates a context holding only the default device, already enabled.
    pub fn init(options: DeviceOptions) -> Result<Self> {
        let mut context = Self {
            options,
            devices: BTreeMap::new(),
        };
        let device = VkmsDevice::with_config(DEFAULT_DEVICE_NAME, default_config(&options)?);
        device.enable()?;
        context
            .devices
            .insert(DEFAULT_DEVICE_NAME.to_string(), Arc::new(device));
        Ok(context)
    }

    /// Creates a context with no devices at all.
    pub fn empty(options: DeviceOptions) -> Self {
        Self {
            options,
            devices: BTreeMap::new(),
        }
    }

    pub fn options(&self) -> &DeviceOptions {
        &self.options
    }

    /// Adds a disabled, seeded device.
    pub fn create_device(&mut self, name: &str) -> Result<Arc<VkmsDevice>> {
        if self.devices.contains_key(name) {
            return Err(DeviceError::DuplicateDevice(name.to_string()));
        }
        let device = Arc::new(VkmsDevice::new(name)?);
        self.devices.insert(name.to_string(), Arc::clone(&device));
        tracing::debug!(device = name, "device created");
        Ok(device)
    }

    pub fn device(&self, name: &str) -> Option<Arc<VkmsDevice>> {
        self.devices.get(name).cloned()
    }

    pub fn devices(&self) -> impl Iterator<Item = &Arc<VkmsDevice>> + '_ {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Removes a disabled device. An enabled one must be disabled first.
    pub fn remove_device(&mut self, name: &str) -> Result<Arc<VkmsDevice>> {
        let device = self
            .devices
            .get(name)
            .ok_or_else(|| DeviceError::UnknownDevice(name.to_string()))?;
        if device.is_enabled()? {
            return Err(DeviceError::Busy(name.to_string()));
        }
        let device = self
            .devices
            .remove(name)
            .ok_or_else(|| DeviceError::UnknownDevice(name.to_string()))?;
        tracing::debug!(device = name, "device removed");
        Ok(device)
    }

    /// Disables and drops every device. Devices whose lock is poisoned are dropped anyway.
    pub fn shutdown(&mut self) {
        for (name, device) in std::mem::take(&mut self.devices) {
            if let Err(err) = device.disable() {
                tracing::warn!(device = %name, %err, "cannot disable device during shutdown");
            }
        }
    }
}
