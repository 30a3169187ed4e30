use std::sync::{Mutex, MutexGuard};

use vkms_config::{PlaneType, VkmsConfig};

use crate::error::{DeviceError, Result};
use crate::layout::DeviceLayout;

#[derive(Debug)]
struct DeviceState {
    config: VkmsConfig,
    /// Present exactly while the device is enabled.
    layout: Option<DeviceLayout>,
}

/// One virtual KMS device: a configuration graph plus its enabled/disabled lifecycle.
///
/// The graph may only be edited while the device is disabled. Enabling freezes it.
#[derive(Debug)]
pub struct VkmsDevice {
    name: String,
    state: Mutex<DeviceState>,
}

/// Smallest graph that passes validation: a primary plane and an encoder on one CRTC.
fn seed_config() -> Result<VkmsConfig> {
    let mut config = VkmsConfig::new();
    let plane = config.create_plane();
    if let Some(p) = config.plane_mut(plane) {
        p.set_plane_type(PlaneType::Primary);
    }
    let crtc = config.create_crtc();
    let encoder = config.create_encoder();
    config.attach_plane_to_crtc(plane, crtc)?;
    config.attach_encoder_to_crtc(encoder, crtc)?;
    Ok(config)
}

impl VkmsDevice {
    /// A disabled device seeded with one primary plane, one CRTC and one encoder.
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self::with_config(name, seed_config()?))
    }

    /// A disabled device using `config` as-is.
    pub fn with_config(name: &str, config: VkmsConfig) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(DeviceState {
                config,
                layout: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> Result<MutexGuard<'_, DeviceState>> {
        self.state
            .lock()
            .map_err(|_| DeviceError::Poisoned(self.name.clone()))
    }

    pub fn is_enabled(&self) -> Result<bool> {
        Ok(self.lock()?.layout.is_some())
    }

    /// Runs `f` with shared access to the graph.
    pub fn read_config<R>(&self, f: impl FnOnce(&VkmsConfig) -> R) -> Result<R> {
        Ok(f(&self.lock()?.config))
    }

    /// Runs `f` with exclusive access to the graph. Fails with [`DeviceError::Busy`] while
    /// the device is enabled.
    pub fn update_config<R>(&self, f: impl FnOnce(&mut VkmsConfig) -> R) -> Result<R> {
        let mut state = self.lock()?;
        if state.layout.is_some() {
            return Err(DeviceError::Busy(self.name.clone()));
        }
        Ok(f(&mut state.config))
    }

    /// Replaces the whole graph, e.g. with one built from a description.
    pub fn replace_config(&self, config: VkmsConfig) -> Result<VkmsConfig> {
        self.update_config(|current| std::mem::replace(current, config))
    }

    /// Validates the graph and brings the device up. Enabling an enabled device is a no-op.
    pub fn enable(&self) -> Result<()> {
        let mut state = self.lock()?;
        if state.layout.is_some() {
            return Ok(());
        }
        let layout = match DeviceLayout::new(&state.config) {
            Ok(layout) => layout,
            Err(err) => {
                tracing::warn!(device = %self.name, %err, "refusing to enable device");
                return Err(err);
            }
        };
        tracing::info!(
            device = %self.name,
            crtcs = layout.crtcs.len(),
            planes = layout.planes.len(),
            encoders = layout.encoders.len(),
            "device enabled"
        );
        state.layout = Some(layout);
        Ok(())
    }

    /// Tears the device down. Returns whether it was enabled.
    pub fn disable(&self) -> Result<bool> {
        let was_enabled = self.lock()?.layout.take().is_some();
        if was_enabled {
            tracing::info!(device = %self.name, "device disabled");
        }
        Ok(was_enabled)
    }

    /// Layout of the enabled device.
    pub fn layout(&self) -> Result<Option<DeviceLayout>> {
        Ok(self.lock()?.layout.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkms_config::ValidationError;

    #[test]
    fn seeded_device_enables() {
        let device = VkmsDevice::new("card").unwrap();
        assert!(!device.is_enabled().unwrap());
        device.enable().unwrap();
        assert!(device.is_enabled().unwrap());
        let layout = device.layout().unwrap().unwrap();
        assert_eq!(layout.crtcs.len(), 1);
        assert_eq!(layout.planes[0].possible_crtcs, 1);
    }

    #[test]
    fn enabled_device_is_frozen() {
        let device = VkmsDevice::new("card").unwrap();
        device.enable().unwrap();
        assert_eq!(
            device.update_config(|config| config.create_plane()),
            Err(DeviceError::Busy("card".to_string()))
        );
        assert!(device.disable().unwrap());
        assert!(!device.disable().unwrap());
        device.update_config(|config| config.create_plane()).unwrap();
    }

    #[test]
    fn invalid_graph_stays_disabled() {
        let device = VkmsDevice::with_config("empty", VkmsConfig::new());
        assert_eq!(
            device.enable(),
            Err(DeviceError::InvalidConfig(ValidationError::NoCrtc))
        );
        assert!(!device.is_enabled().unwrap());
        assert_eq!(device.layout().unwrap(), None);
    }
}
