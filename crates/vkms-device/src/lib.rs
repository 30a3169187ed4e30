#![forbid(unsafe_code)]

//! Virtual KMS devices built from an entity graph.
//!
//! A [`VkmsContext`] owns every device. Each [`VkmsDevice`] keeps its configuration graph
//! behind a lock; enabling the device validates the graph and freezes it into a
//! [`DeviceLayout`] until the device is disabled again.

mod context;
mod default;
mod device;
mod error;
mod layout;
pub mod modes;
mod options;

pub use context::{VkmsContext, DEFAULT_DEVICE_NAME};
pub use default::{default_config, NUM_OVERLAY_PLANES};
pub use device::VkmsDevice;
pub use error::{DeviceError, Result};
pub use layout::{ConnectorLayout, CrtcLayout, DeviceLayout, EncoderLayout, PlaneLayout};
pub use options::DeviceOptions;
