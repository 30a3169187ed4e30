#![forbid(unsafe_code)]

//! Display-topology entity graph for the virtual KMS device.
//!
//! A [`VkmsConfig`] owns planes, CRTCs, encoders and connectors plus the symmetric
//! "may be used together" relations between them. The graph is edited freely and checked with
//! [`VkmsConfig::is_valid`] right before a device is created from it.

pub mod attach;
mod config;
mod connector;
mod crtc;
pub mod description;
mod encoder;
mod error;
mod ids;
mod plane;
pub mod properties;

pub use attach::{LinkSet, MAX_LINKS};
pub use config::VkmsConfig;
pub use connector::{ConnectorConfig, ConnectorStatus, EDID_BLOCK_LEN};
pub use crtc::CrtcConfig;
pub use description::ConfigDescription;
pub use encoder::EncoderConfig;
pub use error::{ConfigError, Result, ValidationError};
pub use ids::{ConnectorId, CrtcId, EncoderId, PlaneId};
pub use plane::PlaneConfig;
pub use properties::{
    ColorEncoding, ColorEncodings, ColorRange, ColorRanges, PlaneType, Rotation,
};
