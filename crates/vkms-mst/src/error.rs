use thiserror::Error;

use crate::sideband::{NakReason, SidebandError};
use crate::DeviceId;

pub type Result<T> = std::result::Result<T, MstError>;

/// AUX-level protocol violations. The offending transaction has already been NACKed by the
/// time one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unmapped DPCD address {address:#07x}")]
    UnmappedRegister { address: u32 },

    #[error("unsupported AUX request {request:#04x}")]
    UnsupportedRequest { request: u8 },

    #[error("I2C device {address:#04x} did not acknowledge")]
    I2cNack { address: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MstError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("sideband error: {0}")]
    Sideband(#[from] SidebandError),

    #[error("{request} was NAKed: {reason:?}")]
    Nak {
        request: &'static str,
        reason: NakReason,
    },

    #[error("unexpected reply to {request}")]
    UnexpectedReply { request: &'static str },

    /// Nothing answers on the destination port.
    #[error("AUX timeout on port {port}")]
    Timeout { port: u8 },

    #[error("work queue is full")]
    NotReady,

    #[error("unknown device {0:?}")]
    NoSuchDevice(DeviceId),

    #[error("port {port} does not exist on {device:?}")]
    InvalidPort { device: DeviceId, port: u8 },

    #[error("port {port} on {device:?} is already connected")]
    PortBusy { device: DeviceId, port: u8 },

    #[error("a hub has at most 14 down-facing ports, {requested} requested")]
    TooManyPorts { requested: u8 },

    #[error("a link needs one up-facing and one down-facing port")]
    IncompatiblePorts,

    #[error("{0:?} is not a root device")]
    NotARoot(DeviceId),
}
