use thiserror::Error;

use crate::{ConnectorId, CrtcId, EncoderId, PlaneId};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors surfaced by the entity graph to whichever front-end is mutating it.
///
/// Mutations that fail leave the graph exactly as it was before the call: symmetric attachments
/// are rolled back and rejected property values are never committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// One side of an attachment already links the maximum number of peers.
    #[error("attachment identifier space exhausted (limit {limit})")]
    ResourceExhausted { limit: usize },

    #[error("unknown plane {0:?}")]
    UnknownPlane(PlaneId),

    #[error("unknown CRTC {0:?}")]
    UnknownCrtc(CrtcId),

    #[error("unknown encoder {0:?}")]
    UnknownEncoder(EncoderId),

    #[error("unknown connector {0:?}")]
    UnknownConnector(ConnectorId),

    #[error("duplicate {kind} name {name:?}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("reference to unknown {kind} {name:?}")]
    UnknownName { kind: &'static str, name: String },
}

/// First violation found by [`crate::VkmsConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("configuration has no CRTC")]
    NoCrtc,

    #[error("{0:?} has a default property outside its supported set")]
    PlaneProperties(PlaneId),

    #[error("{0:?} is not attached to any CRTC")]
    PlaneWithoutCrtc(PlaneId),

    #[error("{0:?} is not attached to any CRTC")]
    EncoderWithoutCrtc(EncoderId),

    #[error("{0:?} is not attached to any encoder")]
    CrtcWithoutEncoder(CrtcId),

    #[error("{crtc:?} has {count} primary planes (expected exactly one)")]
    PrimaryPlaneCount { crtc: CrtcId, count: usize },

    #[error("{crtc:?} has {count} cursor planes (expected at most one)")]
    CursorPlaneCount { crtc: CrtcId, count: usize },

    #[error("{0:?} is not attached to any encoder")]
    ConnectorWithoutEncoder(ConnectorId),
}
