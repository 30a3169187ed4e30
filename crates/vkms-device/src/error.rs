use thiserror::Error;
use vkms_config::{ConfigError, ValidationError};

pub type Result<T> = std::result::Result<T, DeviceError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    /// The configuration of an enabled device cannot change.
    #[error("device {0:?} is enabled")]
    Busy(String),

    #[error("device {0:?} already exists")]
    DuplicateDevice(String),

    #[error("no device named {0:?}")]
    UnknownDevice(String),

    /// More objects of one kind than a 32-bit possible mask can address.
    #[error("{count} {kind}s exceed the {limit} a device can expose")]
    TooManyObjects {
        kind: &'static str,
        count: usize,
        limit: usize,
    },

    #[error("invalid value {value:?} for {var}")]
    InvalidOption { var: &'static str, value: String },

    #[error("device {0:?} state lock is poisoned")]
    Poisoned(String),
}
