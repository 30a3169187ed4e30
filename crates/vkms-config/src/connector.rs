use serde::{Deserialize, Serialize};

use crate::attach::LinkSet;
use crate::{ConfigError, ConnectorId, EncoderId, Result};

/// Size of one EDID block; overrides must be a whole number of blocks.
pub const EDID_BLOCK_LEN: usize = 128;

/// Hotplug state reported for a connector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorStatus {
    #[default]
    Connected,
    Disconnected,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfig {
    id: ConnectorId,
    name: Option<String>,
    status: ConnectorStatus,
    edid: Option<Vec<u8>>,
    pub(crate) possible_encoders: LinkSet<EncoderId>,
}

impl ConnectorConfig {
    pub(crate) fn new(id: ConnectorId) -> Self {
        Self {
            id,
            name: None,
            status: ConnectorStatus::Connected,
            edid: None,
            possible_encoders: LinkSet::default(),
        }
    }

    pub fn id(&self) -> ConnectorId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn status(&self) -> ConnectorStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ConnectorStatus) {
        self.status = status;
    }

    pub fn edid(&self) -> Option<&[u8]> {
        self.edid.as_deref()
    }

    /// Replaces the EDID served for this connector; `None` falls back to the built-in table.
    pub fn set_edid(&mut self, edid: Option<Vec<u8>>) -> Result<()> {
        if let Some(bytes) = &edid {
            if bytes.is_empty() || bytes.len() % EDID_BLOCK_LEN != 0 {
                return Err(ConfigError::InvalidArgument(
                    "EDID override must be a non-empty multiple of 128 bytes",
                ));
            }
        }
        self.edid = edid;
        Ok(())
    }

    pub fn possible_encoders(&self) -> &LinkSet<EncoderId> {
        &self.possible_encoders
    }

    /// First compatible encoder, used when the display core asks which encoder drives us.
    pub fn best_encoder(&self) -> Option<EncoderId> {
        self.possible_encoders.first()
    }
}
