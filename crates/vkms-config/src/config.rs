use std::collections::BTreeMap;

use crate::attach::{link, unlink};
use crate::error::ValidationError;
use crate::properties::PlaneType;
use crate::{
    ConfigError, ConnectorConfig, ConnectorId, CrtcConfig, CrtcId, EncoderConfig, EncoderId,
    PlaneConfig, PlaneId, Result,
};

/// Root of the display-topology entity graph.
///
/// The graph performs no validation while it is being edited: a CRTC without planes or an
/// encoder without CRTCs is a legal intermediate state. [`VkmsConfig::is_valid`] is consulted
/// once, right before a device is instantiated from the graph.
///
/// Callers serialize access (a device holds its graph behind a mutex); nothing here locks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VkmsConfig {
    writeback: bool,
    planes: BTreeMap<PlaneId, PlaneConfig>,
    crtcs: BTreeMap<CrtcId, CrtcConfig>,
    encoders: BTreeMap<EncoderId, EncoderConfig>,
    connectors: BTreeMap<ConnectorId, ConnectorConfig>,
    next_id: u32,
}

impl VkmsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    pub fn writeback(&self) -> bool {
        self.writeback
    }

    pub fn set_writeback(&mut self, enabled: bool) {
        self.writeback = enabled;
    }

    // Planes.

    pub fn create_plane(&mut self) -> PlaneId {
        let id = PlaneId::new(self.alloc_id());
        self.planes.insert(id, PlaneConfig::new(id));
        id
    }

    pub fn plane(&self, id: PlaneId) -> Option<&PlaneConfig> {
        self.planes.get(&id)
    }

    pub fn plane_mut(&mut self, id: PlaneId) -> Option<&mut PlaneConfig> {
        self.planes.get_mut(&id)
    }

    pub fn planes(&self) -> impl Iterator<Item = &PlaneConfig> + '_ {
        self.planes.values()
    }

    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// Removes the plane and every CRTC's reference to it. Returns whether the plane existed.
    pub fn delete_plane(&mut self, id: PlaneId) -> bool {
        if self.planes.remove(&id).is_none() {
            return false;
        }
        for crtc in self.crtcs.values_mut() {
            crtc.possible_planes.remove(id);
        }
        true
    }

    // CRTCs.

    pub fn create_crtc(&mut self) -> CrtcId {
        let id = CrtcId::new(self.alloc_id());
        self.crtcs.insert(id, CrtcConfig::new(id));
        id
    }

    pub fn crtc(&self, id: CrtcId) -> Option<&CrtcConfig> {
        self.crtcs.get(&id)
    }

    pub fn crtc_mut(&mut self, id: CrtcId) -> Option<&mut CrtcConfig> {
        self.crtcs.get_mut(&id)
    }

    pub fn crtcs(&self) -> impl Iterator<Item = &CrtcConfig> + '_ {
        self.crtcs.values()
    }

    pub fn crtc_count(&self) -> usize {
        self.crtcs.len()
    }

    /// Removes the CRTC and every plane's and encoder's reference to it.
    pub fn delete_crtc(&mut self, id: CrtcId) -> bool {
        if self.crtcs.remove(&id).is_none() {
            return false;
        }
        for plane in self.planes.values_mut() {
            plane.possible_crtcs.remove(id);
        }
        for encoder in self.encoders.values_mut() {
            encoder.possible_crtcs.remove(id);
        }
        true
    }

    // Encoders.

    pub fn create_encoder(&mut self) -> EncoderId {
        let id = EncoderId::new(self.alloc_id());
        self.encoders.insert(id, EncoderConfig::new(id));
        id
    }

    pub fn encoder(&self, id: EncoderId) -> Option<&EncoderConfig> {
        self.encoders.get(&id)
    }

    pub fn encoder_mut(&mut self, id: EncoderId) -> Option<&mut EncoderConfig> {
        self.encoders.get_mut(&id)
    }

    pub fn encoders(&self) -> impl Iterator<Item = &EncoderConfig> + '_ {
        self.encoders.values()
    }

    pub fn encoder_count(&self) -> usize {
        self.encoders.len()
    }

    /// Removes the encoder and every CRTC's and connector's reference to it.
    pub fn delete_encoder(&mut self, id: EncoderId) -> bool {
        if self.encoders.remove(&id).is_none() {
            return false;
        }
        for crtc in self.crtcs.values_mut() {
            crtc.possible_encoders.remove(id);
        }
        for connector in self.connectors.values_mut() {
            connector.possible_encoders.remove(id);
        }
        true
    }

    // Connectors.

    pub fn create_connector(&mut self) -> ConnectorId {
        let id = ConnectorId::new(self.alloc_id());
        self.connectors.insert(id, ConnectorConfig::new(id));
        id
    }

    pub fn connector(&self, id: ConnectorId) -> Option<&ConnectorConfig> {
        self.connectors.get(&id)
    }

    pub fn connector_mut(&mut self, id: ConnectorId) -> Option<&mut ConnectorConfig> {
        self.connectors.get_mut(&id)
    }

    pub fn connectors(&self) -> impl Iterator<Item = &ConnectorConfig> + '_ {
        self.connectors.values()
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    pub fn delete_connector(&mut self, id: ConnectorId) -> bool {
        if self.connectors.remove(&id).is_none() {
            return false;
        }
        for encoder in self.encoders.values_mut() {
            encoder.possible_connectors.remove(id);
        }
        true
    }

    // Attachments.

    /// Links `plane` and `crtc` in both directions.
    ///
    /// Fails with [`ConfigError::ResourceExhausted`] when either side already holds the maximum
    /// number of links; in that case neither side is modified.
    pub fn attach_plane_to_crtc(&mut self, plane: PlaneId, crtc: CrtcId) -> Result<()> {
        let plane_cfg = self
            .planes
            .get_mut(&plane)
            .ok_or(ConfigError::UnknownPlane(plane))?;
        let crtc_cfg = self
            .crtcs
            .get_mut(&crtc)
            .ok_or(ConfigError::UnknownCrtc(crtc))?;
        link(
            &mut plane_cfg.possible_crtcs,
            plane,
            &mut crtc_cfg.possible_planes,
            crtc,
        )
    }

    pub fn detach_plane_from_crtc(&mut self, plane: PlaneId, crtc: CrtcId) -> Result<bool> {
        let plane_cfg = self
            .planes
            .get_mut(&plane)
            .ok_or(ConfigError::UnknownPlane(plane))?;
        let crtc_cfg = self
            .crtcs
            .get_mut(&crtc)
            .ok_or(ConfigError::UnknownCrtc(crtc))?;
        Ok(unlink(
            &mut plane_cfg.possible_crtcs,
            plane,
            &mut crtc_cfg.possible_planes,
            crtc,
        ))
    }

    /// Links `encoder` and `crtc` in both directions, with the same failure contract as
    /// [`VkmsConfig::attach_plane_to_crtc`].
    pub fn attach_encoder_to_crtc(&mut self, encoder: EncoderId, crtc: CrtcId) -> Result<()> {
        let encoder_cfg = self
            .encoders
            .get_mut(&encoder)
            .ok_or(ConfigError::UnknownEncoder(encoder))?;
        let crtc_cfg = self
            .crtcs
            .get_mut(&crtc)
            .ok_or(ConfigError::UnknownCrtc(crtc))?;
        link(
            &mut encoder_cfg.possible_crtcs,
            encoder,
            &mut crtc_cfg.possible_encoders,
            crtc,
        )
    }

    pub fn detach_encoder_from_crtc(&mut self, encoder: EncoderId, crtc: CrtcId) -> Result<bool> {
        let encoder_cfg = self
            .encoders
            .get_mut(&encoder)
            .ok_or(ConfigError::UnknownEncoder(encoder))?;
        let crtc_cfg = self
            .crtcs
            .get_mut(&crtc)
            .ok_or(ConfigError::UnknownCrtc(crtc))?;
        Ok(unlink(
            &mut encoder_cfg.possible_crtcs,
            encoder,
            &mut crtc_cfg.possible_encoders,
            crtc,
        ))
    }

    pub fn attach_connector_to_encoder(
        &mut self,
        connector: ConnectorId,
        encoder: EncoderId,
    ) -> Result<()> {
        let connector_cfg = self
            .connectors
            .get_mut(&connector)
            .ok_or(ConfigError::UnknownConnector(connector))?;
        let encoder_cfg = self
            .encoders
            .get_mut(&encoder)
            .ok_or(ConfigError::UnknownEncoder(encoder))?;
        link(
            &mut connector_cfg.possible_encoders,
            connector,
            &mut encoder_cfg.possible_connectors,
            encoder,
        )
    }

    pub fn detach_connector_from_encoder(
        &mut self,
        connector: ConnectorId,
        encoder: EncoderId,
    ) -> Result<bool> {
        let connector_cfg = self
            .connectors
            .get_mut(&connector)
            .ok_or(ConfigError::UnknownConnector(connector))?;
        let encoder_cfg = self
            .encoders
            .get_mut(&encoder)
            .ok_or(ConfigError::UnknownEncoder(encoder))?;
        Ok(unlink(
            &mut connector_cfg.possible_encoders,
            connector,
            &mut encoder_cfg.possible_connectors,
            encoder,
        ))
    }

    // Validation.

    /// Returns the first rule the graph breaks, if any.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.crtcs.is_empty() {
            return Err(ValidationError::NoCrtc);
        }

        for plane in self.planes.values() {
            if !plane.properties_consistent() {
                return Err(ValidationError::PlaneProperties(plane.id()));
            }
            if plane.possible_crtcs.is_empty() {
                return Err(ValidationError::PlaneWithoutCrtc(plane.id()));
            }
        }

        for encoder in self.encoders.values() {
            if encoder.possible_crtcs.is_empty() {
                return Err(ValidationError::EncoderWithoutCrtc(encoder.id()));
            }
        }

        for crtc in self.crtcs.values() {
            if crtc.possible_encoders.is_empty() {
                return Err(ValidationError::CrtcWithoutEncoder(crtc.id()));
            }

            let count_type = |wanted: PlaneType| {
                crtc.possible_planes
                    .iter()
                    .filter_map(|id| self.planes.get(&id))
                    .filter(|plane| plane.plane_type() == wanted)
                    .count()
            };
            let primaries = count_type(PlaneType::Primary);
            if primaries != 1 {
                return Err(ValidationError::PrimaryPlaneCount {
                    crtc: crtc.id(),
                    count: primaries,
                });
            }
            let cursors = count_type(PlaneType::Cursor);
            if cursors > 1 {
                return Err(ValidationError::CursorPlaneCount {
                    crtc: crtc.id(),
                    count: cursors,
                });
            }
        }

        for connector in self.connectors.values() {
            if connector.possible_encoders.is_empty() {
                return Err(ValidationError::ConnectorWithoutEncoder(connector.id()));
            }
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(error = %err, "configuration rejected");
                false
            }
        }
    }

    /// Deletes every entity: planes, then encoders, then CRTCs, then connectors.
    ///
    /// Dropping the graph has the same effect; this exists for owners that keep the graph
    /// object alive across a reset.
    pub fn clear(&mut self) {
        let planes: Vec<_> = self.planes.keys().copied().collect();
        for id in planes {
            self.delete_plane(id);
        }
        let encoders: Vec<_> = self.encoders.keys().copied().collect();
        for id in encoders {
            self.delete_encoder(id);
        }
        let crtcs: Vec<_> = self.crtcs.keys().copied().collect();
        for id in crtcs {
            self.delete_crtc(id);
        }
        let connectors: Vec<_> = self.connectors.keys().copied().collect();
        for id in connectors {
            self.delete_connector(id);
        }
    }
}
