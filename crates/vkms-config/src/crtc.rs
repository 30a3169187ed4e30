use crate::attach::LinkSet;
use crate::{CrtcId, EncoderId, PlaneId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrtcConfig {
    id: CrtcId,
    name: Option<String>,
    writeback: bool,
    pub(crate) possible_planes: LinkSet<PlaneId>,
    pub(crate) possible_encoders: LinkSet<EncoderId>,
}

impl CrtcConfig {
    pub(crate) fn new(id: CrtcId) -> Self {
        Self {
            id,
            name: None,
            writeback: false,
            possible_planes: LinkSet::default(),
            possible_encoders: LinkSet::default(),
        }
    }

    pub fn id(&self) -> CrtcId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Whether a writeback connector is created for this CRTC.
    pub fn writeback(&self) -> bool {
        self.writeback
    }

    pub fn set_writeback(&mut self, enabled: bool) {
        self.writeback = enabled;
    }

    pub fn possible_planes(&self) -> &LinkSet<PlaneId> {
        &self.possible_planes
    }

    pub fn possible_encoders(&self) -> &LinkSet<EncoderId> {
        &self.possible_encoders
    }
}
