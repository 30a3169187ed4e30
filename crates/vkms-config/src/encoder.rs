use crate::attach::LinkSet;
use crate::{ConnectorId, CrtcId, EncoderId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    id: EncoderId,
    name: Option<String>,
    pub(crate) possible_crtcs: LinkSet<CrtcId>,
    pub(crate) possible_connectors: LinkSet<ConnectorId>,
}

impl EncoderConfig {
    pub(crate) fn new(id: EncoderId) -> Self {
        Self {
            id,
            name: None,
            possible_crtcs: LinkSet::default(),
            possible_connectors: LinkSet::default(),
        }
    }

    pub fn id(&self) -> EncoderId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn possible_crtcs(&self) -> &LinkSet<CrtcId> {
        &self.possible_crtcs
    }

    pub fn possible_connectors(&self) -> &LinkSet<ConnectorId> {
        &self.possible_connectors
    }
}
