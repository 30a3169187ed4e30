//! Serializable description of an entity graph.
//!
//! Entities reference each other by name, which makes the format convenient to write by hand
//! (JSON via `serde_json`). [`ConfigDescription::build`] resolves the names into a
//! [`VkmsConfig`] and [`VkmsConfig::describe`] goes the other way.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::connector::ConnectorStatus;
use crate::properties::{
    ColorEncoding, ColorEncodings, ColorRange, ColorRanges, PlaneType, Rotation,
};
use crate::{ConfigError, CrtcId, EncoderId, Result, VkmsConfig};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigDescription {
    pub writeback: bool,
    pub planes: Vec<PlaneDescription>,
    pub crtcs: Vec<CrtcDescription>,
    pub encoders: Vec<EncoderDescription>,
    pub connectors: Vec<ConnectorDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaneDescription {
    pub name: String,
    #[serde(rename = "type", default)]
    pub plane_type: PlaneType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_rotations: Option<Rotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_rotation: Option<Rotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_color_encodings: Option<ColorEncodings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_color_encoding: Option<ColorEncoding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_color_ranges: Option<ColorRanges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_color_range: Option<ColorRange>,
    #[serde(default)]
    pub possible_crtcs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrtcDescription {
    pub name: String,
    #[serde(default)]
    pub writeback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncoderDescription {
    pub name: String,
    #[serde(default)]
    pub possible_crtcs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectorDescription {
    pub name: String,
    #[serde(default)]
    pub status: ConnectorStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edid: Option<Vec<u8>>,
    #[serde(default)]
    pub possible_encoders: Vec<String>,
}

fn check_unique<'a, I>(kind: &'static str, names: I) -> Result<()>
where
    I: Iterator<Item = &'a str>,
{
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateName {
                kind,
                name: name.to_owned(),
            });
        }
    }
    Ok(())
}

fn lookup<T: Copy>(kind: &'static str, ids: &BTreeMap<&str, T>, name: &str) -> Result<T> {
    ids.get(name).copied().ok_or_else(|| ConfigError::UnknownName {
        kind,
        name: name.to_owned(),
    })
}

impl ConfigDescription {
    /// Builds a graph from the description. The result is not validated.
    pub fn build(&self) -> Result<VkmsConfig> {
        check_unique("plane", self.planes.iter().map(|p| p.name.as_str()))?;
        check_unique("CRTC", self.crtcs.iter().map(|c| c.name.as_str()))?;
        check_unique("encoder", self.encoders.iter().map(|e| e.name.as_str()))?;
        check_unique("connector", self.connectors.iter().map(|c| c.name.as_str()))?;

        let mut config = VkmsConfig::new();
        config.set_writeback(self.writeback);

        let mut crtc_ids: BTreeMap<&str, CrtcId> = BTreeMap::new();
        for desc in &self.crtcs {
            let id = config.create_crtc();
            if let Some(crtc) = config.crtc_mut(id) {
                crtc.set_name(desc.name.as_str());
                crtc.set_writeback(desc.writeback);
            }
            crtc_ids.insert(desc.name.as_str(), id);
        }

        let mut encoder_ids: BTreeMap<&str, EncoderId> = BTreeMap::new();
        for desc in &self.encoders {
            let id = config.create_encoder();
            if let Some(encoder) = config.encoder_mut(id) {
                encoder.set_name(desc.name.as_str());
            }
            encoder_ids.insert(desc.name.as_str(), id);
            for crtc in &desc.possible_crtcs {
                let crtc = lookup("CRTC", &crtc_ids, crtc)?;
                config.attach_encoder_to_crtc(id, crtc)?;
            }
        }

        for desc in &self.planes {
            let id = config.create_plane();
            let plane = config
                .plane_mut(id)
                .ok_or(ConfigError::UnknownPlane(id))?;
            plane.set_name(desc.name.as_str());
            plane.set_plane_type(desc.plane_type);
            if let Some(rotations) = desc.supported_rotations {
                plane.set_supported_rotations(rotations)?;
            }
            if let Some(rotation) = desc.default_rotation {
                plane.set_default_rotation(rotation)?;
            }
            if let Some(encodings) = desc.supported_color_encodings {
                plane.set_supported_color_encodings(encodings)?;
            }
            if let Some(encoding) = desc.default_color_encoding {
                plane.set_default_color_encoding(encoding)?;
            }
            if let Some(ranges) = desc.supported_color_ranges {
                plane.set_supported_color_ranges(ranges)?;
            }
            if let Some(range) = desc.default_color_range {
                plane.set_default_color_range(range)?;
            }
            for crtc in &desc.possible_crtcs {
                let crtc = lookup("CRTC", &crtc_ids, crtc)?;
                config.attach_plane_to_crtc(id, crtc)?;
            }
        }

        for desc in &self.connectors {
            let id = config.create_connector();
            let connector = config
                .connector_mut(id)
                .ok_or(ConfigError::UnknownConnector(id))?;
            connector.set_name(desc.name.as_str());
            connector.set_status(desc.status);
            connector.set_edid(desc.edid.clone())?;
            for encoder in &desc.possible_encoders {
                let encoder = lookup("encoder", &encoder_ids, encoder)?;
                config.attach_connector_to_encoder(id, encoder)?;
            }
        }

        Ok(config)
    }
}

impl VkmsConfig {
    /// Describes the graph by name. Unnamed entities are given their debug id as a name.
    pub fn describe(&self) -> ConfigDescription {
        let crtc_name = |id: CrtcId| {
            self.crtc(id)
                .and_then(|crtc| crtc.name())
                .map(str::to_owned)
                .unwrap_or_else(|| format!("{id:?}"))
        };
        let encoder_name = |id: EncoderId| {
            self.encoder(id)
                .and_then(|encoder| encoder.name())
                .map(str::to_owned)
                .unwrap_or_else(|| format!("{id:?}"))
        };

        ConfigDescription {
            writeback: self.writeback(),
            planes: self
                .planes()
                .map(|plane| PlaneDescription {
                    name: plane
                        .name()
                        .map(str::to_owned)
                        .unwrap_or_else(|| format!("{:?}", plane.id())),
                    plane_type: plane.plane_type(),
                    supported_rotations: Some(plane.supported_rotations()),
                    default_rotation: Some(plane.default_rotation()),
                    supported_color_encodings: Some(plane.supported_color_encodings()),
                    default_color_encoding: Some(plane.default_color_encoding()),
                    supported_color_ranges: Some(plane.supported_color_ranges()),
                    default_color_range: Some(plane.default_color_range()),
                    possible_crtcs: plane.possible_crtcs().iter().map(crtc_name).collect(),
                })
                .collect(),
            crtcs: self
                .crtcs()
                .map(|crtc| CrtcDescription {
                    name: crtc_name(crtc.id()),
                    writeback: crtc.writeback(),
                })
                .collect(),
            encoders: self
                .encoders()
                .map(|encoder| EncoderDescription {
                    name: encoder_name(encoder.id()),
                    possible_crtcs: encoder.possible_crtcs().iter().map(crtc_name).collect(),
                })
                .collect(),
            connectors: self
                .connectors()
                .map(|connector| ConnectorDescription {
                    name: connector
                        .name()
                        .map(str::to_owned)
                        .unwrap_or_else(|| format!("{:?}", connector.id())),
                    status: connector.status(),
                    edid: connector.edid().map(<[u8]>::to_vec),
                    possible_encoders: connector
                        .possible_encoders()
                        .iter()
                        .map(encoder_name)
                        .collect(),
                })
                .collect(),
        }
    }
}
