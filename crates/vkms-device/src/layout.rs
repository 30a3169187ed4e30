//! The frozen shape of an enabled device.

use std::collections::BTreeMap;

use serde::Serialize;
use vkms_config::{
    ConnectorId, CrtcConfig, CrtcId, EncoderId, PlaneId, PlaneType, ValidationError, VkmsConfig,
};

use crate::error::{DeviceError, Result};

/// Width of the DRM `possible_crtcs` / `possible_encoders` masks.
const MASK_BITS: usize = u32::BITS as usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrtcLayout {
    pub id: CrtcId,
    pub name: Option<String>,
    /// Position among the device's CRTCs; bit `index` stands for this CRTC in every mask.
    pub index: u32,
    pub primary: PlaneId,
    pub cursor: Option<PlaneId>,
    pub writeback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaneLayout {
    pub id: PlaneId,
    pub name: Option<String>,
    pub plane_type: PlaneType,
    pub possible_crtcs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncoderLayout {
    pub id: EncoderId,
    pub name: Option<String>,
    pub index: u32,
    pub possible_crtcs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectorLayout {
    pub id: ConnectorId,
    pub name: Option<String>,
    pub possible_encoders: u32,
    pub best_encoder: Option<EncoderId>,
}

/// Objects a device exposes, with the index masks that tie them together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceLayout {
    pub crtcs: Vec<CrtcLayout>,
    pub planes: Vec<PlaneLayout>,
    pub encoders: Vec<EncoderLayout>,
    pub connectors: Vec<ConnectorLayout>,
    pub writeback_connectors: usize,
}

fn index_map<I: Ord + Copy>(kind: &'static str, ids: Vec<I>) -> Result<BTreeMap<I, u32>> {
    if ids.len() > MASK_BITS {
        return Err(DeviceError::TooManyObjects {
            kind,
            count: ids.len(),
            limit: MASK_BITS,
        });
    }
    Ok(ids.into_iter().zip(0u32..).collect())
}

fn mask<I: Ord>(indices: &BTreeMap<I, u32>, ids: impl Iterator<Item = I>) -> u32 {
    ids.filter_map(|id| indices.get(&id))
        .fold(0, |acc, index| acc | 1 << index)
}

fn plane_of_type(config: &VkmsConfig, crtc: &CrtcConfig, wanted: PlaneType) -> Option<PlaneId> {
    crtc.possible_planes()
        .iter()
        .find(|&id| config.plane(id).is_some_and(|p| p.plane_type() == wanted))
}

impl DeviceLayout {
    /// Validates `config` and computes the layout a device built from it would have.
    pub fn new(config: &VkmsConfig) -> Result<Self> {
        config.validate()?;

        let crtc_index = index_map("CRTC", config.crtcs().map(|c| c.id()).collect())?;
        let encoder_index = index_map("encoder", config.encoders().map(|e| e.id()).collect())?;

        let mut crtcs = Vec::with_capacity(config.crtc_count());
        for crtc in config.crtcs() {
            let primary = plane_of_type(config, crtc, PlaneType::Primary).ok_or(
                ValidationError::PrimaryPlaneCount {
                    crtc: crtc.id(),
                    count: 0,
                },
            )?;
            crtcs.push(CrtcLayout {
                id: crtc.id(),
                name: crtc.name().map(str::to_owned),
                index: crtc_index[&crtc.id()],
                primary,
                cursor: plane_of_type(config, crtc, PlaneType::Cursor),
                writeback: crtc.writeback(),
            });
        }

        let planes = config
            .planes()
            .map(|plane| PlaneLayout {
                id: plane.id(),
                name: plane.name().map(str::to_owned),
                plane_type: plane.plane_type(),
                possible_crtcs: mask(&crtc_index, plane.possible_crtcs().iter()),
            })
            .collect();

        let encoders = config
            .encoders()
            .map(|encoder| EncoderLayout {
                id: encoder.id(),
                name: encoder.name().map(str::to_owned),
                index: encoder_index[&encoder.id()],
                possible_crtcs: mask(&crtc_index, encoder.possible_crtcs().iter()),
            })
            .collect();

        let connectors = config
            .connectors()
            .map(|connector| ConnectorLayout {
                id: connector.id(),
                name: connector.name().map(str::to_owned),
                possible_encoders: mask(&encoder_index, connector.possible_encoders().iter()),
                best_encoder: connector.best_encoder(),
            })
            .collect();

        let writeback_connectors = if config.writeback() {
            crtcs.iter().filter(|c| c.writeback).count()
        } else {
            0
        };

        Ok(Self {
            crtcs,
            planes,
            encoders,
            connectors,
            writeback_connectors,
        })
    }

    pub fn crtc(&self, id: CrtcId) -> Option<&CrtcLayout> {
        self.crtcs.iter().find(|c| c.id == id)
    }

    pub fn plane(&self, id: PlaneId) -> Option<&PlaneLayout> {
        self.planes.iter().find(|p| p.id == id)
    }

    pub fn encoder(&self, id: EncoderId) -> Option<&EncoderLayout> {
        self.encoders.iter().find(|e| e.id == id)
    }
}
