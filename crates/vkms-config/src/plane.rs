use crate::attach::LinkSet;
use crate::properties::{
    ColorEncoding, ColorEncodings, ColorRange, ColorRanges, PlaneType, Rotation,
};
use crate::{ConfigError, CrtcId, PlaneId, Result};

/// Plane record in the entity graph.
///
/// Property setters reject values that are malformed or whose default falls outside the
/// supported set. Narrowing a supported set below an existing default is allowed here and is
/// reported later by [`crate::VkmsConfig::is_valid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneConfig {
    id: PlaneId,
    name: Option<String>,
    plane_type: PlaneType,
    default_rotation: Rotation,
    supported_rotations: Rotation,
    default_color_encoding: ColorEncoding,
    supported_color_encodings: ColorEncodings,
    default_color_range: ColorRange,
    supported_color_ranges: ColorRanges,
    pub(crate) possible_crtcs: LinkSet<CrtcId>,
}

impl PlaneConfig {
    pub(crate) fn new(id: PlaneId) -> Self {
        Self {
            id,
            name: None,
            plane_type: PlaneType::Overlay,
            default_rotation: Rotation::ROTATE_0,
            supported_rotations: Rotation::ROTATE_MASK | Rotation::REFLECT_MASK,
            default_color_encoding: ColorEncoding::Bt601,
            supported_color_encodings: ColorEncodings::all(),
            default_color_range: ColorRange::Full,
            supported_color_ranges: ColorRanges::all(),
            possible_crtcs: LinkSet::default(),
        }
    }

    pub fn id(&self) -> PlaneId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn plane_type(&self) -> PlaneType {
        self.plane_type
    }

    pub fn set_plane_type(&mut self, plane_type: PlaneType) {
        self.plane_type = plane_type;
    }

    pub fn default_rotation(&self) -> Rotation {
        self.default_rotation
    }

    pub fn supported_rotations(&self) -> Rotation {
        self.supported_rotations
    }

    pub fn set_supported_rotations(&mut self, rotations: Rotation) -> Result<()> {
        self.supported_rotations = Rotation::supported_from_bits(rotations.bits())?;
        Ok(())
    }

    pub fn set_default_rotation(&mut self, rotation: Rotation) -> Result<()> {
        let rotation = Rotation::single_from_bits(rotation.bits())?;
        if !self.supported_rotations.contains(rotation) {
            return Err(ConfigError::InvalidArgument(
                "default rotation is not a supported rotation",
            ));
        }
        self.default_rotation = rotation;
        Ok(())
    }

    pub fn default_color_encoding(&self) -> ColorEncoding {
        self.default_color_encoding
    }

    pub fn supported_color_encodings(&self) -> ColorEncodings {
        self.supported_color_encodings
    }

    pub fn set_supported_color_encodings(&mut self, encodings: ColorEncodings) -> Result<()> {
        if encodings.is_empty() {
            return Err(ConfigError::InvalidArgument(
                "supported color encodings must not be empty",
            ));
        }
        self.supported_color_encodings = encodings;
        Ok(())
    }

    pub fn set_default_color_encoding(&mut self, encoding: ColorEncoding) -> Result<()> {
        if !self.supported_color_encodings.contains(encoding.flag()) {
            return Err(ConfigError::InvalidArgument(
                "default color encoding is not a supported encoding",
            ));
        }
        self.default_color_encoding = encoding;
        Ok(())
    }

    pub fn default_color_range(&self) -> ColorRange {
        self.default_color_range
    }

    pub fn supported_color_ranges(&self) -> ColorRanges {
        self.supported_color_ranges
    }

    pub fn set_supported_color_ranges(&mut self, ranges: ColorRanges) -> Result<()> {
        if ranges.is_empty() {
            return Err(ConfigError::InvalidArgument(
                "supported color ranges must not be empty",
            ));
        }
        self.supported_color_ranges = ranges;
        Ok(())
    }

    pub fn set_default_color_range(&mut self, range: ColorRange) -> Result<()> {
        if !self.supported_color_ranges.contains(range.flag()) {
            return Err(ConfigError::InvalidArgument(
                "default color range is not a supported range",
            ));
        }
        self.default_color_range = range;
        Ok(())
    }

    pub fn possible_crtcs(&self) -> &LinkSet<CrtcId> {
        &self.possible_crtcs
    }

    /// Defaults are members of their supported sets, for every property.
    pub fn properties_consistent(&self) -> bool {
        self.supported_rotations.contains(self.default_rotation)
            && self
                .supported_color_encodings
                .contains(self.default_color_encoding.flag())
            && self
                .supported_color_ranges
                .contains(self.default_color_range.flag())
    }
}
