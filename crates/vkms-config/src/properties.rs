use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

bitflags! {
    /// Plane rotation/reflection bits, laid out like the display core's rotation property.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Rotation: u32 {
        const ROTATE_0 = 1 << 0;
        const ROTATE_90 = 1 << 1;
        const ROTATE_180 = 1 << 2;
        const ROTATE_270 = 1 << 3;
        const REFLECT_X = 1 << 4;
        const REFLECT_Y = 1 << 5;
    }
}

impl Rotation {
    pub const ROTATE_MASK: Self = Self::ROTATE_0
        .union(Self::ROTATE_90)
        .union(Self::ROTATE_180)
        .union(Self::ROTATE_270);
    pub const REFLECT_MASK: Self = Self::REFLECT_X.union(Self::REFLECT_Y);

    /// Checks that `bits` is usable as a supported-rotations mask: only known bits, and at
    /// least one rotation.
    pub fn supported_from_bits(bits: u32) -> Result<Self> {
        let rotation = Self::from_bits(bits)
            .ok_or(ConfigError::InvalidArgument("unknown rotation bits"))?;
        if !rotation.intersects(Self::ROTATE_MASK) {
            return Err(ConfigError::InvalidArgument(
                "supported rotations must include a rotation angle",
            ));
        }
        Ok(rotation)
    }

    /// Checks that `bits` names a single rotation state: exactly one angle, plus any reflections.
    pub fn single_from_bits(bits: u32) -> Result<Self> {
        let rotation = Self::from_bits(bits)
            .ok_or(ConfigError::InvalidArgument("unknown rotation bits"))?;
        if rotation.intersection(Self::ROTATE_MASK).bits().count_ones() != 1 {
            return Err(ConfigError::InvalidArgument(
                "rotation must contain exactly one angle",
            ));
        }
        Ok(rotation)
    }
}

/// YCbCr to RGB conversion standard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorEncoding {
    #[default]
    Bt601,
    Bt709,
    Bt2020,
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ColorEncodings: u32 {
        const BT601 = 1 << 0;
        const BT709 = 1 << 1;
        const BT2020 = 1 << 2;
    }
}

impl ColorEncoding {
    pub const fn flag(self) -> ColorEncodings {
        match self {
            ColorEncoding::Bt601 => ColorEncodings::BT601,
            ColorEncoding::Bt709 => ColorEncodings::BT709,
            ColorEncoding::Bt2020 => ColorEncodings::BT2020,
        }
    }
}

/// YCbCr quantization range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorRange {
    Limited,
    #[default]
    Full,
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ColorRanges: u32 {
        const LIMITED = 1 << 0;
        const FULL = 1 << 1;
    }
}

impl ColorRange {
    pub const fn flag(self) -> ColorRanges {
        match self {
            ColorRange::Limited => ColorRanges::LIMITED,
            ColorRange::Full => ColorRanges::FULL,
        }
    }
}

/// Role of a plane within the CRTC it feeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneType {
    #[default]
    Overlay,
    Primary,
    Cursor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_rotation_requires_an_angle() {
        assert!(Rotation::supported_from_bits(Rotation::REFLECT_MASK.bits()).is_err());
        assert_eq!(
            Rotation::supported_from_bits(0x3f).unwrap(),
            Rotation::ROTATE_MASK | Rotation::REFLECT_MASK
        );
        assert!(Rotation::supported_from_bits(1 << 6).is_err());
    }

    #[test]
    fn single_rotation_rejects_multiple_angles() {
        let bits = (Rotation::ROTATE_0 | Rotation::ROTATE_90).bits();
        assert!(Rotation::single_from_bits(bits).is_err());
        assert!(Rotation::single_from_bits(0).is_err());

        let flipped = Rotation::ROTATE_180 | Rotation::REFLECT_X;
        assert_eq!(Rotation::single_from_bits(flipped.bits()).unwrap(), flipped);
    }

    #[test]
    fn encoding_and_range_flags_are_distinct() {
        assert_eq!(
            ColorEncoding::Bt601.flag() | ColorEncoding::Bt709.flag() | ColorEncoding::Bt2020.flag(),
            ColorEncodings::all()
        );
        assert_eq!(ColorRange::Limited.flag() | ColorRange::Full.flag(), ColorRanges::all());
    }
}
