use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, Result};

const ENABLE_CURSOR_VAR: &str = "VKMS_ENABLE_CURSOR";
const ENABLE_WRITEBACK_VAR: &str = "VKMS_ENABLE_WRITEBACK";
const ENABLE_OVERLAY_VAR: &str = "VKMS_ENABLE_OVERLAY";

/// Knobs applied to the default device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceOptions {
    pub enable_cursor: bool,
    pub enable_writeback: bool,
    pub enable_overlay: bool,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            enable_cursor: true,
            enable_writeback: true,
            enable_overlay: false,
        }
    }
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool> {
    let v = raw.trim();
    if v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
    {
        Ok(true)
    } else if v == "0"
        || v.eq_ignore_ascii_case("false")
        || v.eq_ignore_ascii_case("no")
        || v.eq_ignore_ascii_case("off")
    {
        Ok(false)
    } else {
        Err(DeviceError::InvalidOption {
            var,
            value: raw.to_string(),
        })
    }
}

impl DeviceOptions {
    /// Reads `VKMS_ENABLE_CURSOR`, `VKMS_ENABLE_WRITEBACK` and `VKMS_ENABLE_OVERLAY`. Unset
    /// variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`DeviceOptions::from_env`] with a caller-provided variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        for (var, slot) in [
            (ENABLE_CURSOR_VAR, &mut options.enable_cursor),
            (ENABLE_WRITEBACK_VAR, &mut options.enable_writeback),
            (ENABLE_OVERLAY_VAR, &mut options.enable_overlay),
        ] {
            if let Some(raw) = lookup(var) {
                *slot = parse_flag(var, &raw)?;
            }
        }
        Ok(options)
    }
}
