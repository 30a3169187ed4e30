//! Mode-config limits advertised by every device.

pub const XRES_MIN: u32 = 10;
pub const YRES_MIN: u32 = 10;

pub const XRES_DEF: u32 = 1024;
pub const YRES_DEF: u32 = 768;

pub const XRES_MAX: u32 = 8192;
pub const YRES_MAX: u32 = 8192;

/// Largest cursor plane, in pixels per side.
pub const CURSOR_MAX: u32 = 512;

/// Entries in the per-CRTC gamma lookup table.
pub const LUT_SIZE: usize = 256;

/// Whether a `width x height` mode fits the device limits.
pub fn mode_in_range(width: u32, height: u32) -> bool {
    (XRES_MIN..=XRES_MAX).contains(&width) && (YRES_MIN..=YRES_MAX).contains(&height)
}
