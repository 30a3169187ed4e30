#![forbid(unsafe_code)]

//! Fixed EDID served by emulated DisplayPort sinks.
//!
//! The table describes a 24" 1920x1080@60 panel (base block plus one CTA-861 extension). It is
//! sample data: nothing here generates timings.

/// Size of one EDID block in bytes.
pub const EDID_BLOCK_SIZE: usize = 128;

/// 7-bit I2C address of the DDC EDID EEPROM.
pub const DDC_ADDR: u8 = 0x50;

/// Base block followed by a single extension block.
pub const SAMPLE_EDID: [u8; 2 * EDID_BLOCK_SIZE] = [
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x05, 0xE3, 0x01, 0x00, 0xC7, 0x04, 0x00, 0x00,
    0x26, 0x19, 0x01, 0x03, 0x80, 0x35, 0x1E, 0x78, 0x2A, 0xF6, 0xE5, 0xA7, 0x53, 0x4D, 0x99, 0x24,
    0x14, 0x50, 0x54, 0xBF, 0xEF, 0x00, 0xD1, 0xC0, 0xB3, 0x00, 0x95, 0x00, 0x81, 0x80, 0x81, 0x40,
    0x81, 0xC0, 0x01, 0x01, 0x01, 0x01, 0x02, 0x3A, 0x80, 0x18, 0x71, 0x38, 0x2D, 0x40, 0x58, 0x2C,
    0x45, 0x00, 0x13, 0x2B, 0x21, 0x00, 0x00, 0x1E, 0x00, 0x00, 0x00, 0xFD, 0x00, 0x32, 0x4C, 0x1E,
    0x53, 0x11, 0x00, 0x0A, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x00, 0x00, 0x00, 0xFC, 0x00, 0x32,
    0x34, 0x36, 0x30, 0x47, 0x35, 0x0A, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x00, 0x00, 0x00, 0xFF,
    0x00, 0x46, 0x30, 0x37, 0x46, 0x39, 0x42, 0x41, 0x30, 0x30, 0x31, 0x32, 0x32, 0x33, 0x01, 0x99,
    // CTA-861 extension block.
    0x02, 0x03, 0x1E, 0xF1, 0x4B, 0x10, 0x1F, 0x05, 0x14, 0x04, 0x13, 0x03, 0x12, 0x02, 0x11, 0x01,
    0x23, 0x09, 0x07, 0x07, 0x83, 0x01, 0x00, 0x00, 0x65, 0x03, 0x0C, 0x00, 0x10, 0x00, 0x8C, 0x0A,
    0xD0, 0x8A, 0x20, 0xE0, 0x2D, 0x10, 0x10, 0x3E, 0x96, 0x00, 0x13, 0x2B, 0x21, 0x00, 0x00, 0x18,
    0x01, 0x1D, 0x00, 0x72, 0x51, 0xD0, 0x1E, 0x20, 0x6E, 0x28, 0x55, 0x00, 0x13, 0x2B, 0x21, 0x00,
    0x00, 0x1E, 0x8C, 0x0A, 0xD0, 0x8A, 0x20, 0xE0, 0x2D, 0x10, 0x10, 0x3E, 0x96, 0x00, 0x13, 0x2B,
    0x21, 0x00, 0x00, 0x18, 0x8C, 0x0A, 0xD0, 0x90, 0x20, 0x40, 0x31, 0x20, 0x0C, 0x40, 0x55, 0x00,
    0x13, 0x2B, 0x21, 0x00, 0x00, 0x18, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xB1,
];

/// Returns EDID block `block` of [`SAMPLE_EDID`], or `None` past the advertised extensions.
pub fn read_edid(block: u8) -> Option<[u8; EDID_BLOCK_SIZE]> {
    let extensions = SAMPLE_EDID[126] as usize;
    let block = block as usize;
    if block > extensions {
        return None;
    }
    let start = block * EDID_BLOCK_SIZE;
    let bytes = SAMPLE_EDID.get(start..start + EDID_BLOCK_SIZE)?;
    let mut out = [0u8; EDID_BLOCK_SIZE];
    out.copy_from_slice(bytes);
    Some(out)
}

/// Whether every byte of `block` sums to zero modulo 256.
pub fn checksum_ok(block: &[u8]) -> bool {
    block.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) == 0
}
