/// CRC4 (polynomial x^4 + x + 1) over the first `num_nibbles` nibbles of `data`, most
/// significant nibble first.
pub fn header_crc4(data: &[u8], num_nibbles: usize) -> u8 {
    let mut remainder: u8 = 0;
    for bit in 0..num_nibbles * 4 {
        let byte = data.get(bit / 8).copied().unwrap_or(0);
        remainder = (remainder << 1) | ((byte >> (7 - bit % 8)) & 1);
        if remainder & 0x10 != 0 {
            remainder ^= 0x13;
        }
    }
    for _ in 0..4 {
        remainder <<= 1;
        if remainder & 0x10 != 0 {
            remainder ^= 0x13;
        }
    }
    remainder & 0xf
}

/// CRC8 (polynomial x^8 + x^7 + x^6 + x^4 + x^2 + 1) over a chunk body.
pub fn data_crc8(data: &[u8]) -> u8 {
    let mut remainder: u16 = 0;
    for &byte in data {
        for shift in (0..8).rev() {
            remainder = (remainder << 1) | u16::from((byte >> shift) & 1);
            if remainder & 0x100 != 0 {
                remainder ^= 0xd5;
            }
        }
    }
    for _ in 0..8 {
        remainder <<= 1;
        if remainder & 0x100 != 0 {
            remainder ^= 0xd5;
        }
    }
    (remainder & 0xff) as u8
}
