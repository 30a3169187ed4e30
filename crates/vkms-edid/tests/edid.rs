use vkms_edid::{checksum_ok, read_edid, SAMPLE_EDID};

#[test]
fn base_block_has_valid_header_and_checksum() {
    let edid = read_edid(0).expect("missing base EDID");
    assert_eq!(
        &edid[0..8],
        &[0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00]
    );
    assert!(checksum_ok(&edid));
}

#[test]
fn extension_block_is_cta_and_checksummed() {
    let ext = read_edid(1).expect("missing extension block");
    assert_eq!(ext[0], 0x02, "CTA-861 extension tag");
    assert!(checksum_ok(&ext));
}

#[test]
fn read_edid_stops_after_advertised_extensions() {
    assert_eq!(SAMPLE_EDID[126], 1);
    assert!(read_edid(2).is_none());
    assert!(read_edid(u8::MAX).is_none());
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Dtd {
    h_active: u16,
    v_active: u16,
    pixel_clock_hz: u64,
    h_total: u32,
    v_total: u32,
}

impl Dtd {
    fn refresh_hz(self) -> f64 {
        let denom = self.h_total as f64 * self.v_total as f64;
        if denom == 0.0 {
            return 0.0;
        }
        self.pixel_clock_hz as f64 / denom
    }
}

fn parse_dtd(bytes: &[u8]) -> Option<Dtd> {
    if bytes.len() != 18 {
        return None;
    }
    let pixel_clock_10khz = u16::from_le_bytes([bytes[0], bytes[1]]);
    if pixel_clock_10khz == 0 {
        return None;
    }
    let h_active = bytes[2] as u16 | (((bytes[4] & 0xF0) as u16) << 4);
    let h_blank = bytes[3] as u16 | (((bytes[4] & 0x0F) as u16) << 8);
    let v_active = bytes[5] as u16 | (((bytes[7] & 0xF0) as u16) << 4);
    let v_blank = bytes[6] as u16 | (((bytes[7] & 0x0F) as u16) << 8);
    Some(Dtd {
        h_active,
        v_active,
        pixel_clock_hz: pixel_clock_10khz as u64 * 10_000,
        h_total: h_active as u32 + h_blank as u32,
        v_total: v_active as u32 + v_blank as u32,
    })
}

#[test]
fn preferred_mode_is_1080p60() {
    let edid = read_edid(0).unwrap();
    let dtd = parse_dtd(&edid[54..72]).expect("missing preferred DTD");
    assert_eq!((dtd.h_active, dtd.v_active), (1920, 1080));
    assert_eq!(dtd.pixel_clock_hz, 148_500_000);
    assert!((dtd.refresh_hz() - 60.0).abs() < 0.1);
}

#[test]
fn range_limits_cover_preferred_mode() {
    let edid = read_edid(0).unwrap();
    let range = &edid[72..90];
    assert_eq!(&range[0..5], &[0, 0, 0, 0xFD, 0x00]);
    let (min_v, max_v) = (range[5], range[6]);
    assert!(min_v <= 60 && 60 <= max_v, "{min_v}..={max_v}");
}

#[test]
fn monitor_name_descriptor_is_present() {
    let edid = read_edid(0).unwrap();
    let name = &edid[90..108];
    assert_eq!(&name[0..5], &[0, 0, 0, 0xFC, 0x00]);
    assert_eq!(&name[5..11], b"2460G5");
}

