#![allow(dead_code)]

use vkms_config::{CrtcId, EncoderId, PlaneId, PlaneType, VkmsConfig};

pub fn add_plane(config: &mut VkmsConfig, name: &str, plane_type: PlaneType) -> PlaneId {
    let id = config.create_plane();
    let plane = config.plane_mut(id).unwrap();
    plane.set_name(name);
    plane.set_plane_type(plane_type);
    id
}

pub fn add_crtc(config: &mut VkmsConfig, name: &str) -> CrtcId {
    let id = config.create_crtc();
    config.crtc_mut(id).unwrap().set_name(name);
    id
}

pub fn add_encoder(config: &mut VkmsConfig, name: &str) -> EncoderId {
    let id = config.create_encoder();
    config.encoder_mut(id).unwrap().set_name(name);
    id
}

/// One CRTC fed by one primary plane and driven by one encoder.
pub fn single_pipe() -> (VkmsConfig, PlaneId, CrtcId, EncoderId) {
    let mut config = VkmsConfig::new();
    let plane = add_plane(&mut config, "primary", PlaneType::Primary);
    let crtc = add_crtc(&mut config, "crtc");
    let encoder = add_encoder(&mut config, "encoder");
    config.attach_plane_to_crtc(plane, crtc).unwrap();
    config.attach_encoder_to_crtc(encoder, crtc).unwrap();
    (config, plane, crtc, encoder)
}

/// Asserts that every link recorded on one side is mirrored on the other.
pub fn assert_symmetric(config: &VkmsConfig) {
    for plane in config.planes() {
        for crtc in plane.possible_crtcs().iter() {
            let crtc = config.crtc(crtc).expect("plane links a deleted CRTC");
            assert!(crtc.possible_planes().contains(plane.id()));
        }
    }
    for crtc in config.crtcs() {
        for plane in crtc.possible_planes().iter() {
            let plane = config.plane(plane).expect("CRTC links a deleted plane");
            assert!(plane.possible_crtcs().contains(crtc.id()));
        }
        for encoder in crtc.possible_encoders().iter() {
            let encoder = config.encoder(encoder).expect("CRTC links a deleted encoder");
            assert!(encoder.possible_crtcs().contains(crtc.id()));
        }
    }
    for encoder in config.encoders() {
        for crtc in encoder.possible_crtcs().iter() {
            let crtc = config.crtc(crtc).expect("encoder links a deleted CRTC");
            assert!(crtc.possible_encoders().contains(encoder.id()));
        }
        for connector in encoder.possible_connectors().iter() {
            let connector = config
                .connector(connector)
                .expect("encoder links a deleted connector");
            assert!(connector.possible_encoders().contains(encoder.id()));
        }
    }
}
