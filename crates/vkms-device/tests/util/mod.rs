#![allow(dead_code)]

use vkms_config::{ConfigDescription, VkmsConfig};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Two CRTCs sharing an encoder, a connector and a cursor on the second CRTC.
pub const DUAL_HEAD: &str = r#"{
    "writeback": true,
    "crtcs": [
        { "name": "left", "writeback": true },
        { "name": "right" }
    ],
    "planes": [
        { "name": "left-primary", "type": "primary", "possible_crtcs": ["left"] },
        { "name": "right-primary", "type": "primary", "possible_crtcs": ["right"] },
        { "name": "right-cursor", "type": "cursor", "possible_crtcs": ["right"] },
        { "name": "shared", "possible_crtcs": ["left", "right"] }
    ],
    "encoders": [
        { "name": "enc", "possible_crtcs": ["left", "right"] }
    ],
    "connectors": [
        { "name": "virtual-1", "possible_encoders": ["enc"] }
    ]
}"#;

pub fn config_from_json(json: &str) -> VkmsConfig {
    let description: ConfigDescription = serde_json::from_str(json).unwrap();
    description.build().unwrap()
}
