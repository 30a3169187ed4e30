#![allow(dead_code)]

use vkms_mst::{MstNodeDescription, MstTopologyDescription};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn display(name: &str) -> MstNodeDescription {
    MstNodeDescription::Display {
        name: name.to_string(),
    }
}

pub fn hub(name: &str, children: Vec<MstNodeDescription>) -> MstNodeDescription {
    MstNodeDescription::Hub {
        name: name.to_string(),
        ports: None,
        children,
    }
}

/// A dock with two monitors, one of them behind a daisy-chained hub.
pub fn dock() -> MstTopologyDescription {
    MstTopologyDescription {
        root: "gpu".to_string(),
        branch: hub(
            "dock",
            vec![display("monitor-a"), hub("chain", vec![display("monitor-b")])],
        ),
    }
}
