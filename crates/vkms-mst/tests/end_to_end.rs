mod util;

use pretty_assertions::assert_eq;
use util::{init_tracing, root_hub_displays};
use vkms_edid::{EDID_BLOCK_SIZE, SAMPLE_EDID};
use vkms_mst::sideband::{
    req_type, NakReason, PeerDeviceType, RemoteI2cRead, ReplyBody, SidebandRequest,
};
use vkms_mst::{
    guid_for_name, guid_hex, probe, MstError, MstNodeDescription, MstTopology,
    MstTopologyDescription, MAX_HUB_CHILDREN, ROOT_PORT,
};

fn display(name: &str) -> MstNodeDescription {
    MstNodeDescription::Display {
        name: name.to_string(),
    }
}

fn hub(name: &str, children: Vec<MstNodeDescription>) -> MstNodeDescription {
    MstNodeDescription::Hub {
        name: name.to_string(),
        ports: None,
        children,
    }
}

#[test]
fn link_address_through_the_root() {
    init_tracing();
    let (mut topology, root, _hub) = root_hub_displays(2, &[2]);

    let reply = topology
        .request(root, &[], &SidebandRequest::LinkAddress)
        .unwrap();
    let ReplyBody::LinkAddress(ack) = reply.body else {
        panic!("expected a LINK_ADDRESS ack, got {reply:?}");
    };
    assert_eq!(ack.guid, guid_for_name("hub"));
    let summary: Vec<_> = ack
        .ports
        .iter()
        .map(|p| (p.port_number, p.input_port, p.peer_device_type))
        .collect();
    assert_eq!(
        summary,
        vec![
            (0, true, PeerDeviceType::SourceOrSst),
            (2, false, PeerDeviceType::SstSink),
        ]
    );
}

#[test]
fn remote_i2c_read_returns_the_edid() {
    let (mut topology, root, _hub) = root_hub_displays(1, &[1]);

    let request = SidebandRequest::RemoteI2cRead(RemoteI2cRead::edid_block(1, 1));
    let reply = topology.request(root, &[], &request).unwrap();
    let ReplyBody::RemoteI2cRead(ack) = reply.body else {
        panic!("expected a REMOTE_I2C_READ ack, got {reply:?}");
    };
    assert_eq!(ack.port_number, 1);
    assert_eq!(ack.bytes, SAMPLE_EDID[EDID_BLOCK_SIZE..].to_vec());
}

#[test]
fn remote_i2c_read_on_empty_port_is_naked() {
    let (mut topology, root, _hub) = root_hub_displays(2, &[1]);

    let request = SidebandRequest::RemoteI2cRead(RemoteI2cRead::edid_block(2, 0));
    let reply = topology.request(root, &[], &request).unwrap();
    assert!(matches!(
        reply.body,
        ReplyBody::Nak {
            reason: NakReason::BadParam,
            ..
        }
    ));
}

#[test]
fn remote_i2c_read_on_up_facing_port_is_naked() {
    let (mut topology, root, _hub) = root_hub_displays(2, &[1]);

    let request = SidebandRequest::RemoteI2cRead(RemoteI2cRead::edid_block(0, 0));
    let reply = topology.request(root, &[], &request).unwrap();
    assert!(matches!(
        reply.body,
        ReplyBody::Nak {
            reason: NakReason::BadParam,
            ..
        }
    ));
}

#[test]
fn requests_reach_the_second_level() {
    let description = MstTopologyDescription {
        root: "root".to_string(),
        branch: hub("top", vec![display("left"), hub("inner", vec![display("deep")])]),
    };
    let (mut topology, root) = MstTopology::from_description(&description).unwrap();

    let reply = topology
        .request(root, &[2], &SidebandRequest::LinkAddress)
        .unwrap();
    let ReplyBody::LinkAddress(ack) = reply.body else {
        panic!("expected a LINK_ADDRESS ack, got {reply:?}");
    };
    assert_eq!(ack.guid, guid_for_name("inner"));

    let reply = topology
        .request(root, &[2, 1], &SidebandRequest::LinkAddress)
        .unwrap();
    let ReplyBody::LinkAddress(ack) = reply.body else {
        panic!("expected a LINK_ADDRESS ack, got {reply:?}");
    };
    assert_eq!(ack.guid, guid_for_name("deep"));
}

#[test]
fn probe_walks_nested_hubs() {
    init_tracing();
    let description = MstTopologyDescription {
        root: "root".to_string(),
        branch: hub("top", vec![display("left"), hub("inner", vec![display("deep")])]),
    };
    let (mut topology, root) = MstTopology::from_description(&description).unwrap();

    let tree = probe(&mut topology, root).unwrap();
    assert_eq!(tree.path, Vec::<u8>::new());
    assert_eq!(tree.guid, guid_hex(&guid_for_name("top")));
    assert_eq!(tree.ports.len(), 2);

    let left = &tree.ports[0];
    assert_eq!(left.port, 1);
    assert_eq!(left.peer_device_type, PeerDeviceType::SstSink);
    assert_eq!(
        left.edid.as_deref(),
        Some(&SAMPLE_EDID[..EDID_BLOCK_SIZE])
    );

    let inner = tree.ports[1].branch.as_ref().unwrap();
    assert_eq!(tree.ports[1].peer_device_type, PeerDeviceType::MstBranching);
    assert_eq!(inner.path, vec![2]);
    assert_eq!(inner.guid, guid_hex(&guid_for_name("inner")));
    assert_eq!(inner.ports.len(), 1);
    assert_eq!(
        inner.ports[0].edid.as_deref(),
        Some(&SAMPLE_EDID[..EDID_BLOCK_SIZE])
    );

    let json = serde_json::to_value(&tree).unwrap();
    assert_eq!(json["ports"][1]["peer_device_type"], "mst_branching");
    assert_eq!(json["ports"][1]["branch"]["path"], serde_json::json!([2]));
}

#[test]
fn full_hub_reply_spans_several_chunks() {
    let children: Vec<u8> = (1..=MAX_HUB_CHILDREN).collect();
    let (mut topology, root, _hub) = root_hub_displays(MAX_HUB_CHILDREN, &children);

    let reply = topology
        .request(root, &[], &SidebandRequest::LinkAddress)
        .unwrap();
    let ReplyBody::LinkAddress(ack) = reply.body else {
        panic!("expected a LINK_ADDRESS ack, got {reply:?}");
    };
    assert_eq!(ack.ports.len(), usize::from(MAX_HUB_CHILDREN) + 1);
    for (port, descriptor) in ack.ports.iter().enumerate().skip(1) {
        assert_eq!(descriptor.port_number as usize, port);
        assert_eq!(
            descriptor.peer_guid,
            guid_for_name(&format!("display-{port}"))
        );
    }
}

#[test]
fn back_to_back_requests_alternate_sequence_numbers() {
    let (mut topology, root, _hub) = root_hub_displays(1, &[1]);

    let first = topology
        .submit_request(root, &[], &SidebandRequest::ClearPayloadIdTable)
        .unwrap();
    let second = topology
        .submit_request(root, &[], &SidebandRequest::EnumPathResources { port_number: 1 })
        .unwrap();
    assert_ne!(first, second);
    topology.run_until_idle();

    let a = topology.take_reply(root).unwrap().unwrap();
    let b = topology.take_reply(root).unwrap().unwrap();
    assert_eq!(
        (a.reply.req_type, a.header.seqno),
        (req_type::CLEAR_PAYLOAD_ID_TABLE, first)
    );
    assert_eq!(
        (b.reply.req_type, b.header.seqno),
        (req_type::ENUM_PATH_RESOURCES, second)
    );
    assert!(topology.take_reply(root).unwrap().is_none());
}

#[test]
fn unreachable_target_times_out() {
    init_tracing();
    let (mut topology, root, hub) = root_hub_displays(2, &[1]);

    assert_eq!(
        topology.request(root, &[2], &SidebandRequest::LinkAddress),
        Err(MstError::Timeout { port: ROOT_PORT })
    );

    // The client recovers once the request is abandoned.
    let reply = topology
        .request(root, &[], &SidebandRequest::ClearPayloadIdTable)
        .unwrap();
    assert_eq!(reply.body, ReplyBody::ClearPayloadIdTable);

    topology.remove_device(hub).unwrap();
    assert_eq!(
        topology.request(root, &[], &SidebandRequest::LinkAddress),
        Err(MstError::Timeout { port: ROOT_PORT })
    );
}

#[test]
fn removed_display_is_reported_unplugged() {
    let (mut topology, root, hub) = root_hub_displays(2, &[1, 2]);
    let gone = topology.find("display-2").unwrap();
    topology.remove_device(gone).unwrap();

    let reply = topology
        .request(root, &[], &SidebandRequest::LinkAddress)
        .unwrap();
    let ReplyBody::LinkAddress(ack) = reply.body else {
        panic!("expected a LINK_ADDRESS ack, got {reply:?}");
    };
    let numbers: Vec<u8> = ack.ports.iter().map(|p| p.port_number).collect();
    assert_eq!(numbers, vec![0, 1]);
    assert_eq!(topology.device(hub).unwrap().emulator().link(2), None);
}
