mod util;

use pretty_assertions::assert_eq;
use util::{init_tracing, read_reply, send_raw, send_request, Probe};
use vkms_mst::dpcd::SIDEBAND_MSG_DOWN_REQ_BASE;
use vkms_mst::sideband::{
    decode_chunk, req_type, EnumPathResourcesAck, NakReason, PeerDeviceType, ReplyBody,
    SidebandMsgHeader, SidebandReply, SidebandRequest,
};
use vkms_mst::{guid_for_name, AuxChannel, MstTopology, HUB_PBN, WORK_QUEUE_DEPTH};

#[test]
fn link_address_on_unconnected_hub_has_no_ports() {
    init_tracing();
    let mut topology = MstTopology::new();
    let hub = topology.add_hub("hub", 4).unwrap();

    send_request(&mut topology, hub, 0, &[], &SidebandRequest::LinkAddress);
    topology.run_until_idle();

    let (header, reply) = read_reply(&mut topology, hub, 0).unwrap();
    assert_eq!(header.lct, 1);
    assert_eq!(header.lcr, 0);
    assert!(reply.is_ack());
    match reply.body {
        ReplyBody::LinkAddress(ack) => {
            assert_eq!(ack.guid, guid_for_name("hub"));
            assert!(ack.ports.is_empty());
        }
        other => panic!("unexpected reply {other:?}"),
    }
}

#[test]
fn request_with_links_remaining_is_forwarded() {
    init_tracing();
    let mut topology = MstTopology::new();
    let hub = topology.add_hub("hub", 2).unwrap();
    let display = topology.add_display("display");
    topology.connect(hub, 2, display, 0).unwrap();

    send_request(&mut topology, hub, 0, &[2], &SidebandRequest::LinkAddress);
    topology.run_until_idle();

    // What reached the display: one link consumed, the RAD now leads back to the hub's input.
    let forwarded = topology.device(display).unwrap().emulator().dpcd.down_req;
    let (header, body) = decode_chunk(&forwarded).unwrap();
    assert_eq!((header.lct, header.lcr), (2, 0));
    assert_eq!(header.rad.nibble(0), 0);
    assert_eq!(body, &[req_type::LINK_ADDRESS]);

    // The answer comes from the display, relayed with the original route restored.
    let (header, reply) = read_reply(&mut topology, hub, 0).unwrap();
    assert_eq!((header.lct, header.lcr), (2, 0));
    assert_eq!(header.rad.nibble(0), 2);
    match reply.body {
        ReplyBody::LinkAddress(ack) => {
            assert_eq!(ack.guid, guid_for_name("display"));
            assert_eq!(ack.ports.len(), 1);
            assert!(ack.ports[0].input_port);
        }
        other => panic!("unexpected reply {other:?}"),
    }
}

#[test]
fn hub_describes_its_children() {
    let (mut topology, _root, hub) = util::root_hub_displays(3, &[1, 3]);
    topology.disconnect(hub, 0).unwrap();

    send_request(&mut topology, hub, 0, &[], &SidebandRequest::LinkAddress);
    topology.run_until_idle();
    let (_, reply) = read_reply(&mut topology, hub, 0).unwrap();

    let ReplyBody::LinkAddress(ack) = reply.body else {
        panic!("expected a LINK_ADDRESS ack");
    };
    let ports: Vec<_> = ack
        .ports
        .iter()
        .map(|p| (p.port_number, p.input_port, p.peer_device_type))
        .collect();
    // The up-facing port was unplugged for the test, so only the children remain.
    assert_eq!(
        ports,
        vec![
            (1, false, PeerDeviceType::SstSink),
            (3, false, PeerDeviceType::SstSink)
        ]
    );
    assert_eq!(ack.ports[0].peer_guid, guid_for_name("display-1"));
    assert_eq!(ack.ports[0].dpcd_revision, 0x14);
    assert_eq!(
        (ack.ports[0].num_sdp_streams, ack.ports[0].num_sdp_stream_sinks),
        (1, 1)
    );
}

#[test]
fn unsupported_request_is_naked_with_bad_param() {
    let mut topology = MstTopology::new();
    let display = topology.add_display("display");

    let request = SidebandRequest::Other {
        req_type: req_type::REMOTE_DPCD_READ,
        payload: vec![0x10, 0x00, 0x00, 0x01],
    };
    send_request(&mut topology, display, 0, &[], &request);
    topology.run_until_idle();

    let (_, reply) = read_reply(&mut topology, display, 0).unwrap();
    assert_eq!(
        reply,
        SidebandReply::nak(
            req_type::REMOTE_DPCD_READ,
            guid_for_name("display"),
            NakReason::BadParam
        )
    );
}

#[test]
fn display_does_not_enumerate_path_resources() {
    let mut topology = MstTopology::new();
    let display = topology.add_display("display");
    send_request(
        &mut topology,
        display,
        0,
        &[],
        &SidebandRequest::EnumPathResources { port_number: 0 },
    );
    topology.run_until_idle();
    let (_, reply) = read_reply(&mut topology, display, 0).unwrap();
    assert!(!reply.is_ack());
}

#[test]
fn hub_handles_path_resources_and_payload_table_clear() {
    let mut topology = MstTopology::new();
    let hub = topology.add_hub("hub", 2).unwrap();

    send_request(
        &mut topology,
        hub,
        0,
        &[],
        &SidebandRequest::EnumPathResources { port_number: 2 },
    );
    topology.run_until_idle();
    let (_, reply) = read_reply(&mut topology, hub, 0).unwrap();
    assert_eq!(
        reply.body,
        ReplyBody::EnumPathResources(EnumPathResourcesAck {
            port_number: 2,
            fec_capable: false,
            full_payload_bw_number: HUB_PBN,
            avail_payload_bw_number: HUB_PBN,
        })
    );

    send_request(&mut topology, hub, 0, &[], &SidebandRequest::ClearPayloadIdTable);
    topology.run_until_idle();
    let (_, reply) = read_reply(&mut topology, hub, 0).unwrap();
    assert_eq!(reply.body, ReplyBody::ClearPayloadIdTable);
}

#[test]
fn malformed_header_gets_no_reply() {
    init_tracing();
    let mut topology = MstTopology::new();
    let hub = topology.add_hub("hub", 1).unwrap();

    let mut aux = Probe::new(&mut topology, hub, 0);
    // LCT 1 with a wrong header CRC.
    aux.write_dpcd(SIDEBAND_MSG_DOWN_REQ_BASE, &[0x10, 0x02, 0xc5, 0x01, 0x00])
        .unwrap();
    assert_eq!(topology.run_until_idle(), 1);
    assert_eq!(topology.device(hub).unwrap().emulator().pending_replies(), 0);
    assert!(read_reply(&mut topology, hub, 0).is_none());
}

#[test]
fn forward_to_empty_port_is_dropped() {
    init_tracing();
    let mut topology = MstTopology::new();
    let hub = topology.add_hub("hub", 2).unwrap();

    send_request(&mut topology, hub, 0, &[1], &SidebandRequest::LinkAddress);
    topology.run_until_idle();
    assert!(read_reply(&mut topology, hub, 0).is_none());
}

#[test]
fn broadcast_is_answered_locally() {
    let mut topology = MstTopology::new();
    let hub = topology.add_hub("hub", 1).unwrap();
    let display = topology.add_display("display");
    topology.connect(hub, 1, display, 0).unwrap();

    let header = SidebandMsgHeader {
        lct: 1,
        lcr: 6,
        broadcast: true,
        ..SidebandMsgHeader::default()
    };
    send_raw(
        &mut topology,
        hub,
        0,
        &header,
        &SidebandRequest::ClearPayloadIdTable.encode().unwrap(),
    );
    topology.run_until_idle();

    let (reply_header, reply) = read_reply(&mut topology, hub, 0).unwrap();
    assert!(reply_header.broadcast);
    assert_eq!(reply.body, ReplyBody::ClearPayloadIdTable);
    assert_eq!(
        topology.device(display).unwrap().emulator().dpcd.down_req[0],
        0
    );
}

#[test]
fn requests_arriving_back_to_back_are_queued_in_order() {
    let mut topology = MstTopology::new();
    let hub = topology.add_hub("hub", 2).unwrap();

    send_request(
        &mut topology,
        hub,
        0,
        &[],
        &SidebandRequest::EnumPathResources { port_number: 1 },
    );
    send_request(&mut topology, hub, 0, &[], &SidebandRequest::ClearPayloadIdTable);
    assert_eq!(topology.pending_work(), 2);
    topology.run_until_idle();

    let (_, first) = read_reply(&mut topology, hub, 0).unwrap();
    let (_, second) = read_reply(&mut topology, hub, 0).unwrap();
    assert_eq!(first.req_type, req_type::ENUM_PATH_RESOURCES);
    assert_eq!(second.req_type, req_type::CLEAR_PAYLOAD_ID_TABLE);
}

#[test]
fn work_queue_overflow_drops_newest() {
    init_tracing();
    let mut topology = MstTopology::new();
    let hub = topology.add_hub("hub", 1).unwrap();

    for _ in 0..WORK_QUEUE_DEPTH + 4 {
        send_request(&mut topology, hub, 0, &[], &SidebandRequest::ClearPayloadIdTable);
    }
    assert_eq!(topology.pending_work(), WORK_QUEUE_DEPTH);
    assert_eq!(topology.run_until_idle(), WORK_QUEUE_DEPTH);
    assert_eq!(
        topology.device(hub).unwrap().emulator().pending_replies(),
        WORK_QUEUE_DEPTH
    );
}

#[test]
fn byte_sized_writes_still_frame_a_request() {
    let mut topology = MstTopology::new();
    let hub = topology.add_hub("hub", 1).unwrap();

    let header = SidebandMsgHeader::for_path(&[]).unwrap();
    let body = SidebandRequest::ClearPayloadIdTable.encode().unwrap();
    let chunk = vkms_mst::sideband::encode_chunks(&header, &body).remove(0);
    {
        let mut aux = Probe::new(&mut topology, hub, 0);
        for (i, byte) in chunk.iter().enumerate() {
            aux.write_dpcd(SIDEBAND_MSG_DOWN_REQ_BASE + i as u32, &[*byte])
                .unwrap();
        }
    }
    assert_eq!(topology.pending_work(), 1);
    topology.run_until_idle();
    let (_, reply) = read_reply(&mut topology, hub, 0).unwrap();
    assert_eq!(reply.body, ReplyBody::ClearPayloadIdTable);
}
