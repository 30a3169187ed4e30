#![allow(dead_code)]

use vkms_mst::dpcd::{
    DEVICE_SERVICE_IRQ_VECTOR_ESI0, DOWN_REP_MSG_RDY, SIDEBAND_MSG_DOWN_REP_BASE,
    SIDEBAND_MSG_DOWN_REQ_BASE,
};
use vkms_mst::sideband::{
    decode_chunk, encode_chunks, MsgAssembler, SidebandMsgHeader, SidebandReply,
    SidebandRequest, SIDEBAND_CHUNK_MAX,
};
use vkms_mst::{AuxChannel, AuxMsg, DeviceId, MstTopology};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// AUX access to one port of a device, as if a cable were plugged into it.
pub struct Probe<'a> {
    pub topology: &'a mut MstTopology,
    pub device: DeviceId,
    pub port: u8,
}

impl<'a> Probe<'a> {
    pub fn new(topology: &'a mut MstTopology, device: DeviceId, port: u8) -> Self {
        Self {
            topology,
            device,
            port,
        }
    }
}

impl AuxChannel for Probe<'_> {
    fn transfer(&mut self, msg: &mut AuxMsg) -> vkms_mst::Result<usize> {
        self.topology.transfer(self.device, self.port, msg)
    }
}

/// Writes `request` into the down-request window of `device`, chunk by chunk.
pub fn send_request(
    topology: &mut MstTopology,
    device: DeviceId,
    port: u8,
    path: &[u8],
    request: &SidebandRequest,
) {
    let header = SidebandMsgHeader::for_path(path).unwrap();
    send_raw(topology, device, port, &header, &request.encode().unwrap());
}

pub fn send_raw(
    topology: &mut MstTopology,
    device: DeviceId,
    port: u8,
    header: &SidebandMsgHeader,
    body: &[u8],
) {
    let mut aux = Probe::new(topology, device, port);
    for chunk in encode_chunks(header, body) {
        aux.write_dpcd_split(SIDEBAND_MSG_DOWN_REQ_BASE, &chunk)
            .unwrap();
    }
}

/// Drains whatever reply `device` has staged, acknowledging each chunk.
pub fn read_reply(
    topology: &mut MstTopology,
    device: DeviceId,
    port: u8,
) -> Option<(SidebandMsgHeader, SidebandReply)> {
    let mut aux = Probe::new(topology, device, port);
    let mut assembler = MsgAssembler::new();
    loop {
        let esi = aux.read_dpcd_byte(DEVICE_SERVICE_IRQ_VECTOR_ESI0).unwrap();
        if esi & DOWN_REP_MSG_RDY == 0 {
            return None;
        }
        let chunk = aux
            .read_dpcd_split(SIDEBAND_MSG_DOWN_REP_BASE, SIDEBAND_CHUNK_MAX)
            .unwrap();
        let (header, body) = decode_chunk(&chunk).unwrap();
        let done = assembler.push(&header, body);
        aux.write_dpcd(DEVICE_SERVICE_IRQ_VECTOR_ESI0, &[DOWN_REP_MSG_RDY])
            .unwrap();
        if let Some((header, body)) = done {
            return Some((header, SidebandReply::decode(&body).unwrap()));
        }
    }
}

/// Root, one hub with `children` ports, and a display on each of `displays`.
pub fn root_hub_displays(children: u8, displays: &[u8]) -> (MstTopology, DeviceId, DeviceId) {
    let mut topology = MstTopology::new();
    let root = topology.add_root("root");
    let hub = topology.add_hub("hub", children).unwrap();
    topology.connect(root, 0, hub, 0).unwrap();
    for &port in displays {
        let display = topology.add_display(&format!("display-{port}"));
        topology.connect(hub, port, display, 0).unwrap();
    }
    (topology, root, hub)
}
