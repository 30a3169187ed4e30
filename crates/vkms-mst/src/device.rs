//! Device model interface and the request worker shared by every variant.

use std::any::Any;

use crate::aux::{AuxChannel, AuxMsg, AuxRequest};
use crate::dpcd::{
    DOWNSTREAMPORT_PRESENT, DPCD_REV, DWN_STRM_PORT_PRESENT, DWN_STRM_PORT_TYPE_ANALOG,
    DWN_STRM_PORT_TYPE_MASK, DWN_STRM_PORT_TYPE_OTHER, DWN_STRM_PORT_TYPE_TMDS, MSTM_CAP,
    MST_CAP, SIDEBAND_MSG_DOWN_REQ_BASE,
};
use crate::emulator::{MstEmulator, PortKind, PortLink};
use crate::error::{MstError, ProtocolError, Result};
use crate::sideband::{
    decode_chunk, encode_chunk, request_name, LinkAddressAck, LinkAddressPort, MsgAssembler,
    NakReason, PeerDeviceType, RemoteI2cRead, ReplyBody, SidebandReply, SidebandRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Hub,
    Display,
    Root,
}

/// Delivers AUX transactions across links. Implemented by the topology.
pub trait PortBus {
    fn deliver(&mut self, link: PortLink, msg: &mut AuxMsg) -> Result<usize>;
}

/// What a device model gets to work with while handling a request or an interrupt.
pub struct DeviceCtx<'a> {
    pub emu: &'a mut MstEmulator,
    bus: &'a mut dyn PortBus,
}

impl<'a> DeviceCtx<'a> {
    pub(crate) fn new(emu: &'a mut MstEmulator, bus: &'a mut dyn PortBus) -> Self {
        Self { emu, bus }
    }

    /// Sends `msg` out of `port` to whatever is linked there.
    pub fn route(&mut self, port: u8, msg: &mut AuxMsg) -> Result<usize> {
        let link = self.emu.link(port).ok_or(MstError::Timeout { port })?;
        self.bus.deliver(link, msg)
    }

    /// AUX channel view of one port.
    pub fn aux(&mut self, port: u8) -> PortAux<'_, 'a> {
        PortAux { ctx: self, port }
    }
}

pub struct PortAux<'c, 'a> {
    ctx: &'c mut DeviceCtx<'a>,
    port: u8,
}

impl AuxChannel for PortAux<'_, '_> {
    fn transfer(&mut self, msg: &mut AuxMsg) -> Result<usize> {
        self.ctx.route(self.port, msg)
    }
}

pub type SidebandResult = std::result::Result<ReplyBody, NakReason>;

/// Variant-specific behaviour plugged into an [`MstDevice`].
///
/// Every hook has a default so variants only override what they support; unsupported
/// sideband requests are answered with a `BAD_PARAM` NAK and unsupported AUX kinds are
/// NACKed.
pub trait MstDeviceModel: Any {
    fn kind(&self) -> DeviceKind;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Whether native AUX requests reach the DPCD bank.
    fn native_aux(&self) -> bool {
        true
    }

    fn i2c_read(&mut self, msg: &mut AuxMsg) -> Result<usize> {
        Err(msg.reject(ProtocolError::UnsupportedRequest {
            request: msg.request,
        }))
    }

    fn i2c_write(&mut self, msg: &mut AuxMsg) -> Result<usize> {
        Err(msg.reject(ProtocolError::UnsupportedRequest {
            request: msg.request,
        }))
    }

    fn link_address(&mut self, ctx: &mut DeviceCtx<'_>) -> SidebandResult {
        Ok(ReplyBody::LinkAddress(link_address_reply(ctx)))
    }

    fn clear_payload_id_table(&mut self, _ctx: &mut DeviceCtx<'_>) -> SidebandResult {
        Err(NakReason::BadParam)
    }

    fn enum_path_resources(&mut self, _ctx: &mut DeviceCtx<'_>, _port: u8) -> SidebandResult {
        Err(NakReason::BadParam)
    }

    fn remote_i2c_read(
        &mut self,
        _ctx: &mut DeviceCtx<'_>,
        _request: &RemoteI2cRead,
    ) -> SidebandResult {
        Err(NakReason::BadParam)
    }

    /// The peer behind `port` raised its interrupt line.
    fn irq(&mut self, ctx: &mut DeviceCtx<'_>, port: u8) {
        tracing::warn!(device = %ctx.emu.name, port, "IRQ on a device without an IRQ handler");
    }

    /// New outbound work is available.
    fn kick(&mut self, _ctx: &mut DeviceCtx<'_>) {}
}

fn classify_peer(downstream: u8, mstm_cap: u8) -> PeerDeviceType {
    if downstream & DWN_STRM_PORT_PRESENT != 0 {
        match downstream & DWN_STRM_PORT_TYPE_MASK {
            DWN_STRM_PORT_TYPE_ANALOG | DWN_STRM_PORT_TYPE_TMDS => {
                return PeerDeviceType::DpLegacyConv
            }
            DWN_STRM_PORT_TYPE_OTHER => return PeerDeviceType::Wireless,
            _ => {}
        }
    }
    if mstm_cap & MST_CAP != 0 {
        PeerDeviceType::MstBranching
    } else {
        PeerDeviceType::SstSink
    }
}

fn probe_peer(ctx: &mut DeviceCtx<'_>, port: u8) -> Result<LinkAddressPort> {
    let mut aux = ctx.aux(port);
    let dpcd_revision = aux.read_dpcd_byte(DPCD_REV)?;
    let mstm_cap = aux.read_dpcd_byte(MSTM_CAP)?;
    let downstream = aux.read_dpcd_byte(DOWNSTREAMPORT_PRESENT)?;
    let peer_guid = aux.read_guid()?;

    let peer_device_type = classify_peer(downstream, mstm_cap);
    let sink = peer_device_type == PeerDeviceType::SstSink;
    Ok(LinkAddressPort {
        input_port: false,
        peer_device_type,
        port_number: port,
        mcs: mstm_cap & MST_CAP != 0,
        ddps: true,
        legacy_device_plug_status: false,
        dpcd_revision,
        peer_guid,
        num_sdp_streams: u8::from(sink),
        num_sdp_stream_sinks: u8::from(sink),
    })
}

/// LINK_ADDRESS reply describing every connected port of the device behind `ctx`.
///
/// Down-facing peers are interrogated over AUX for their capabilities. A peer that does not
/// answer is reported with no device type and no plug status.
pub fn link_address_reply(ctx: &mut DeviceCtx<'_>) -> LinkAddressAck {
    let mut ports = Vec::new();
    for index in 0..ctx.emu.ports.len() {
        let port = ctx.emu.ports[index];
        let number = index as u8;
        if port.link.is_none() {
            continue;
        }
        match port.kind {
            PortKind::NotExists => {}
            PortKind::UpFacing => ports.push(LinkAddressPort {
                input_port: true,
                peer_device_type: PeerDeviceType::SourceOrSst,
                port_number: number,
                mcs: true,
                ddps: true,
                ..LinkAddressPort::default()
            }),
            PortKind::DownFacing => match probe_peer(ctx, number) {
                Ok(descriptor) => ports.push(descriptor),
                Err(err) => {
                    tracing::warn!(device = %ctx.emu.name, port = number, %err, "peer did not answer");
                    ports.push(LinkAddressPort {
                        port_number: number,
                        ..LinkAddressPort::default()
                    });
                }
            },
        }
    }
    LinkAddressAck {
        guid: ctx.emu.dpcd.guid,
        ports,
    }
}

/// Deferred work for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Work {
    DownRequest { port: u8, chunk: Vec<u8> },
    Irq { port: u8 },
    Kick,
}

/// One emulated device: the shared emulator state plus its variant model.
pub struct MstDevice {
    pub(crate) emu: MstEmulator,
    pub(crate) model: Box<dyn MstDeviceModel>,
    requests: MsgAssembler,
}

impl std::fmt::Debug for MstDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MstDevice")
            .field("name", &self.emu.name)
            .field("kind", &self.model.kind())
            .finish_non_exhaustive()
    }
}

impl MstDevice {
    pub fn new(emu: MstEmulator, model: Box<dyn MstDeviceModel>) -> Self {
        Self {
            emu,
            model,
            requests: MsgAssembler::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.emu.name
    }

    pub fn kind(&self) -> DeviceKind {
        self.model.kind()
    }

    pub fn emulator(&self) -> &MstEmulator {
        &self.emu
    }

    pub fn model<T: MstDeviceModel>(&self) -> Option<&T> {
        self.model.as_any().downcast_ref()
    }

    pub fn model_mut<T: MstDeviceModel>(&mut self) -> Option<&mut T> {
        self.model.as_any_mut().downcast_mut()
    }

    /// One AUX transaction arriving on `port`. The I2C MOT bit is ignored for dispatch.
    pub fn transfer(&mut self, port: u8, msg: &mut AuxMsg) -> Result<usize> {
        match msg.kind() {
            Some(AuxRequest::NativeRead) if self.model.native_aux() => self.emu.native_read(msg),
            Some(AuxRequest::NativeWrite) if self.model.native_aux() => {
                self.emu.native_write(port, msg)
            }
            Some(AuxRequest::I2cRead) => self.model.i2c_read(msg),
            Some(AuxRequest::I2cWrite) => self.model.i2c_write(msg),
            _ => Err(msg.reject(ProtocolError::UnsupportedRequest {
                request: msg.request,
            })),
        }
    }

    pub(crate) fn run(&mut self, work: Work, bus: &mut dyn PortBus) {
        let mut ctx = DeviceCtx::new(&mut self.emu, bus);
        match work {
            Work::DownRequest { port, chunk } => {
                handle_down_request(self.model.as_mut(), &mut self.requests, &mut ctx, port, &chunk)
            }
            Work::Irq { port } => self.model.irq(&mut ctx, port),
            Work::Kick => self.model.kick(&mut ctx),
        }
    }
}

fn handle_down_request(
    model: &mut dyn MstDeviceModel,
    requests: &mut MsgAssembler,
    ctx: &mut DeviceCtx<'_>,
    port: u8,
    chunk: &[u8],
) {
    let (mut header, body) = match decode_chunk(chunk) {
        Ok(decoded) => decoded,
        Err(err) => {
            tracing::warn!(device = %ctx.emu.name, port, %err, "dropping malformed down request");
            return;
        }
    };

    if header.lcr > 0 && !header.broadcast {
        let next = header.rad.advance(header.lcr, port);
        header.lcr -= 1;
        let mut msg = AuxMsg::native_write(SIDEBAND_MSG_DOWN_REQ_BASE, &encode_chunk(&header, body));
        if let Err(err) = ctx.route(next, &mut msg) {
            tracing::warn!(device = %ctx.emu.name, port = next, %err, "cannot forward down request");
        }
        return;
    }

    let Some((start, body)) = requests.push(&header, body) else {
        return;
    };
    let reply = match SidebandRequest::decode(&body) {
        Ok(request) => dispatch(model, ctx, &request),
        Err(err) => {
            tracing::warn!(device = %ctx.emu.name, %err, "undecodable sideband request");
            let req_type = body.first().map_or(0, |b| b & 0x7f);
            SidebandReply::nak(req_type, ctx.emu.dpcd.guid, NakReason::BadParam)
        }
    };
    ctx.emu.queue_reply(port, &start.reply_header(), &reply.encode());
}

fn dispatch(
    model: &mut dyn MstDeviceModel,
    ctx: &mut DeviceCtx<'_>,
    request: &SidebandRequest,
) -> SidebandReply {
    let req_type = request.req_type();
    tracing::trace!(device = %ctx.emu.name, request = request_name(req_type), "sideband request");
    let result = match request {
        SidebandRequest::LinkAddress => model.link_address(ctx),
        SidebandRequest::ClearPayloadIdTable => model.clear_payload_id_table(ctx),
        SidebandRequest::EnumPathResources { port_number } => {
            model.enum_path_resources(ctx, *port_number)
        }
        SidebandRequest::RemoteI2cRead(read) => model.remote_i2c_read(ctx, read),
        SidebandRequest::Other { .. } => {
            tracing::debug!(
                device = %ctx.emu.name,
                request = request_name(req_type),
                "unsupported sideband request"
            );
            Err(NakReason::BadParam)
        }
    };
    match result {
        Ok(body) => SidebandReply { req_type, body },
        Err(reason) => SidebandReply::nak(req_type, ctx.emu.dpcd.guid, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dpcd::DWN_STRM_PORT_TYPE_DP;

    #[test]
    fn peer_classification() {
        assert_eq!(
            classify_peer(DWN_STRM_PORT_PRESENT | DWN_STRM_PORT_TYPE_DP, MST_CAP),
            PeerDeviceType::MstBranching
        );
        assert_eq!(classify_peer(DWN_STRM_PORT_TYPE_DP, 0), PeerDeviceType::SstSink);
        assert_eq!(
            classify_peer(DWN_STRM_PORT_PRESENT | DWN_STRM_PORT_TYPE_TMDS, 0),
            PeerDeviceType::DpLegacyConv
        );
        assert_eq!(
            classify_peer(DWN_STRM_PORT_PRESENT | DWN_STRM_PORT_TYPE_ANALOG, 0),
            PeerDeviceType::DpLegacyConv
        );
        assert_eq!(
            classify_peer(DWN_STRM_PORT_PRESENT | DWN_STRM_PORT_TYPE_OTHER, 0),
            PeerDeviceType::Wireless
        );
    }
}
