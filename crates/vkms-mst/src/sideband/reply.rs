use serde::{Deserialize, Serialize};

use crate::dpcd::GUID_LEN;

use super::request::{req_type, Reader};
use super::SidebandError;

pub const REPLY_ACK: u8 = 0;
pub const REPLY_NAK: u8 = 1;

/// LINK_ADDRESS carries its port count in four bits.
pub const LINK_ADDRESS_MAX_PORTS: usize = 0xf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NakReason {
    WriteFailure = 0x01,
    InvalidRead = 0x02,
    CrcFailure = 0x03,
    BadParam = 0x04,
    Defer = 0x05,
    LinkFailure = 0x06,
    NoResources = 0x07,
    DpcdFail = 0x08,
    I2cNak = 0x09,
    AllocateFail = 0x0a,
}

impl NakReason {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0x01 => Self::WriteFailure,
            0x02 => Self::InvalidRead,
            0x03 => Self::CrcFailure,
            0x04 => Self::BadParam,
            0x05 => Self::Defer,
            0x06 => Self::LinkFailure,
            0x07 => Self::NoResources,
            0x08 => Self::DpcdFail,
            0x09 => Self::I2cNak,
            0x0a => Self::AllocateFail,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PeerDeviceType {
    #[default]
    None = 0,
    SourceOrSst = 1,
    MstBranching = 2,
    SstSink = 3,
    DpLegacyConv = 4,
    Wireless = 5,
}

impl PeerDeviceType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::None,
            1 => Self::SourceOrSst,
            2 => Self::MstBranching,
            3 => Self::SstSink,
            4 => Self::DpLegacyConv,
            5 => Self::Wireless,
            _ => return None,
        })
    }
}

/// One port descriptor of a LINK_ADDRESS reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkAddressPort {
    pub input_port: bool,
    pub peer_device_type: PeerDeviceType,
    pub port_number: u8,
    /// Message capability status: the peer speaks sideband messages.
    pub mcs: bool,
    /// DisplayPort device plug status.
    pub ddps: bool,
    pub legacy_device_plug_status: bool,
    // Only carried for output ports.
    pub dpcd_revision: u8,
    pub peer_guid: [u8; GUID_LEN],
    pub num_sdp_streams: u8,
    pub num_sdp_stream_sinks: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkAddressAck {
    pub guid: [u8; GUID_LEN],
    pub ports: Vec<LinkAddressPort>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumPathResourcesAck {
    pub port_number: u8,
    pub fec_capable: bool,
    pub full_payload_bw_number: u16,
    pub avail_payload_bw_number: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteI2cReadAck {
    pub port_number: u8,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBody {
    Nak {
        guid: [u8; GUID_LEN],
        reason: NakReason,
        nak_data: u8,
    },
    LinkAddress(LinkAddressAck),
    EnumPathResources(EnumPathResourcesAck),
    RemoteI2cRead(RemoteI2cReadAck),
    ClearPayloadIdTable,
    /// ACK for a request type without a dedicated body layout.
    Ack(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebandReply {
    pub req_type: u8,
    pub body: ReplyBody,
}

fn guid_from(bytes: &[u8]) -> [u8; GUID_LEN] {
    let mut guid = [0u8; GUID_LEN];
    guid.copy_from_slice(&bytes[..GUID_LEN]);
    guid
}

impl SidebandReply {
    pub fn nak(req_type: u8, guid: [u8; GUID_LEN], reason: NakReason) -> Self {
        Self::nak_with_data(req_type, guid, reason, 0)
    }

    pub fn is_ack(&self) -> bool {
        !matches!(self.body, ReplyBody::Nak { .. })
    }

    pub fn encode(&self) -> Vec<u8> {
        let reply_type = if self.is_ack() { REPLY_ACK } else { REPLY_NAK };
        let mut out = vec![(reply_type << 7) | (self.req_type & 0x7f)];
        match &self.body {
            ReplyBody::Nak {
                guid,
                reason,
                nak_data,
            } => {
                out.extend_from_slice(guid);
                out.push(*reason as u8);
                out.push(*nak_data);
            }
            ReplyBody::LinkAddress(ack) => {
                out.extend_from_slice(&ack.guid);
                let ports = &ack.ports[..ack.ports.len().min(LINK_ADDRESS_MAX_PORTS)];
                if ports.len() < ack.ports.len() {
                    tracing::warn!(
                        ports = ack.ports.len(),
                        "LINK_ADDRESS reply truncated to {LINK_ADDRESS_MAX_PORTS} ports"
                    );
                }
                out.push(ports.len() as u8);
                for port in ports {
                    out.push(
                        (u8::from(port.input_port) << 7)
                            | ((port.peer_device_type as u8) << 4)
                            | (port.port_number & 0xf),
                    );
                    let mut flags = (u8::from(port.mcs) << 7) | (u8::from(port.ddps) << 6);
                    if !port.input_port {
                        flags |= u8::from(port.legacy_device_plug_status) << 5;
                    }
                    out.push(flags);
                    if !port.input_port {
                        out.push(port.dpcd_revision);
                        out.extend_from_slice(&port.peer_guid);
                        out.push(
                            ((port.num_sdp_streams & 0xf) << 4)
                                | (port.num_sdp_stream_sinks & 0xf),
                        );
                    }
                }
            }
            ReplyBody::EnumPathResources(ack) => {
                out.push(((ack.port_number & 0xf) << 4) | u8::from(ack.fec_capable));
                out.extend_from_slice(&ack.full_payload_bw_number.to_be_bytes());
                out.extend_from_slice(&ack.avail_payload_bw_number.to_be_bytes());
            }
            ReplyBody::RemoteI2cRead(ack) => {
                out.push(ack.port_number & 0xf);
                out.push(ack.bytes.len() as u8);
                out.extend_from_slice(&ack.bytes);
            }
            ReplyBody::ClearPayloadIdTable => {}
            ReplyBody::Ack(data) => out.extend_from_slice(data),
        }
        out
    }

    pub fn decode(body: &[u8]) -> Result<Self, SidebandError> {
        let mut r = Reader::new(body);
        let first = r.u8()?;
        let request = first & 0x7f;

        if first >> 7 == REPLY_NAK {
            let guid = guid_from(r.take(GUID_LEN)?);
            let reason = NakReason::from_u8(r.u8()?)
                .ok_or(SidebandError::InvalidField("NAK reason"))?;
            let nak_data = r.u8()?;
            return Ok(Self::nak_with_data(request, guid, reason, nak_data));
        }

        let body = match request {
            req_type::LINK_ADDRESS => {
                let guid = guid_from(r.take(GUID_LEN)?);
                let nports = r.u8()? & 0xf;
                let mut ports = Vec::with_capacity(usize::from(nports));
                for _ in 0..nports {
                    let a = r.u8()?;
                    let b = r.u8()?;
                    let input_port = a & 0x80 != 0;
                    let mut port = LinkAddressPort {
                        input_port,
                        peer_device_type: PeerDeviceType::from_u8((a >> 4) & 0x7)
                            .ok_or(SidebandError::InvalidField("peer device type"))?,
                        port_number: a & 0xf,
                        mcs: b & 0x80 != 0,
                        ddps: b & 0x40 != 0,
                        ..LinkAddressPort::default()
                    };
                    if !input_port {
                        port.legacy_device_plug_status = b & 0x20 != 0;
                        port.dpcd_revision = r.u8()?;
                        port.peer_guid = guid_from(r.take(GUID_LEN)?);
                        let sdp = r.u8()?;
                        port.num_sdp_streams = sdp >> 4;
                        port.num_sdp_stream_sinks = sdp & 0xf;
                    }
                    ports.push(port);
                }
                ReplyBody::LinkAddress(LinkAddressAck { guid, ports })
            }
            req_type::ENUM_PATH_RESOURCES => {
                let a = r.u8()?;
                let full = r.take(2)?;
                let avail = r.take(2)?;
                ReplyBody::EnumPathResources(EnumPathResourcesAck {
                    port_number: a >> 4,
                    fec_capable: a & 1 != 0,
                    full_payload_bw_number: u16::from_be_bytes([full[0], full[1]]),
                    avail_payload_bw_number: u16::from_be_bytes([avail[0], avail[1]]),
                })
            }
            req_type::REMOTE_I2C_READ => {
                let port_number = r.u8()? & 0xf;
                let len = usize::from(r.u8()?);
                ReplyBody::RemoteI2cRead(RemoteI2cReadAck {
                    port_number,
                    bytes: r.take(len)?.to_vec(),
                })
            }
            req_type::CLEAR_PAYLOAD_ID_TABLE => ReplyBody::ClearPayloadIdTable,
            _ => ReplyBody::Ack(r.rest().to_vec()),
        };
        Ok(Self {
            req_type: request,
            body,
        })
    }

    fn nak_with_data(
        req_type: u8,
        guid: [u8; GUID_LEN],
        reason: NakReason,
        nak_data: u8,
    ) -> Self {
        Self {
            req_type,
            body: ReplyBody::Nak {
                guid,
                reason,
                nak_data,
            },
        }
    }
}
