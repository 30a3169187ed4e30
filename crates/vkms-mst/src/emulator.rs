//! Per-device register file, sideband windows and reply staging.

use std::collections::VecDeque;

use crate::aux::AuxMsg;
use crate::dpcd::{
    DpcdMemory, DOWN_REP_MSG_RDY, GUID_LEN, SIDEBAND_MSG_DOWN_REQ_BASE, SIDEBAND_MSG_WINDOW_LEN,
};
use crate::error::{ProtocolError, Result};
use crate::sideband::{chunk_len, encode_chunks, SidebandError, SidebandMsgHeader};
use crate::DeviceId;

pub const MAX_PORTS: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PortKind {
    #[default]
    NotExists,
    /// Faces the source; replies leave through it.
    UpFacing,
    DownFacing,
}

/// The far end of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortLink {
    pub device: DeviceId,
    pub port: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MstPort {
    pub kind: PortKind,
    pub link: Option<PortLink>,
}

/// Side effects of a transfer that the topology applies once the call has returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Effect {
    /// A complete chunk landed in the down-request window.
    DownRequest { port: u8, chunk: Vec<u8> },
    /// Pulse the interrupt line of the peer behind `port`.
    RaiseIrq { port: u8 },
}

#[derive(Debug)]
struct OutboundReply {
    port: u8,
    chunks: VecDeque<Vec<u8>>,
}

/// Deterministic GUID for a named device.
pub fn guid_for_name(name: &str) -> [u8; GUID_LEN] {
    // FNV-1a, stretched over the 16 bytes.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    let mut guid = [0u8; GUID_LEN];
    for (i, slot) in guid.iter_mut().enumerate() {
        for &b in name.as_bytes().iter().chain(&[i as u8]) {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        *slot = (hash >> 24) as u8;
    }
    guid
}

/// State shared by every device variant: the DPCD bank, the port table and the
/// down-request/down-reply plumbing.
#[derive(Debug)]
pub struct MstEmulator {
    pub name: String,
    pub dpcd: DpcdMemory,
    pub ports: [MstPort; MAX_PORTS],
    down_req_fill: usize,
    replies: VecDeque<OutboundReply>,
    effects: Vec<Effect>,
}

impl MstEmulator {
    pub fn new(name: &str, kinds: &[PortKind]) -> Self {
        let mut ports = [MstPort::default(); MAX_PORTS];
        for (port, &kind) in ports.iter_mut().zip(kinds) {
            port.kind = kind;
        }
        Self {
            name: name.to_string(),
            dpcd: DpcdMemory::new(),
            ports,
            down_req_fill: 0,
            replies: VecDeque::new(),
            effects: Vec::new(),
        }
    }

    pub fn port(&self, port: u8) -> Option<&MstPort> {
        self.ports
            .get(usize::from(port))
            .filter(|p| p.kind != PortKind::NotExists)
    }

    pub fn link(&self, port: u8) -> Option<PortLink> {
        self.port(port).and_then(|p| p.link)
    }

    /// Number of replies waiting to be drained, including the staged one.
    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }

    pub(crate) fn native_read(&mut self, msg: &mut AuxMsg) -> Result<usize> {
        match self.dpcd.read(msg.address, &mut msg.buffer) {
            Ok(()) => {
                msg.ack();
                Ok(msg.buffer.len())
            }
            Err(address) => {
                tracing::debug!(device = %self.name, address, "read of unmapped DPCD register");
                Err(msg.reject(ProtocolError::UnmappedRegister { address }))
            }
        }
    }

    pub(crate) fn native_write(&mut self, port: u8, msg: &mut AuxMsg) -> Result<usize> {
        let rdy_before = self.dpcd.device_service_irq_vector_esi0 & DOWN_REP_MSG_RDY != 0;
        if let Err(address) = self.dpcd.write(msg.address, &msg.buffer) {
            tracing::debug!(device = %self.name, address, "write to unmapped DPCD register");
            return Err(msg.reject(ProtocolError::UnmappedRegister { address }));
        }
        msg.ack();

        let rdy_after = self.dpcd.device_service_irq_vector_esi0 & DOWN_REP_MSG_RDY != 0;
        if rdy_before && !rdy_after {
            self.advance_reply();
        }
        self.track_down_request(port, msg.address, msg.buffer.len());
        Ok(msg.buffer.len())
    }

    /// Follows writes into the down-request window and snapshots each complete chunk.
    fn track_down_request(&mut self, port: u8, address: u32, len: usize) {
        let Some(offset) = address.checked_sub(SIDEBAND_MSG_DOWN_REQ_BASE) else {
            return;
        };
        let offset = offset as usize;
        if offset >= SIDEBAND_MSG_WINDOW_LEN {
            return;
        }
        if offset == 0 {
            self.down_req_fill = 0;
        }
        if offset != self.down_req_fill {
            tracing::warn!(
                device = %self.name,
                offset,
                expected = self.down_req_fill,
                "non-contiguous down request write"
            );
            self.down_req_fill = 0;
            return;
        }
        self.down_req_fill = offset + len;

        let filled = &self.dpcd.down_req[..self.down_req_fill];
        let snapshot = match chunk_len(filled) {
            Ok(total) if filled.len() >= total => filled[..total].to_vec(),
            Ok(_) | Err(SidebandError::Truncated { .. }) => return,
            // Queued as-is; the worker logs and drops it.
            Err(_) => filled.to_vec(),
        };
        self.down_req_fill = 0;
        self.effects.push(Effect::DownRequest {
            port,
            chunk: snapshot,
        });
    }

    /// Queues a reply toward `port`, chunked under `header`.
    pub(crate) fn queue_reply(&mut self, port: u8, header: &SidebandMsgHeader, body: &[u8]) {
        self.replies.push_back(OutboundReply {
            port,
            chunks: encode_chunks(header, body).into(),
        });
        if self.replies.len() == 1 {
            self.stage_reply();
        }
    }

    fn stage_reply(&mut self) {
        let Some(reply) = self.replies.front() else {
            return;
        };
        let Some(chunk) = reply.chunks.front() else {
            return;
        };
        self.dpcd.down_rep.fill(0);
        self.dpcd.down_rep[..chunk.len()].copy_from_slice(chunk);
        self.dpcd.device_service_irq_vector_esi0 |= DOWN_REP_MSG_RDY;
        self.effects.push(Effect::RaiseIrq { port: reply.port });
    }

    fn advance_reply(&mut self) {
        let Some(reply) = self.replies.front_mut() else {
            return;
        };
        reply.chunks.pop_front();
        if reply.chunks.is_empty() {
            self.replies.pop_front();
        }
        self.stage_reply();
    }

    pub(crate) fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }
}
