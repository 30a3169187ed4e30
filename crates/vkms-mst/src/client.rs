//! Source-side sideband message manager.

use std::collections::VecDeque;

use crate::aux::{AuxChannel, AUX_MAX_PAYLOAD};
use crate::dpcd::{
    DOWN_REP_MSG_RDY, ESI_LEN, SIDEBAND_MSG_DOWN_REP_BASE, SIDEBAND_MSG_DOWN_REQ_BASE,
    UP_REQ_MSG_RDY,
};
use crate::error::Result;
use crate::sideband::{
    chunk_len, decode_chunk, encode_chunks, MsgAssembler, SidebandError, SidebandMsgHeader,
    SidebandReply, SidebandRequest,
};

/// Offset of the device service vector within the ESI block read at `SINK_COUNT_ESI`.
const ESI0: usize = 1;

/// Receives the events a root device collects from its link.
pub trait MstEventHandler {
    /// Handles one snapshot of the ESI bytes, setting the bits to acknowledge in `ack`.
    /// Returns whether anything was handled.
    fn handle_event(
        &mut self,
        aux: &mut dyn AuxChannel,
        esi: &[u8; ESI_LEN],
        ack: &mut [u8; ESI_LEN],
    ) -> bool;

    /// Called once the event loop is done, so queued requests can go out.
    fn send_new_request(&mut self, aux: &mut dyn AuxChannel);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedReply {
    pub header: SidebandMsgHeader,
    pub reply: SidebandReply,
}

#[derive(Debug)]
struct QueuedRequest {
    header: SidebandMsgHeader,
    body: Vec<u8>,
}

/// Sends one request at a time and collects the replies.
#[derive(Debug, Default)]
pub struct SidebandClient {
    queue: VecDeque<QueuedRequest>,
    in_flight: Option<u8>,
    next_seqno: u8,
    assembler: MsgAssembler,
    replies: VecDeque<ReceivedReply>,
    up_requests: usize,
}

impl SidebandClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `request` for the device at `path` below the first branch. Returns the
    /// sequence number it will carry.
    pub fn queue_request(
        &mut self,
        path: &[u8],
        request: &SidebandRequest,
    ) -> std::result::Result<u8, SidebandError> {
        let mut header = SidebandMsgHeader::for_path(path)?;
        let body = request.encode()?;
        header.seqno = self.next_seqno;
        self.next_seqno ^= 1;
        self.queue.push_back(QueuedRequest { header, body });
        Ok(header.seqno)
    }

    pub fn take_reply(&mut self) -> Option<ReceivedReply> {
        self.replies.pop_front()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none() && self.queue.is_empty()
    }

    pub fn in_flight(&self) -> Option<u8> {
        self.in_flight
    }

    /// Forgets the outstanding request, e.g. after its target vanished.
    pub fn abandon_in_flight(&mut self) {
        self.in_flight = None;
        self.assembler.reset();
    }

    pub fn up_requests(&self) -> usize {
        self.up_requests
    }

    fn receive_chunk(&mut self, aux: &mut dyn AuxChannel) -> Result<()> {
        let mut chunk = aux.read_dpcd(SIDEBAND_MSG_DOWN_REP_BASE, AUX_MAX_PAYLOAD)?;
        let total = match chunk_len(&chunk) {
            Ok(total) => total,
            Err(err) => {
                tracing::warn!(%err, "malformed down reply header");
                return Ok(());
            }
        };
        if total > chunk.len() {
            let rest = aux.read_dpcd_split(
                SIDEBAND_MSG_DOWN_REP_BASE + chunk.len() as u32,
                total - chunk.len(),
            )?;
            chunk.extend(rest);
        }

        let (header, body) = match decode_chunk(&chunk) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!(%err, "malformed down reply");
                return Ok(());
            }
        };
        let Some((start, body)) = self.assembler.push(&header, body) else {
            return Ok(());
        };
        if self.in_flight != Some(start.seqno) {
            tracing::warn!(seqno = start.seqno, "unsolicited down reply");
            return Ok(());
        }
        match SidebandReply::decode(&body) {
            Ok(reply) => self.replies.push_back(ReceivedReply {
                header: start,
                reply,
            }),
            Err(err) => tracing::warn!(%err, "undecodable down reply"),
        }
        self.in_flight = None;
        Ok(())
    }
}

impl MstEventHandler for SidebandClient {
    fn handle_event(
        &mut self,
        aux: &mut dyn AuxChannel,
        esi: &[u8; ESI_LEN],
        ack: &mut [u8; ESI_LEN],
    ) -> bool {
        let mut handled = false;
        if esi[ESI0] & DOWN_REP_MSG_RDY != 0 {
            if let Err(err) = self.receive_chunk(aux) {
                tracing::warn!(%err, "cannot read down reply");
            }
            ack[ESI0] |= DOWN_REP_MSG_RDY;
            handled = true;
        }
        if esi[ESI0] & UP_REQ_MSG_RDY != 0 {
            self.up_requests += 1;
            ack[ESI0] |= UP_REQ_MSG_RDY;
            handled = true;
        }
        handled
    }

    fn send_new_request(&mut self, aux: &mut dyn AuxChannel) {
        if self.in_flight.is_some() {
            return;
        }
        let Some(request) = self.queue.pop_front() else {
            return;
        };
        for chunk in encode_chunks(&request.header, &request.body) {
            if let Err(err) = aux.write_dpcd_split(SIDEBAND_MSG_DOWN_REQ_BASE, &chunk) {
                tracing::warn!(%err, "cannot send down request");
                return;
            }
        }
        self.in_flight = Some(request.header.seqno);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_alternate() {
        let mut client = SidebandClient::new();
        assert_eq!(client.queue_request(&[], &SidebandRequest::LinkAddress), Ok(0));
        assert_eq!(client.queue_request(&[1], &SidebandRequest::LinkAddress), Ok(1));
        assert_eq!(client.queue_request(&[2], &SidebandRequest::LinkAddress), Ok(0));
        assert!(!client.is_idle());
    }

    #[test]
    fn bad_path_is_rejected_before_queueing() {
        let mut client = SidebandClient::new();
        assert!(client
            .queue_request(&[16], &SidebandRequest::LinkAddress)
            .is_err());
        assert!(client.is_idle());
    }
}
