use super::crc::data_crc8;
use super::header::SidebandMsgHeader;
use super::SidebandError;

/// Largest chunk (header, body and CRC8) written to a sideband window in one go.
pub const SIDEBAND_CHUNK_MAX: usize = 48;

/// Largest reassembled message body.
pub const MAX_MESSAGE_LEN: usize = 512;

/// Splits `body` into wire chunks routed by `template`.
///
/// The template's `msg_len`, `somt` and `eomt` are overwritten per chunk. An empty body still
/// produces one chunk.
pub fn encode_chunks(template: &SidebandMsgHeader, body: &[u8]) -> Vec<Vec<u8>> {
    let space = SIDEBAND_CHUNK_MAX - 1 - template.encoded_len();
    let pieces: Vec<&[u8]> = if body.is_empty() {
        vec![body]
    } else {
        body.chunks(space).collect()
    };
    let last = pieces.len() - 1;

    pieces
        .iter()
        .enumerate()
        .map(|(i, piece)| {
            let header = SidebandMsgHeader {
                somt: i == 0,
                eomt: i == last,
                ..*template
            };
            encode_chunk(&header, piece)
        })
        .collect()
}

/// Encodes one chunk carrying `body`, recomputing `msg_len` and both CRCs.
pub(crate) fn encode_chunk(header: &SidebandMsgHeader, body: &[u8]) -> Vec<u8> {
    let header = SidebandMsgHeader {
        msg_len: body.len() as u8 + 1,
        ..*header
    };
    let mut chunk = Vec::with_capacity(header.encoded_len() + body.len() + 1);
    header.encode(&mut chunk);
    chunk.extend_from_slice(body);
    chunk.push(data_crc8(body));
    chunk
}

/// Total length of the chunk at the front of `buf`, once its header is complete.
pub(crate) fn chunk_len(buf: &[u8]) -> Result<usize, SidebandError> {
    let (header, len) = SidebandMsgHeader::decode(buf)?;
    Ok(len + usize::from(header.msg_len))
}

/// Decodes one chunk, verifying both CRCs. Returns the header and the body bytes it carries.
pub fn decode_chunk(buf: &[u8]) -> Result<(SidebandMsgHeader, &[u8]), SidebandError> {
    let (header, len) = SidebandMsgHeader::decode(buf)?;
    let end = len + usize::from(header.msg_len);
    if buf.len() < end {
        return Err(SidebandError::Truncated {
            needed: end,
            available: buf.len(),
        });
    }
    let body = &buf[len..end - 1];
    if data_crc8(body) != buf[end - 1] {
        return Err(SidebandError::BodyCrc);
    }
    Ok((header, body))
}

/// Reassembles chunk bodies into a complete message.
#[derive(Debug, Default)]
pub struct MsgAssembler {
    start: Option<SidebandMsgHeader>,
    body: Vec<u8>,
}

impl MsgAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.start = None;
        self.body.clear();
    }

    /// Feeds one decoded chunk. Returns the start-of-message header and the full body once
    /// the end-of-message chunk arrives.
    pub fn push(
        &mut self,
        header: &SidebandMsgHeader,
        body: &[u8],
    ) -> Option<(SidebandMsgHeader, Vec<u8>)> {
        if header.somt {
            self.reset();
            self.start = Some(*header);
        }
        let start = match self.start {
            Some(start) => start,
            None => {
                tracing::warn!(seqno = header.seqno, "sideband chunk without start of message");
                return None;
            }
        };
        if start.seqno != header.seqno {
            tracing::warn!(
                expected = start.seqno,
                got = header.seqno,
                "sideband chunk from another transaction"
            );
            self.reset();
            return None;
        }
        if self.body.len() + body.len() > MAX_MESSAGE_LEN {
            tracing::warn!(len = self.body.len() + body.len(), "sideband message too long");
            self.reset();
            return None;
        }
        self.body.extend_from_slice(body);

        if !header.eomt {
            return None;
        }
        self.start = None;
        Some((start, std::mem::take(&mut self.body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn template(path: &[u8]) -> SidebandMsgHeader {
        SidebandMsgHeader::for_path(path).unwrap()
    }

    #[test]
    fn short_body_is_one_chunk() {
        let chunks = encode_chunks(&template(&[]), &[0x01]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 3 + 1 + 1);

        let (header, body) = decode_chunk(&chunks[0]).unwrap();
        assert!(header.somt && header.eomt);
        assert_eq!(header.msg_len, 2);
        assert_eq!(body, &[0x01]);
        assert_eq!(chunk_len(&chunks[0]).unwrap(), chunks[0].len());
    }

    #[test]
    fn long_body_splits_and_reassembles() {
        let body: Vec<u8> = (0..100u8).collect();
        let chunks = encode_chunks(&template(&[1]), &body);
        // 4-byte header leaves 43 body bytes per chunk.
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= SIDEBAND_CHUNK_MAX));

        let mut assembler = MsgAssembler::new();
        let mut done = None;
        for chunk in &chunks {
            let (header, piece) = decode_chunk(chunk).unwrap();
            done = assembler.push(&header, piece);
        }
        let (header, reassembled) = done.unwrap();
        assert_eq!(reassembled, body);
        assert_eq!(header.lct, 2);
        assert!(header.somt);
    }

    #[test]
    fn body_corruption_is_detected() {
        let mut chunk = encode_chunks(&template(&[]), &[1, 2, 3]).remove(0);
        chunk[4] ^= 0x40;
        assert_eq!(decode_chunk(&chunk), Err(SidebandError::BodyCrc));
    }

    #[test]
    fn continuation_without_start_is_dropped() {
        let chunks = encode_chunks(&template(&[]), &[0u8; 60]);
        let (header, piece) = decode_chunk(&chunks[1]).unwrap();
        let mut assembler = MsgAssembler::new();
        assert_eq!(assembler.push(&header, piece), None);
    }

    #[test]
    fn new_start_discards_partial_message() {
        let long = encode_chunks(&template(&[]), &[7u8; 60]);
        let short = encode_chunks(&template(&[]), &[9u8; 2]);
        let mut assembler = MsgAssembler::new();

        let (h, p) = decode_chunk(&long[0]).unwrap();
        assert_eq!(assembler.push(&h, p), None);
        let (h, p) = decode_chunk(&short[0]).unwrap();
        assert_eq!(assembler.push(&h, p).map(|(_, b)| b), Some(vec![9, 9]));
    }
}
