use super::crc::header_crc4;
use super::rad::{Rad, MAX_LCT};
use super::SidebandError;

/// Routing and framing header carried by every sideband chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SidebandMsgHeader {
    /// Link count total: number of branches between the source and the target, plus one.
    pub lct: u8,
    /// Link count remaining: hops still to take.
    pub lcr: u8,
    pub rad: Rad,
    pub broadcast: bool,
    pub path_msg: bool,
    /// Body bytes in this chunk plus the trailing CRC8.
    pub msg_len: u8,
    pub somt: bool,
    pub eomt: bool,
    pub seqno: u8,
}

impl SidebandMsgHeader {
    /// Header addressed at the device reached by following `path` from the first branch.
    pub fn for_path(path: &[u8]) -> Result<Self, SidebandError> {
        let rad = Rad::from_path(path)?;
        let lct = path.len() as u8 + 1;
        Ok(Self {
            lct,
            lcr: lct - 1,
            rad,
            ..Self::default()
        })
    }

    fn rad_len(lct: u8) -> usize {
        usize::from(lct / 2)
    }

    /// Encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        3 + Self::rad_len(self.lct)
    }

    /// Appends the encoded header, computing the CRC4.
    pub fn encode(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.push((self.lct << 4) | (self.lcr & 0xf));
        out.extend_from_slice(&self.rad.bytes()[..Self::rad_len(self.lct)]);
        out.push(
            (u8::from(self.broadcast) << 7) | (u8::from(self.path_msg) << 6) | (self.msg_len & 0x3f),
        );
        out.push(
            (u8::from(self.somt) << 7) | (u8::from(self.eomt) << 6) | ((self.seqno & 1) << 4),
        );
        let len = out.len() - start;
        let crc = header_crc4(&out[start..], len * 2 - 1);
        out[start + len - 1] |= crc;
    }

    /// Decodes a header from the front of `buf`, returning it with its encoded length.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), SidebandError> {
        let first = *buf.first().ok_or(SidebandError::Truncated {
            needed: 1,
            available: 0,
        })?;
        let lct = first >> 4;
        let lcr = first & 0xf;
        let len = 3 + Self::rad_len(lct);
        if buf.len() < len {
            return Err(SidebandError::Truncated {
                needed: len,
                available: buf.len(),
            });
        }
        if header_crc4(&buf[..len], len * 2 - 1) != buf[len - 1] & 0xf {
            return Err(SidebandError::HeaderCrc);
        }
        if lct == 0 || lct > MAX_LCT {
            return Err(SidebandError::InvalidField("link count total"));
        }

        let rad = Rad::from_bytes(&buf[1..len - 2]);
        let flags = buf[len - 2];
        let framing = buf[len - 1];
        let header = Self {
            lct,
            lcr,
            rad,
            broadcast: flags & 0x80 != 0,
            path_msg: flags & 0x40 != 0,
            msg_len: flags & 0x3f,
            somt: framing & 0x80 != 0,
            eomt: framing & 0x40 != 0,
            seqno: (framing >> 4) & 1,
        };
        if header.msg_len < 1 {
            return Err(SidebandError::ZeroLength);
        }
        if !header.broadcast && header.lcr >= header.lct {
            return Err(SidebandError::InvalidField("link count remaining"));
        }
        Ok((header, len))
    }

    /// Header for the reply to a request that arrived with this header at its target.
    pub fn reply_header(&self) -> Self {
        Self {
            lcr: self.lct.saturating_sub(1),
            msg_len: 0,
            somt: false,
            eomt: false,
            ..*self
        }
    }
}
