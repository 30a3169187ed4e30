use super::SidebandError;

/// Largest link count total a header can express.
pub const MAX_LCT: u8 = 15;

const RAD_BYTES: usize = 8;

/// Relative Address Descriptor: the port numbers of each hop after the first branch,
/// packed two per byte with the first hop in the high nibble of byte 0.
///
/// Hubs rewrite the RAD in place as a message travels so that, by the time it reaches its
/// target, the nibbles describe the way back. [`Rad::advance`] is the downstream step and
/// [`Rad::retreat`] exactly undoes it on the reply path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rad([u8; RAD_BYTES]);

impl Rad {
    /// Builds a RAD from a list of output ports, one per hop below the first branch.
    pub fn from_path(path: &[u8]) -> Result<Self, SidebandError> {
        if path.len() >= usize::from(MAX_LCT) {
            return Err(SidebandError::InvalidField("RAD path too long"));
        }
        let mut rad = Self::default();
        for (i, &port) in path.iter().enumerate() {
            if port > 0xf {
                return Err(SidebandError::InvalidField("RAD port number above 15"));
            }
            rad.set_nibble(i, port);
        }
        Ok(rad)
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        let mut rad = Self::default();
        let n = bytes.len().min(RAD_BYTES);
        rad.0[..n].copy_from_slice(&bytes[..n]);
        rad
    }

    /// Packed bytes; a header with link count total `lct` carries the first `lct / 2`.
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn nibble(&self, index: usize) -> u8 {
        let byte = self.0[index / 2];
        if index % 2 == 0 {
            byte >> 4
        } else {
            byte & 0xf
        }
    }

    pub fn set_nibble(&mut self, index: usize, value: u8) {
        let byte = &mut self.0[index / 2];
        if index % 2 == 0 {
            *byte = (*byte & 0x0f) | (value << 4);
        } else {
            *byte = (*byte & 0xf0) | (value & 0xf);
        }
    }

    /// First `hops` port numbers.
    pub fn path(&self, hops: usize) -> Vec<u8> {
        (0..hops).map(|i| self.nibble(i)).collect()
    }

    /// Downstream routing step taken by a branch that still has `lcr` links to go.
    ///
    /// Returns the output port to forward on. The first `lcr` nibbles rotate left by one and the
    /// port the message arrived on takes the freed slot `lcr - 1`.
    pub fn advance(&mut self, lcr: u8, inbound_port: u8) -> u8 {
        let lcr = usize::from(lcr);
        debug_assert!(lcr > 0);
        let next = self.nibble(0);
        for i in 1..lcr {
            let v = self.nibble(i);
            self.set_nibble(i - 1, v);
        }
        self.set_nibble(lcr - 1, inbound_port);
        next
    }

    /// Reply-path step: undoes the [`Rad::advance`] this branch performed with `lcr == hops`.
    ///
    /// `reply_port` is the output port the reply came back on. Returns the port the request
    /// originally arrived on, which is where the reply must go next.
    pub fn retreat(&mut self, hops: u8, reply_port: u8) -> u8 {
        let hops = usize::from(hops);
        debug_assert!(hops > 0);
        let upstream = self.nibble(hops - 1);
        for i in (1..hops).rev() {
            let v = self.nibble(i - 1);
            self.set_nibble(i, v);
        }
        self.set_nibble(0, reply_port);
        upstream
    }
}
