//! AUX channel transactions.

use crate::dpcd::GUID_LEN;
use crate::error::{MstError, ProtocolError, Result};

pub const AUX_I2C_WRITE: u8 = 0x0;
pub const AUX_I2C_READ: u8 = 0x1;
pub const AUX_I2C_WRITE_STATUS_UPDATE: u8 = 0x2;
/// Middle-of-transaction modifier for I2C-over-AUX requests.
pub const AUX_I2C_MOT: u8 = 0x4;
pub const AUX_NATIVE_WRITE: u8 = 0x8;
pub const AUX_NATIVE_READ: u8 = 0x9;

pub const AUX_NATIVE_REPLY_ACK: u8 = 0x0;
pub const AUX_NATIVE_REPLY_NACK: u8 = 0x1;
pub const AUX_NATIVE_REPLY_DEFER: u8 = 0x2;
pub const AUX_I2C_REPLY_ACK: u8 = 0x0;
pub const AUX_I2C_REPLY_NACK: u8 = 0x4;
pub const AUX_I2C_REPLY_DEFER: u8 = 0x8;

/// Largest payload a single AUX transaction carries on real hardware.
pub const AUX_MAX_PAYLOAD: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxRequest {
    NativeRead,
    NativeWrite,
    I2cRead,
    I2cWrite,
}

impl AuxRequest {
    /// Decodes the request nibble; the I2C MOT bit never affects the kind.
    pub fn from_request(request: u8) -> Option<Self> {
        match request & !AUX_I2C_MOT {
            AUX_NATIVE_READ => Some(Self::NativeRead),
            AUX_NATIVE_WRITE => Some(Self::NativeWrite),
            AUX_I2C_READ => Some(Self::I2cRead),
            AUX_I2C_WRITE => Some(Self::I2cWrite),
            _ => None,
        }
    }
}

/// One AUX transaction. For reads `buffer` is sized by the caller and filled by the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxMsg {
    pub request: u8,
    pub address: u32,
    pub buffer: Vec<u8>,
    pub reply: u8,
}

impl AuxMsg {
    pub fn native_read(address: u32, len: usize) -> Self {
        Self {
            request: AUX_NATIVE_READ,
            address,
            buffer: vec![0; len],
            reply: AUX_NATIVE_REPLY_ACK,
        }
    }

    pub fn native_write(address: u32, data: &[u8]) -> Self {
        Self {
            request: AUX_NATIVE_WRITE,
            address,
            buffer: data.to_vec(),
            reply: AUX_NATIVE_REPLY_ACK,
        }
    }

    pub fn i2c_read(i2c_addr: u8, len: usize) -> Self {
        Self {
            request: AUX_I2C_READ,
            address: u32::from(i2c_addr),
            buffer: vec![0; len],
            reply: AUX_I2C_REPLY_ACK,
        }
    }

    pub fn i2c_write(i2c_addr: u8, data: &[u8]) -> Self {
        Self {
            request: AUX_I2C_WRITE,
            address: u32::from(i2c_addr),
            buffer: data.to_vec(),
            reply: AUX_I2C_REPLY_ACK,
        }
    }

    /// Sets the middle-of-transaction bit (I2C requests only).
    pub fn with_mot(mut self) -> Self {
        self.request |= AUX_I2C_MOT;
        self
    }

    pub fn kind(&self) -> Option<AuxRequest> {
        AuxRequest::from_request(self.request)
    }

    fn is_native(&self) -> bool {
        self.request & AUX_NATIVE_WRITE != 0
    }

    pub fn ack(&mut self) {
        self.reply = if self.is_native() {
            AUX_NATIVE_REPLY_ACK
        } else {
            AUX_I2C_REPLY_ACK
        };
    }

    pub fn nack(&mut self) {
        self.reply = if self.is_native() {
            AUX_NATIVE_REPLY_NACK
        } else {
            AUX_I2C_REPLY_NACK
        };
    }

    pub fn is_nack(&self) -> bool {
        if self.is_native() {
            self.reply == AUX_NATIVE_REPLY_NACK
        } else {
            self.reply == AUX_I2C_REPLY_NACK
        }
    }

    /// NACKs the transaction and returns the matching error.
    pub(crate) fn reject(&mut self, err: ProtocolError) -> MstError {
        self.nack();
        MstError::Protocol(err)
    }
}

/// Anything AUX transactions can be issued on.
pub trait AuxChannel {
    fn transfer(&mut self, msg: &mut AuxMsg) -> Result<usize>;

    fn read_dpcd(&mut self, address: u32, len: usize) -> Result<Vec<u8>> {
        let mut msg = AuxMsg::native_read(address, len);
        let n = self.transfer(&mut msg)?;
        msg.buffer.truncate(n);
        Ok(msg.buffer)
    }

    fn read_dpcd_byte(&mut self, address: u32) -> Result<u8> {
        let bytes = self.read_dpcd(address, 1)?;
        bytes.first().copied().ok_or(MstError::Protocol(
            ProtocolError::UnmappedRegister { address },
        ))
    }

    fn write_dpcd(&mut self, address: u32, data: &[u8]) -> Result<usize> {
        let mut msg = AuxMsg::native_write(address, data);
        self.transfer(&mut msg)
    }

    /// Reads `len` bytes in pieces no larger than [`AUX_MAX_PAYLOAD`].
    fn read_dpcd_split(&mut self, address: u32, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len);
        while out.len() < len {
            let piece = (len - out.len()).min(AUX_MAX_PAYLOAD);
            let bytes = self.read_dpcd(address + out.len() as u32, piece)?;
            if bytes.is_empty() {
                break;
            }
            out.extend(bytes);
        }
        Ok(out)
    }

    /// Writes `data` in pieces no larger than [`AUX_MAX_PAYLOAD`].
    fn write_dpcd_split(&mut self, address: u32, data: &[u8]) -> Result<()> {
        for (i, piece) in data.chunks(AUX_MAX_PAYLOAD).enumerate() {
            self.write_dpcd(address + (i * AUX_MAX_PAYLOAD) as u32, piece)?;
        }
        Ok(())
    }

    fn read_guid(&mut self) -> Result<[u8; GUID_LEN]> {
        let bytes = self.read_dpcd(crate::dpcd::GUID, GUID_LEN)?;
        let mut guid = [0u8; GUID_LEN];
        let n = bytes.len().min(GUID_LEN);
        guid[..n].copy_from_slice(&bytes[..n]);
        Ok(guid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mot_bit_is_masked_for_kind_dispatch() {
        let msg = AuxMsg::i2c_read(0x50, 1).with_mot();
        assert_eq!(msg.request, AUX_I2C_READ | AUX_I2C_MOT);
        assert_eq!(msg.kind(), Some(AuxRequest::I2cRead));
        assert_eq!(
            AuxRequest::from_request(AUX_I2C_WRITE | AUX_I2C_MOT),
            Some(AuxRequest::I2cWrite)
        );
        assert_eq!(AuxRequest::from_request(AUX_I2C_WRITE_STATUS_UPDATE), None);
    }

    #[test]
    fn nack_uses_the_request_class_encoding() {
        let mut native = AuxMsg::native_read(0, 1);
        native.nack();
        assert_eq!(native.reply, AUX_NATIVE_REPLY_NACK);

        let mut i2c = AuxMsg::i2c_write(0x50, &[0]);
        i2c.nack();
        assert_eq!(i2c.reply, AUX_I2C_REPLY_NACK);
        assert!(i2c.is_nack());
    }
}
