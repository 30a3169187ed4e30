//! DisplayPort MST sideband message codec.
//!
//! A sideband message is split into chunks of at most [`SIDEBAND_CHUNK_MAX`] bytes. Each chunk
//! carries a header (routing fields plus a CRC4), up to `msg_len - 1` body bytes and a CRC8 of
//! those body bytes.

mod chunk;
mod crc;
mod header;
mod rad;
mod reply;
mod request;

use thiserror::Error;

pub use chunk::{decode_chunk, encode_chunks, MsgAssembler, MAX_MESSAGE_LEN, SIDEBAND_CHUNK_MAX};
pub(crate) use chunk::{chunk_len, encode_chunk};
pub use crc::{data_crc8, header_crc4};
pub use header::SidebandMsgHeader;
pub use rad::{Rad, MAX_LCT};
pub use reply::{
    EnumPathResourcesAck, LinkAddressAck, LinkAddressPort, NakReason, PeerDeviceType,
    RemoteI2cReadAck, ReplyBody, SidebandReply, LINK_ADDRESS_MAX_PORTS, REPLY_ACK, REPLY_NAK,
};
pub use request::{
    request_name, req_type, I2cTransaction, RemoteI2cRead, SidebandRequest,
    MAX_I2C_TRANSACTIONS,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SidebandError {
    #[error("sideband buffer truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("sideband header CRC mismatch")]
    HeaderCrc,

    #[error("sideband body CRC mismatch")]
    BodyCrc,

    #[error("sideband header carries an empty message")]
    ZeroLength,

    #[error("invalid sideband field: {0}")]
    InvalidField(&'static str),
}
