use super::SidebandError;

/// Sideband request identifiers.
pub mod req_type {
    pub const GET_MSG_TRANSACTION_VERSION: u8 = 0x00;
    pub const LINK_ADDRESS: u8 = 0x01;
    pub const CONNECTION_STATUS_NOTIFY: u8 = 0x02;
    pub const ENUM_PATH_RESOURCES: u8 = 0x10;
    pub const ALLOCATE_PAYLOAD: u8 = 0x11;
    pub const QUERY_PAYLOAD: u8 = 0x12;
    pub const RESOURCE_STATUS_NOTIFY: u8 = 0x13;
    pub const CLEAR_PAYLOAD_ID_TABLE: u8 = 0x14;
    pub const REMOTE_DPCD_READ: u8 = 0x20;
    pub const REMOTE_DPCD_WRITE: u8 = 0x21;
    pub const REMOTE_I2C_READ: u8 = 0x22;
    pub const REMOTE_I2C_WRITE: u8 = 0x23;
    pub const POWER_UP_PHY: u8 = 0x24;
    pub const POWER_DOWN_PHY: u8 = 0x25;
    pub const SINK_EVENT_NOTIFY: u8 = 0x30;
    pub const QUERY_STREAM_ENC_STATUS: u8 = 0x38;
}

pub fn request_name(request: u8) -> &'static str {
    match request {
        req_type::GET_MSG_TRANSACTION_VERSION => "GET_MSG_TRANSACTION_VERSION",
        req_type::LINK_ADDRESS => "LINK_ADDRESS",
        req_type::CONNECTION_STATUS_NOTIFY => "CONNECTION_STATUS_NOTIFY",
        req_type::ENUM_PATH_RESOURCES => "ENUM_PATH_RESOURCES",
        req_type::ALLOCATE_PAYLOAD => "ALLOCATE_PAYLOAD",
        req_type::QUERY_PAYLOAD => "QUERY_PAYLOAD",
        req_type::RESOURCE_STATUS_NOTIFY => "RESOURCE_STATUS_NOTIFY",
        req_type::CLEAR_PAYLOAD_ID_TABLE => "CLEAR_PAYLOAD_ID_TABLE",
        req_type::REMOTE_DPCD_READ => "REMOTE_DPCD_READ",
        req_type::REMOTE_DPCD_WRITE => "REMOTE_DPCD_WRITE",
        req_type::REMOTE_I2C_READ => "REMOTE_I2C_READ",
        req_type::REMOTE_I2C_WRITE => "REMOTE_I2C_WRITE",
        req_type::POWER_UP_PHY => "POWER_UP_PHY",
        req_type::POWER_DOWN_PHY => "POWER_DOWN_PHY",
        req_type::SINK_EVENT_NOTIFY => "SINK_EVENT_NOTIFY",
        req_type::QUERY_STREAM_ENC_STATUS => "QUERY_STREAM_ENC_STATUS",
        _ => "unknown",
    }
}

/// A REMOTE_I2C_READ carries at most this many write transactions ahead of the read.
pub const MAX_I2C_TRANSACTIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cTransaction {
    pub i2c_dev_id: u8,
    pub bytes: Vec<u8>,
    pub no_stop_bit: bool,
    pub i2c_transaction_delay: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteI2cRead {
    pub port_number: u8,
    pub transactions: Vec<I2cTransaction>,
    pub read_i2c_device_id: u8,
    pub num_bytes_read: u8,
}

impl RemoteI2cRead {
    /// Base EDID block read from the DDC address behind `port_number`.
    pub fn edid_block(port_number: u8, block: u8) -> Self {
        Self {
            port_number,
            transactions: vec![I2cTransaction {
                i2c_dev_id: vkms_edid::DDC_ADDR,
                bytes: vec![block.wrapping_mul(vkms_edid::EDID_BLOCK_SIZE as u8)],
                no_stop_bit: false,
                i2c_transaction_delay: 0,
            }],
            read_i2c_device_id: vkms_edid::DDC_ADDR,
            num_bytes_read: vkms_edid::EDID_BLOCK_SIZE as u8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebandRequest {
    LinkAddress,
    ClearPayloadIdTable,
    EnumPathResources { port_number: u8 },
    RemoteI2cRead(RemoteI2cRead),
    /// Any request this emulator does not interpret. The body is kept verbatim.
    Other { req_type: u8, payload: Vec<u8> },
}

pub(super) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(super) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(super) fn take(&mut self, len: usize) -> Result<&'a [u8], SidebandError> {
        let end = self.pos + len;
        let slice = self.buf.get(self.pos..end).ok_or(SidebandError::Truncated {
            needed: end,
            available: self.buf.len(),
        })?;
        self.pos = end;
        Ok(slice)
    }

    pub(super) fn u8(&mut self) -> Result<u8, SidebandError> {
        Ok(self.take(1)?[0])
    }

    pub(super) fn rest(&mut self) -> &'a [u8] {
        let rest = &self.buf[self.pos.min(self.buf.len())..];
        self.pos = self.buf.len();
        rest
    }
}

impl SidebandRequest {
    pub fn req_type(&self) -> u8 {
        match self {
            Self::LinkAddress => req_type::LINK_ADDRESS,
            Self::ClearPayloadIdTable => req_type::CLEAR_PAYLOAD_ID_TABLE,
            Self::EnumPathResources { .. } => req_type::ENUM_PATH_RESOURCES,
            Self::RemoteI2cRead(_) => req_type::REMOTE_I2C_READ,
            Self::Other { req_type, .. } => *req_type & 0x7f,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, SidebandError> {
        let mut out = vec![self.req_type()];
        match self {
            Self::LinkAddress | Self::ClearPayloadIdTable => {}
            Self::EnumPathResources { port_number } => out.push((port_number & 0xf) << 4),
            Self::RemoteI2cRead(read) => {
                if read.transactions.len() > MAX_I2C_TRANSACTIONS {
                    return Err(SidebandError::InvalidField("too many I2C transactions"));
                }
                out.push(((read.port_number & 0xf) << 4) | read.transactions.len() as u8);
                for tx in &read.transactions {
                    let len = u8::try_from(tx.bytes.len())
                        .map_err(|_| SidebandError::InvalidField("I2C transaction too long"))?;
                    out.push(tx.i2c_dev_id & 0x7f);
                    out.push(len);
                    out.extend_from_slice(&tx.bytes);
                    out.push((u8::from(tx.no_stop_bit) << 4) | (tx.i2c_transaction_delay & 0xf));
                }
                out.push(read.read_i2c_device_id & 0x7f);
                out.push(read.num_bytes_read);
            }
            Self::Other { payload, .. } => out.extend_from_slice(payload),
        }
        Ok(out)
    }

    pub fn decode(body: &[u8]) -> Result<Self, SidebandError> {
        let mut r = Reader::new(body);
        let request = r.u8()? & 0x7f;
        Ok(match request {
            req_type::LINK_ADDRESS => Self::LinkAddress,
            req_type::CLEAR_PAYLOAD_ID_TABLE => Self::ClearPayloadIdTable,
            req_type::ENUM_PATH_RESOURCES => Self::EnumPathResources {
                port_number: r.u8()? >> 4,
            },
            req_type::REMOTE_I2C_READ => {
                let first = r.u8()?;
                let count = usize::from(first & 0x3);
                let mut transactions = Vec::with_capacity(count);
                for _ in 0..count {
                    let i2c_dev_id = r.u8()? & 0x7f;
                    let len = usize::from(r.u8()?);
                    let bytes = r.take(len)?.to_vec();
                    let flags = r.u8()?;
                    transactions.push(I2cTransaction {
                        i2c_dev_id,
                        bytes,
                        no_stop_bit: flags & 0x10 != 0,
                        i2c_transaction_delay: flags & 0xf,
                    });
                }
                Self::RemoteI2cRead(RemoteI2cRead {
                    port_number: first >> 4,
                    transactions,
                    read_i2c_device_id: r.u8()? & 0x7f,
                    num_bytes_read: r.u8()?,
                })
            }
            _ => Self::Other {
                req_type: request,
                payload: r.rest().to_vec(),
            },
        })
    }
}
