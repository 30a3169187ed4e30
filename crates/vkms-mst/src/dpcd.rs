//! DPCD register layout and the per-device register file.
//!
//! Addresses and bit values follow the DisplayPort DPCD map. Only the registers the emulator
//! models are listed; every other address is unmapped and NACKs.

// Receiver capability.
pub const DPCD_REV: u32 = 0x000;
pub const MAX_LINK_RATE: u32 = 0x001;
pub const MAX_LANE_COUNT: u32 = 0x002;
pub const MAX_DOWNSPREAD: u32 = 0x003;
pub const NORP: u32 = 0x004;
pub const DOWNSTREAMPORT_PRESENT: u32 = 0x005;
pub const MAIN_LINK_CHANNEL_CODING: u32 = 0x006;
pub const DOWN_STREAM_PORT_COUNT: u32 = 0x007;
pub const RECEIVE_PORT_0_CAP_0: u32 = 0x008;
pub const RECEIVE_PORT_0_BUFFER_SIZE: u32 = 0x009;
pub const RECEIVE_PORT_1_CAP_0: u32 = 0x00a;
pub const RECEIVE_PORT_1_BUFFER_SIZE: u32 = 0x00b;
pub const I2C_SPEED_CAP: u32 = 0x00c;
pub const EDP_CONFIGURATION_CAP: u32 = 0x00d;
pub const TRAINING_AUX_RD_INTERVAL: u32 = 0x00e;
pub const MSTM_CAP: u32 = 0x021;
pub const GUID: u32 = 0x030;
pub const GUID_LEN: usize = 16;

// Link configuration.
pub const MSTM_CTRL: u32 = 0x111;
pub const PAYLOAD_ALLOCATE_SET: u32 = 0x1c0;
pub const PAYLOAD_ALLOCATE_START_TIME_SLOT: u32 = 0x1c1;
pub const PAYLOAD_ALLOCATE_TIME_SLOT_COUNT: u32 = 0x1c2;

// Sideband message windows.
pub const SIDEBAND_MSG_DOWN_REQ_BASE: u32 = 0x1000;
pub const SIDEBAND_MSG_UP_REP_BASE: u32 = 0x1200;
pub const SIDEBAND_MSG_DOWN_REP_BASE: u32 = 0x1400;
pub const SIDEBAND_MSG_UP_REQ_BASE: u32 = 0x1600;
pub const SIDEBAND_MSG_WINDOW_LEN: usize = 0x200;

// Link/sink status.
pub const SINK_COUNT: u32 = 0x200;
pub const DEVICE_SERVICE_IRQ_VECTOR: u32 = 0x201;
pub const PAYLOAD_TABLE_UPDATE_STATUS: u32 = 0x2c0;

// Event status indicators.
pub const SINK_COUNT_ESI: u32 = 0x2002;
pub const DEVICE_SERVICE_IRQ_VECTOR_ESI0: u32 = 0x2003;
pub const DEVICE_SERVICE_IRQ_VECTOR_ESI1: u32 = 0x2004;
pub const LINK_SERVICE_IRQ_VECTOR_ESI0: u32 = 0x2005;
pub const PSR_ERROR_STATUS: u32 = 0x2006;
/// Bytes from `SINK_COUNT_ESI` up to (not including) `PSR_ERROR_STATUS`.
pub const ESI_LEN: usize = (PSR_ERROR_STATUS - SINK_COUNT_ESI) as usize;

// Register values.
pub const DPCD_REV_14: u8 = 0x14;
pub const LINK_BW_1_62: u8 = 0x06;
pub const MAX_LANE_COUNT_MASK: u8 = 0x1f;
pub const CAP_ANSI_8B10B: u8 = 1 << 0;
pub const MST_CAP: u8 = 1 << 0;
pub const LOCAL_EDID_PRESENT: u8 = 1 << 1;

pub const DWN_STRM_PORT_PRESENT: u8 = 1 << 0;
pub const DWN_STRM_PORT_TYPE_MASK: u8 = 0x06;
pub const DWN_STRM_PORT_TYPE_DP: u8 = 0x00;
pub const DWN_STRM_PORT_TYPE_ANALOG: u8 = 0x02;
pub const DWN_STRM_PORT_TYPE_TMDS: u8 = 0x04;
pub const DWN_STRM_PORT_TYPE_OTHER: u8 = 0x06;

pub const MST_EN: u8 = 1 << 0;
pub const UP_REQ_EN: u8 = 1 << 1;
pub const UPSTREAM_IS_SRC: u8 = 1 << 2;

pub const DOWN_REP_MSG_RDY: u8 = 1 << 4;
pub const UP_REQ_MSG_RDY: u8 = 1 << 5;

pub const PAYLOAD_TABLE_UPDATED: u8 = 1 << 0;
pub const PAYLOAD_ACT_HANDLED: u8 = 1 << 1;

/// One virtual-channel payload slot range recorded through the payload allocation registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadAllocation {
    pub vcpi: u8,
    pub start_slot: u8,
    pub slot_count: u8,
}

/// Named cell an address resolves to in one transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    DpcdRev,
    MaxLinkRate,
    MaxLaneCount,
    MaxDownspread,
    Norp,
    DownstreamPortPresent,
    MainLinkChannelCoding,
    DownStreamPortCount,
    ReceivePort0Cap0,
    ReceivePort0BufferSize,
    ReceivePort1Cap0,
    ReceivePort1BufferSize,
    I2cSpeedCap,
    EdpConfigurationCap,
    TrainingAuxRdInterval,
    MstmCap,
    Guid(usize),
    MstmCtrl,
    PayloadAllocateSet,
    PayloadAllocateStartTimeSlot,
    PayloadAllocateTimeSlotCount,
    PayloadTableUpdateStatus,
    SinkCountEsi,
    Esi0,
    Esi1,
    LinkServiceEsi0,
    DownReq(usize),
    DownRep(usize),
}

fn window_offset(address: u32, base: u32, len: usize) -> Option<usize> {
    let offset = address.checked_sub(base)? as usize;
    (offset < len).then_some(offset)
}

fn common_cell(address: u32) -> Option<Cell> {
    if let Some(offset) = window_offset(address, GUID, GUID_LEN) {
        return Some(Cell::Guid(offset));
    }
    Some(match address {
        MSTM_CTRL => Cell::MstmCtrl,
        PAYLOAD_ALLOCATE_SET => Cell::PayloadAllocateSet,
        PAYLOAD_ALLOCATE_START_TIME_SLOT => Cell::PayloadAllocateStartTimeSlot,
        PAYLOAD_ALLOCATE_TIME_SLOT_COUNT => Cell::PayloadAllocateTimeSlotCount,
        PAYLOAD_TABLE_UPDATE_STATUS => Cell::PayloadTableUpdateStatus,
        SINK_COUNT_ESI => Cell::SinkCountEsi,
        DEVICE_SERVICE_IRQ_VECTOR | DEVICE_SERVICE_IRQ_VECTOR_ESI0 => Cell::Esi0,
        DEVICE_SERVICE_IRQ_VECTOR_ESI1 => Cell::Esi1,
        LINK_SERVICE_IRQ_VECTOR_ESI0 => Cell::LinkServiceEsi0,
        _ => return None,
    })
}

fn read_cell(address: u32) -> Option<Cell> {
    if let Some(offset) =
        window_offset(address, SIDEBAND_MSG_DOWN_REP_BASE, SIDEBAND_MSG_WINDOW_LEN)
    {
        return Some(Cell::DownRep(offset));
    }
    let cell = match address {
        DPCD_REV => Cell::DpcdRev,
        MAX_LINK_RATE => Cell::MaxLinkRate,
        MAX_LANE_COUNT => Cell::MaxLaneCount,
        MAX_DOWNSPREAD => Cell::MaxDownspread,
        NORP => Cell::Norp,
        DOWNSTREAMPORT_PRESENT => Cell::DownstreamPortPresent,
        MAIN_LINK_CHANNEL_CODING => Cell::MainLinkChannelCoding,
        DOWN_STREAM_PORT_COUNT => Cell::DownStreamPortCount,
        RECEIVE_PORT_0_CAP_0 => Cell::ReceivePort0Cap0,
        RECEIVE_PORT_0_BUFFER_SIZE => Cell::ReceivePort0BufferSize,
        RECEIVE_PORT_1_CAP_0 => Cell::ReceivePort1Cap0,
        RECEIVE_PORT_1_BUFFER_SIZE => Cell::ReceivePort1BufferSize,
        I2C_SPEED_CAP => Cell::I2cSpeedCap,
        EDP_CONFIGURATION_CAP => Cell::EdpConfigurationCap,
        TRAINING_AUX_RD_INTERVAL => Cell::TrainingAuxRdInterval,
        MSTM_CAP => Cell::MstmCap,
        SINK_COUNT => Cell::SinkCountEsi,
        _ => return common_cell(address),
    };
    Some(cell)
}

fn write_cell(address: u32) -> Option<Cell> {
    if let Some(offset) =
        window_offset(address, SIDEBAND_MSG_DOWN_REQ_BASE, SIDEBAND_MSG_WINDOW_LEN)
    {
        return Some(Cell::DownReq(offset));
    }
    common_cell(address)
}

/// Resolves every byte of `[address, address + len)`, failing on the first unmapped one.
fn resolve(
    address: u32,
    len: usize,
    lookup: fn(u32) -> Option<Cell>,
) -> Result<Vec<Cell>, u32> {
    (0..len)
        .map(|i| {
            let addr = address.wrapping_add(i as u32);
            lookup(addr).ok_or(addr)
        })
        .collect()
}

/// Virtual DPCD register bank of one emulated device.
///
/// Fields are public so device variants can program their capabilities at construction time;
/// afterwards the bank is driven through [`DpcdMemory::read`] and [`DpcdMemory::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpcdMemory {
    pub dpcd_rev: u8,
    pub max_link_rate: u8,
    pub max_lane_count: u8,
    pub max_downspread: u8,
    pub norp: u8,
    pub downstreamport_present: u8,
    pub main_link_channel_coding: u8,
    pub down_stream_port_count: u8,
    pub receive_port_0_cap_0: u8,
    pub receive_port_0_buffer_size: u8,
    pub receive_port_1_cap_0: u8,
    pub receive_port_1_buffer_size: u8,
    pub i2c_speed_cap: u8,
    pub edp_configuration_cap: u8,
    pub training_aux_rd_interval: u8,
    pub mstm_cap: u8,
    pub guid: [u8; GUID_LEN],
    pub mstm_ctrl: u8,
    pub payload_allocate_set: u8,
    pub payload_allocate_start_time_slot: u8,
    pub payload_allocate_time_slot_count: u8,
    pub payload_table_update_status: u8,
    pub sink_count_esi: u8,
    pub device_service_irq_vector_esi0: u8,
    pub device_service_irq_vector_esi1: u8,
    pub link_service_irq_vector_esi0: u8,
    pub down_req: [u8; SIDEBAND_MSG_WINDOW_LEN],
    pub down_rep: [u8; SIDEBAND_MSG_WINDOW_LEN],
    payload_table: Vec<PayloadAllocation>,
}

impl Default for DpcdMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl DpcdMemory {
    /// All-zero register bank.
    pub fn new() -> Self {
        Self {
            dpcd_rev: 0,
            max_link_rate: 0,
            max_lane_count: 0,
            max_downspread: 0,
            norp: 0,
            downstreamport_present: 0,
            main_link_channel_coding: 0,
            down_stream_port_count: 0,
            receive_port_0_cap_0: 0,
            receive_port_0_buffer_size: 0,
            receive_port_1_cap_0: 0,
            receive_port_1_buffer_size: 0,
            i2c_speed_cap: 0,
            edp_configuration_cap: 0,
            training_aux_rd_interval: 0,
            mstm_cap: 0,
            guid: [0; GUID_LEN],
            mstm_ctrl: 0,
            payload_allocate_set: 0,
            payload_allocate_start_time_slot: 0,
            payload_allocate_time_slot_count: 0,
            payload_table_update_status: 0,
            sink_count_esi: 0,
            device_service_irq_vector_esi0: 0,
            device_service_irq_vector_esi1: 0,
            link_service_irq_vector_esi0: 0,
            down_req: [0; SIDEBAND_MSG_WINDOW_LEN],
            down_rep: [0; SIDEBAND_MSG_WINDOW_LEN],
            payload_table: Vec::new(),
        }
    }

    /// Payload slots currently allocated through the payload allocation registers.
    pub fn payload_table(&self) -> &[PayloadAllocation] {
        &self.payload_table
    }

    fn read_byte(&self, cell: Cell) -> u8 {
        match cell {
            Cell::DpcdRev => self.dpcd_rev,
            Cell::MaxLinkRate => self.max_link_rate,
            Cell::MaxLaneCount => self.max_lane_count,
            Cell::MaxDownspread => self.max_downspread,
            Cell::Norp => self.norp,
            Cell::DownstreamPortPresent => self.downstreamport_present,
            Cell::MainLinkChannelCoding => self.main_link_channel_coding,
            Cell::DownStreamPortCount => self.down_stream_port_count,
            Cell::ReceivePort0Cap0 => self.receive_port_0_cap_0,
            Cell::ReceivePort0BufferSize => self.receive_port_0_buffer_size,
            Cell::ReceivePort1Cap0 => self.receive_port_1_cap_0,
            Cell::ReceivePort1BufferSize => self.receive_port_1_buffer_size,
            Cell::I2cSpeedCap => self.i2c_speed_cap,
            Cell::EdpConfigurationCap => self.edp_configuration_cap,
            Cell::TrainingAuxRdInterval => self.training_aux_rd_interval,
            Cell::MstmCap => self.mstm_cap,
            Cell::Guid(i) => self.guid[i],
            Cell::MstmCtrl => self.mstm_ctrl,
            Cell::PayloadAllocateSet => self.payload_allocate_set,
            Cell::PayloadAllocateStartTimeSlot => self.payload_allocate_start_time_slot,
            Cell::PayloadAllocateTimeSlotCount => self.payload_allocate_time_slot_count,
            Cell::PayloadTableUpdateStatus => self.payload_table_update_status,
            Cell::SinkCountEsi => self.sink_count_esi,
            Cell::Esi0 => self.device_service_irq_vector_esi0,
            Cell::Esi1 => self.device_service_irq_vector_esi1,
            Cell::LinkServiceEsi0 => self.link_service_irq_vector_esi0,
            Cell::DownReq(i) => self.down_req[i],
            Cell::DownRep(i) => self.down_rep[i],
        }
    }

    fn write_byte(&mut self, cell: Cell, value: u8) {
        match cell {
            Cell::Guid(i) => self.guid[i] = value,
            Cell::MstmCtrl => self.mstm_ctrl = value,
            Cell::PayloadTableUpdateStatus => {
                self.payload_table_update_status &=
                    !(value & (PAYLOAD_TABLE_UPDATED | PAYLOAD_ACT_HANDLED));
            }
            Cell::PayloadAllocateSet => {
                self.payload_allocate_set = value;
                self.update_payload_table(cell);
            }
            Cell::PayloadAllocateStartTimeSlot => {
                self.payload_allocate_start_time_slot = value;
                self.update_payload_table(cell);
            }
            Cell::PayloadAllocateTimeSlotCount => {
                self.payload_allocate_time_slot_count = value;
                self.update_payload_table(cell);
            }
            Cell::Esi0 => self.device_service_irq_vector_esi0 ^= value & 0x7f,
            Cell::Esi1 => self.device_service_irq_vector_esi1 ^= value & 0x1f,
            Cell::LinkServiceEsi0 => self.link_service_irq_vector_esi0 ^= value & 0x1f,
            Cell::DownReq(i) => self.down_req[i] = value,
            // Read-only from the AUX side.
            Cell::SinkCountEsi => {}
            Cell::DpcdRev
            | Cell::MaxLinkRate
            | Cell::MaxLaneCount
            | Cell::MaxDownspread
            | Cell::Norp
            | Cell::DownstreamPortPresent
            | Cell::MainLinkChannelCoding
            | Cell::DownStreamPortCount
            | Cell::ReceivePort0Cap0
            | Cell::ReceivePort0BufferSize
            | Cell::ReceivePort1Cap0
            | Cell::ReceivePort1BufferSize
            | Cell::I2cSpeedCap
            | Cell::EdpConfigurationCap
            | Cell::TrainingAuxRdInterval
            | Cell::MstmCap
            | Cell::DownRep(_) => {}
        }
    }

    fn update_payload_table(&mut self, written: Cell) {
        let set = self.payload_allocate_set;
        let start = self.payload_allocate_start_time_slot;
        let count = self.payload_allocate_time_slot_count;

        if set == 0 && start == 0 && count == 0 {
            self.payload_table.clear();
            self.payload_table_update_status |= PAYLOAD_TABLE_UPDATED;
            return;
        }

        // The allocation triple is committed by its last register.
        if written == Cell::PayloadAllocateTimeSlotCount && set != 0 {
            let vcpi = set & 0x7f;
            self.payload_table.retain(|slot| slot.vcpi != vcpi);
            if count != 0 {
                self.payload_table.push(PayloadAllocation {
                    vcpi,
                    start_slot: start,
                    slot_count: count,
                });
            }
            self.payload_table_update_status |= PAYLOAD_TABLE_UPDATED;
        }
    }

    /// Copies `buf.len()` bytes starting at `address` into `buf`.
    ///
    /// The whole range is resolved before anything is copied; on failure the first unmapped
    /// address is returned and `buf` is untouched.
    pub fn read(&self, address: u32, buf: &mut [u8]) -> Result<(), u32> {
        let cells = resolve(address, buf.len(), read_cell)?;
        for (dst, cell) in buf.iter_mut().zip(cells) {
            *dst = self.read_byte(cell);
        }
        Ok(())
    }

    /// Applies `data` starting at `address`, with the same all-or-nothing resolution as
    /// [`DpcdMemory::read`].
    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<(), u32> {
        let cells = resolve(address, data.len(), write_cell)?;
        for (&value, cell) in data.iter().zip(cells) {
            self.write_byte(cell, value);
        }
        Ok(())
    }
}
