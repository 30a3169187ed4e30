//! MST sink: a single up-facing port with an EDID on the DDC bus.

use std::any::Any;

use vkms_edid::{DDC_ADDR, SAMPLE_EDID};

use crate::aux::AuxMsg;
use crate::device::{DeviceCtx, DeviceKind, MstDevice, MstDeviceModel, SidebandResult};
use crate::dpcd::{DPCD_REV_14, DWN_STRM_PORT_TYPE_DP, LINK_BW_1_62, LOCAL_EDID_PRESENT};
use crate::emulator::{guid_for_name, MstEmulator, PortKind};
use crate::error::{ProtocolError, Result};
use crate::sideband::ReplyBody;

#[derive(Debug, Default)]
pub struct MstDisplay {
    edid_offset: u8,
}

impl MstDisplay {
    pub fn device(name: &str) -> MstDevice {
        let mut emu = MstEmulator::new(name, &[PortKind::UpFacing]);
        let dpcd = &mut emu.dpcd;
        dpcd.dpcd_rev = DPCD_REV_14;
        dpcd.max_link_rate = LINK_BW_1_62;
        dpcd.max_lane_count = 1;
        dpcd.receive_port_0_cap_0 = LOCAL_EDID_PRESENT;
        dpcd.downstreamport_present = DWN_STRM_PORT_TYPE_DP;
        dpcd.guid = guid_for_name(name);
        MstDevice::new(emu, Box::new(Self::default()))
    }

    /// Current EDID address pointer.
    pub fn edid_offset(&self) -> u8 {
        self.edid_offset
    }

    fn check_address(msg: &mut AuxMsg) -> Result<()> {
        if msg.address != u32::from(DDC_ADDR) {
            return Err(msg.reject(ProtocolError::I2cNack {
                address: msg.address as u8,
            }));
        }
        Ok(())
    }
}

impl MstDeviceModel for MstDisplay {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Display
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn i2c_read(&mut self, msg: &mut AuxMsg) -> Result<usize> {
        Self::check_address(msg)?;
        for byte in msg.buffer.iter_mut() {
            *byte = SAMPLE_EDID[usize::from(self.edid_offset)];
            self.edid_offset = self.edid_offset.wrapping_add(1);
        }
        msg.ack();
        Ok(msg.buffer.len())
    }

    /// Only the one-byte offset write is understood.
    fn i2c_write(&mut self, msg: &mut AuxMsg) -> Result<usize> {
        Self::check_address(msg)?;
        match msg.buffer.as_slice() {
            &[offset] => {
                self.edid_offset = offset;
                msg.ack();
                Ok(1)
            }
            _ => Err(msg.reject(ProtocolError::I2cNack { address: DDC_ADDR })),
        }
    }

    fn clear_payload_id_table(&mut self, _ctx: &mut DeviceCtx<'_>) -> SidebandResult {
        Ok(ReplyBody::ClearPayloadIdTable)
    }
}
