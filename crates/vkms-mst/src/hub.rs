//! MST branch device: one up-facing port and up to fourteen down-facing ones.

use std::any::Any;

use crate::aux::{AuxChannel, AuxMsg, AUX_MAX_PAYLOAD};
use crate::device::{DeviceCtx, DeviceKind, MstDevice, MstDeviceModel, SidebandResult};
use crate::dpcd::{
    CAP_ANSI_8B10B, DEVICE_SERVICE_IRQ_VECTOR, DOWN_REP_MSG_RDY, DPCD_REV_14,
    DWN_STRM_PORT_PRESENT, LINK_BW_1_62, MAX_LANE_COUNT_MASK, MST_CAP,
    SIDEBAND_MSG_DOWN_REP_BASE,
};
use crate::emulator::{guid_for_name, MstEmulator, PortKind, MAX_PORTS};
use crate::error::{MstError, Result};
use crate::sideband::{
    decode_chunk, EnumPathResourcesAck, MsgAssembler, NakReason, RemoteI2cRead,
    RemoteI2cReadAck, ReplyBody, LINK_ADDRESS_MAX_PORTS, SIDEBAND_CHUNK_MAX,
};

/// Largest number of down-facing ports a hub can have. Together with the up-facing port they
/// must fit the LINK_ADDRESS port count.
pub const MAX_HUB_CHILDREN: u8 = (LINK_ADDRESS_MAX_PORTS - 1) as u8;

/// Payload bandwidth reported by ENUM_PATH_RESOURCES.
pub const HUB_PBN: u16 = 1;

#[derive(Debug)]
pub struct MstHub {
    /// Replies being reassembled, one slot per port they arrive on.
    replies: Vec<MsgAssembler>,
}

impl MstHub {
    /// Builds a hub device with `children` down-facing ports numbered `1..=children`.
    pub fn device(name: &str, children: u8) -> Result<MstDevice> {
        if children > MAX_HUB_CHILDREN {
            return Err(MstError::TooManyPorts {
                requested: children,
            });
        }
        let mut kinds = vec![PortKind::UpFacing];
        kinds.extend(std::iter::repeat(PortKind::DownFacing).take(usize::from(children)));

        let mut emu = MstEmulator::new(name, &kinds);
        let dpcd = &mut emu.dpcd;
        dpcd.dpcd_rev = DPCD_REV_14;
        dpcd.max_link_rate = LINK_BW_1_62;
        dpcd.max_lane_count = MAX_LANE_COUNT_MASK;
        dpcd.norp = 0x01;
        dpcd.downstreamport_present = DWN_STRM_PORT_PRESENT;
        dpcd.main_link_channel_coding = CAP_ANSI_8B10B;
        dpcd.down_stream_port_count = children;
        dpcd.mstm_cap = MST_CAP;
        dpcd.guid = guid_for_name(name);

        let hub = Self {
            replies: (0..MAX_PORTS).map(|_| MsgAssembler::new()).collect(),
        };
        Ok(MstDevice::new(emu, Box::new(hub)))
    }

    fn i2c_transactions(
        ctx: &mut DeviceCtx<'_>,
        request: &RemoteI2cRead,
    ) -> Result<Vec<u8>> {
        let port = request.port_number;
        for tx in &request.transactions {
            let mut msg = AuxMsg::i2c_write(tx.i2c_dev_id, &tx.bytes);
            if tx.no_stop_bit {
                msg = msg.with_mot();
            }
            ctx.route(port, &mut msg)?;
        }

        let total = usize::from(request.num_bytes_read);
        let mut bytes = Vec::with_capacity(total);
        while bytes.len() < total {
            let piece = (total - bytes.len()).min(AUX_MAX_PAYLOAD);
            let mut msg = AuxMsg::i2c_read(request.read_i2c_device_id, piece);
            if bytes.len() + piece < total {
                msg = msg.with_mot();
            }
            let n = ctx.route(port, &mut msg)?;
            if n == 0 {
                break;
            }
            bytes.extend_from_slice(&msg.buffer[..n]);
        }
        Ok(bytes)
    }

    /// Pulls one reply chunk from the child behind `port` and relays it upstream.
    fn drain_reply(&mut self, ctx: &mut DeviceCtx<'_>, port: u8) -> Result<()> {
        let chunk = ctx
            .aux(port)
            .read_dpcd_split(SIDEBAND_MSG_DOWN_REP_BASE, SIDEBAND_CHUNK_MAX)?;

        match decode_chunk(&chunk) {
            Ok((mut header, body)) if header.lcr > 0 => {
                let Some(hops) = header.lct.checked_sub(header.lcr).filter(|&h| h > 0) else {
                    tracing::warn!(
                        device = %ctx.emu.name,
                        port,
                        lct = header.lct,
                        lcr = header.lcr,
                        "dropping reply with no hops to retrace"
                    );
                    ctx.aux(port)
                        .write_dpcd(DEVICE_SERVICE_IRQ_VECTOR, &[DOWN_REP_MSG_RDY])?;
                    return Ok(());
                };
                let upstream = header.rad.retreat(hops, port);
                header.lcr -= 1;
                if let Some((start, reply)) =
                    self.replies[usize::from(port)].push(&header, body)
                {
                    ctx.emu.queue_reply(upstream, &start, &reply);
                }
            }
            Ok(_) => {
                tracing::warn!(device = %ctx.emu.name, port, "reply with no links remaining");
            }
            Err(err) => {
                tracing::warn!(device = %ctx.emu.name, port, %err, "dropping malformed reply");
            }
        }

        ctx.aux(port)
            .write_dpcd(DEVICE_SERVICE_IRQ_VECTOR, &[DOWN_REP_MSG_RDY])?;
        Ok(())
    }
}

impl MstDeviceModel for MstHub {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Hub
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clear_payload_id_table(&mut self, _ctx: &mut DeviceCtx<'_>) -> SidebandResult {
        Ok(ReplyBody::ClearPayloadIdTable)
    }

    fn enum_path_resources(&mut self, _ctx: &mut DeviceCtx<'_>, port: u8) -> SidebandResult {
        Ok(ReplyBody::EnumPathResources(EnumPathResourcesAck {
            port_number: port,
            fec_capable: false,
            full_payload_bw_number: HUB_PBN,
            avail_payload_bw_number: HUB_PBN,
        }))
    }

    fn remote_i2c_read(
        &mut self,
        ctx: &mut DeviceCtx<'_>,
        request: &RemoteI2cRead,
    ) -> SidebandResult {
        let port = request.port_number;
        let down_facing = ctx.emu.port(port).map(|p| p.kind) == Some(PortKind::DownFacing);
        if !down_facing || ctx.emu.link(port).is_none() {
            tracing::debug!(
                device = %ctx.emu.name,
                port,
                "remote I2C read on an empty or up-facing port"
            );
            return Err(NakReason::BadParam);
        }
        match Self::i2c_transactions(ctx, request) {
            Ok(bytes) => Ok(ReplyBody::RemoteI2cRead(RemoteI2cReadAck {
                port_number: port,
                bytes,
            })),
            Err(err) => {
                tracing::debug!(device = %ctx.emu.name, port, %err, "remote I2C read failed");
                Err(NakReason::I2cNak)
            }
        }
    }

    fn irq(&mut self, ctx: &mut DeviceCtx<'_>, port: u8) {
        let esi = match ctx.aux(port).read_dpcd_byte(DEVICE_SERVICE_IRQ_VECTOR) {
            Ok(esi) => esi,
            Err(err) => {
                tracing::warn!(device = %ctx.emu.name, port, %err, "cannot read IRQ vector");
                return;
            }
        };
        if esi & DOWN_REP_MSG_RDY == 0 {
            return;
        }
        if let Err(err) = self.drain_reply(ctx, port) {
            tracing::warn!(device = %ctx.emu.name, port, %err, "cannot drain down reply");
        }
    }
}
