//! The source end of the tree: the graphics device's own AUX originator.

use std::any::Any;

use crate::aux::AuxChannel;
use crate::client::{MstEventHandler, SidebandClient};
use crate::device::{DeviceCtx, DeviceKind, MstDevice, MstDeviceModel};
use crate::dpcd::{ESI_LEN, SINK_COUNT_ESI};
use crate::emulator::{MstEmulator, PortKind};

/// Port the root's single link hangs off.
pub const ROOT_PORT: u8 = 0;

/// Upper bound on ESI polling rounds per interrupt.
const MAX_ESI_ROUNDS: usize = 64;

#[derive(Debug, Default)]
pub struct MstRoot<H: MstEventHandler = SidebandClient> {
    handler: H,
}

impl<H: MstEventHandler + 'static> MstRoot<H> {
    pub fn device(name: &str, handler: H) -> MstDevice {
        let emu = MstEmulator::new(name, &[PortKind::DownFacing]);
        MstDevice::new(emu, Box::new(Self { handler }))
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }
}

impl<H: MstEventHandler + 'static> MstDeviceModel for MstRoot<H> {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Root
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn native_aux(&self) -> bool {
        false
    }

    fn irq(&mut self, ctx: &mut DeviceCtx<'_>, port: u8) {
        let mut aux = ctx.aux(port);
        for _ in 0..MAX_ESI_ROUNDS {
            let bytes = match aux.read_dpcd(SINK_COUNT_ESI, ESI_LEN) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(port, %err, "cannot read ESI");
                    break;
                }
            };
            let mut esi = [0u8; ESI_LEN];
            let n = bytes.len().min(ESI_LEN);
            esi[..n].copy_from_slice(&bytes[..n]);

            let mut ack = [0u8; ESI_LEN];
            if !self.handler.handle_event(&mut aux, &esi, &mut ack) {
                break;
            }
            if ack.iter().any(|&b| b != 0) {
                if let Err(err) = aux.write_dpcd(SINK_COUNT_ESI, &ack) {
                    tracing::warn!(port, %err, "cannot acknowledge ESI");
                    break;
                }
            }
        }
        self.handler.send_new_request(&mut aux);
    }

    fn kick(&mut self, ctx: &mut DeviceCtx<'_>) {
        self.handler.send_new_request(&mut ctx.aux(ROOT_PORT));
    }
}
