//! Arena of connected devices and the work pump that drives them.

use std::collections::VecDeque;

use crate::aux::AuxMsg;
use crate::client::{ReceivedReply, SidebandClient};
use crate::device::{MstDevice, MstDeviceModel, PortBus, Work};
use crate::display::MstDisplay;
use crate::emulator::{Effect, MstEmulator, PortKind, PortLink};
use crate::error::{MstError, Result};
use crate::hub::MstHub;
use crate::root::{MstRoot, ROOT_PORT};
use crate::sideband::{SidebandReply, SidebandRequest};

/// Work items a single device may have pending.
pub const WORK_QUEUE_DEPTH: usize = 32;

/// Work items processed by one [`MstTopology::run_until_idle`] call.
pub const WORK_BUDGET: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(u32);

impl DeviceId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
enum Slot {
    Vacant,
    Present(MstDevice),
    /// Taken out while its work item runs.
    Running,
}

/// Owns every device and the links between them.
///
/// All cross-device traffic goes through [`MstTopology::route`]. Interrupts and sideband
/// decode work are never run inline: they are queued per device and executed in arrival
/// order by [`MstTopology::run_until_idle`].
#[derive(Debug, Default)]
pub struct MstTopology {
    slots: Vec<Slot>,
    queues: Vec<VecDeque<Work>>,
    ready: VecDeque<DeviceId>,
}

fn effect_targets(id: DeviceId, emu: &MstEmulator, effects: Vec<Effect>) -> Vec<(DeviceId, Work)> {
    let mut targets = Vec::with_capacity(effects.len());
    for effect in effects {
        match effect {
            Effect::DownRequest { port, chunk } => {
                targets.push((id, Work::DownRequest { port, chunk }));
            }
            Effect::RaiseIrq { port } => match emu.link(port) {
                Some(link) => targets.push((link.device, Work::Irq { port: link.port })),
                None => {
                    tracing::warn!(device = %emu.name, port, "IRQ raised on an unconnected port");
                }
            },
        }
    }
    targets
}

impl MstTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_device(&mut self, device: MstDevice) -> DeviceId {
        let id = DeviceId(self.slots.len() as u32);
        self.slots.push(Slot::Present(device));
        self.queues.push(VecDeque::new());
        id
    }

    pub fn add_hub(&mut self, name: &str, children: u8) -> Result<DeviceId> {
        Ok(self.add_device(MstHub::device(name, children)?))
    }

    pub fn add_display(&mut self, name: &str) -> DeviceId {
        self.add_device(MstDisplay::device(name))
    }

    pub fn add_root(&mut self, name: &str) -> DeviceId {
        self.add_device(MstRoot::device(name, SidebandClient::new()))
    }

    pub fn device(&self, id: DeviceId) -> Result<&MstDevice> {
        match self.slots.get(id.index()) {
            Some(Slot::Present(device)) => Ok(device),
            _ => Err(MstError::NoSuchDevice(id)),
        }
    }

    fn device_mut(&mut self, id: DeviceId) -> Result<&mut MstDevice> {
        match self.slots.get_mut(id.index()) {
            Some(Slot::Present(device)) => Ok(device),
            _ => Err(MstError::NoSuchDevice(id)),
        }
    }

    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &MstDevice)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Present(device) => Some((DeviceId(i as u32), device)),
            _ => None,
        })
    }

    pub fn find(&self, name: &str) -> Option<DeviceId> {
        self.devices()
            .find(|(_, device)| device.name() == name)
            .map(|(id, _)| id)
    }

    pub fn model<T: MstDeviceModel>(&self, id: DeviceId) -> Option<&T> {
        self.device(id).ok()?.model()
    }

    pub fn model_mut<T: MstDeviceModel>(&mut self, id: DeviceId) -> Option<&mut T> {
        self.device_mut(id).ok()?.model_mut()
    }

    fn port_kind(&self, id: DeviceId, port: u8) -> Result<PortKind> {
        let device = self.device(id)?;
        let kind = device
            .emu
            .port(port)
            .ok_or(MstError::InvalidPort { device: id, port })?
            .kind;
        if device.emu.link(port).is_some() {
            return Err(MstError::PortBusy { device: id, port });
        }
        Ok(kind)
    }

    /// Links an up-facing port to a down-facing one. Both ends must be free.
    pub fn connect(&mut self, a: DeviceId, a_port: u8, b: DeviceId, b_port: u8) -> Result<()> {
        let kinds = (self.port_kind(a, a_port)?, self.port_kind(b, b_port)?);
        let compatible = matches!(
            kinds,
            (PortKind::UpFacing, PortKind::DownFacing) | (PortKind::DownFacing, PortKind::UpFacing)
        );
        if !compatible || a == b {
            return Err(MstError::IncompatiblePorts);
        }
        self.device_mut(a)?.emu.ports[usize::from(a_port)].link = Some(PortLink {
            device: b,
            port: b_port,
        });
        self.device_mut(b)?.emu.ports[usize::from(b_port)].link = Some(PortLink {
            device: a,
            port: a_port,
        });
        tracing::debug!(?a, a_port, ?b, b_port, "linked");
        Ok(())
    }

    /// Unlinks `port` and its peer. Disconnecting a free port is a no-op.
    pub fn disconnect(&mut self, id: DeviceId, port: u8) -> Result<()> {
        let device = self.device_mut(id)?;
        let slot = device
            .emu
            .ports
            .get_mut(usize::from(port))
            .ok_or(MstError::InvalidPort { device: id, port })?;
        let Some(peer) = slot.link.take() else {
            return Ok(());
        };
        if let Ok(other) = self.device_mut(peer.device) {
            other.emu.ports[usize::from(peer.port)].link = None;
        }
        Ok(())
    }

    /// Detaches `id` from every peer and drops its pending work.
    pub fn remove_device(&mut self, id: DeviceId) -> Result<MstDevice> {
        for port in 0..self.device(id)?.emu.ports.len() {
            self.disconnect(id, port as u8)?;
        }
        self.queues[id.index()].clear();
        match std::mem::replace(&mut self.slots[id.index()], Slot::Vacant) {
            Slot::Present(device) => Ok(device),
            other => {
                self.slots[id.index()] = other;
                Err(MstError::NoSuchDevice(id))
            }
        }
    }

    /// One AUX transaction arriving at `port` of `id`.
    pub fn transfer(&mut self, id: DeviceId, port: u8, msg: &mut AuxMsg) -> Result<usize> {
        let (result, targets) = match self.slots.get_mut(id.index()) {
            Some(Slot::Present(device)) => {
                let result = device.transfer(port, msg);
                let effects = device.emu.take_effects();
                (result, effect_targets(id, &device.emu, effects))
            }
            Some(Slot::Running) => return Err(MstError::Timeout { port }),
            _ => return Err(MstError::NoSuchDevice(id)),
        };
        self.enqueue_all(targets);
        result
    }

    /// Delivers `msg` out of `port` of `id` to the linked peer.
    pub fn route(&mut self, id: DeviceId, port: u8, msg: &mut AuxMsg) -> Result<usize> {
        let link = self
            .device(id)?
            .emu
            .link(port)
            .ok_or(MstError::Timeout { port })?;
        self.transfer(link.device, link.port, msg)
    }

    fn enqueue(&mut self, id: DeviceId, work: Work) -> Result<()> {
        if !matches!(self.slots.get(id.index()), Some(Slot::Present(_) | Slot::Running)) {
            return Err(MstError::NoSuchDevice(id));
        }
        let queue = &mut self.queues[id.index()];
        if queue.len() >= WORK_QUEUE_DEPTH {
            tracing::warn!(device = ?id, ?work, "work queue full, dropping");
            return Err(MstError::NotReady);
        }
        queue.push_back(work);
        self.ready.push_back(id);
        Ok(())
    }

    fn enqueue_all(&mut self, targets: Vec<(DeviceId, Work)>) {
        for (target, work) in targets {
            // Overflow and vanished targets are already logged.
            let _ = self.enqueue(target, work);
        }
    }

    /// Work items waiting across all devices.
    pub fn pending_work(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// Runs queued work in arrival order until nothing is left or [`WORK_BUDGET`] items have
    /// run. Returns the number of items processed.
    pub fn run_until_idle(&mut self) -> usize {
        let mut done = 0;
        while let Some(id) = self.ready.pop_front() {
            if done == WORK_BUDGET {
                tracing::warn!(pending = self.pending_work(), "work budget exhausted");
                self.ready.push_front(id);
                break;
            }
            let Some(work) = self.queues[id.index()].pop_front() else {
                continue;
            };
            let mut device =
                match std::mem::replace(&mut self.slots[id.index()], Slot::Running) {
                    Slot::Present(device) => device,
                    other => {
                        self.slots[id.index()] = other;
                        continue;
                    }
                };
            device.run(work, self);
            let effects = device.emu.take_effects();
            let targets = effect_targets(id, &device.emu, effects);
            self.slots[id.index()] = Slot::Present(device);
            self.enqueue_all(targets);
            done += 1;
        }
        done
    }

    fn client_mut(&mut self, root: DeviceId) -> Result<&mut SidebandClient> {
        self.device(root)?;
        self.model_mut::<MstRoot>(root)
            .map(MstRoot::handler_mut)
            .ok_or(MstError::NotARoot(root))
    }

    /// Queues `request` on the root's sideband client for the device at `path`. Returns the
    /// sequence number. Nothing is sent until the topology runs.
    pub fn submit_request(
        &mut self,
        root: DeviceId,
        path: &[u8],
        request: &SidebandRequest,
    ) -> Result<u8> {
        let seqno = self.client_mut(root)?.queue_request(path, request)?;
        self.enqueue(root, Work::Kick)?;
        Ok(seqno)
    }

    pub fn take_reply(&mut self, root: DeviceId) -> Result<Option<ReceivedReply>> {
        Ok(self.client_mut(root)?.take_reply())
    }

    /// Sends one request and runs the topology until its reply comes back.
    ///
    /// A request that is dropped on the way (malformed, or routed to an empty port) never
    /// gets an answer; that surfaces as a timeout on the root port.
    pub fn request(
        &mut self,
        root: DeviceId,
        path: &[u8],
        request: &SidebandRequest,
    ) -> Result<SidebandReply> {
        self.submit_request(root, path, request)?;
        self.run_until_idle();
        match self.take_reply(root)? {
            Some(received) => Ok(received.reply),
            None => {
                self.client_mut(root)?.abandon_in_flight();
                Err(MstError::Timeout { port: ROOT_PORT })
            }
        }
    }
}

impl PortBus for MstTopology {
    fn deliver(&mut self, link: PortLink, msg: &mut AuxMsg) -> Result<usize> {
        self.transfer(link.device, link.port, msg)
    }
}
