#![forbid(unsafe_code)]

//! DisplayPort MST sideband emulation for virtual displays.
//!
//! Each emulated device owns a DPCD register bank reachable over AUX. Sources write sideband
//! requests into a device's down-request window. Branch devices forward them along the RAD,
//! and the addressed device answers through its down-reply window. Devices live in an
//! [`MstTopology`], which routes every cross-device transaction and runs the deferred
//! decode and interrupt work.

pub mod aux;
mod client;
mod description;
mod device;
mod display;
pub mod dpcd;
mod emulator;
mod error;
mod hub;
mod probe;
mod root;
pub mod sideband;
mod topology;

pub use aux::{AuxChannel, AuxMsg, AuxRequest};
pub use client::{MstEventHandler, ReceivedReply, SidebandClient};
pub use description::{MstNodeDescription, MstTopologyDescription};
pub use device::{
    link_address_reply, DeviceCtx, DeviceKind, MstDevice, MstDeviceModel, PortAux, PortBus,
    SidebandResult,
};
pub use display::MstDisplay;
pub use dpcd::{DpcdMemory, PayloadAllocation};
pub use emulator::{guid_for_name, MstEmulator, MstPort, PortKind, PortLink, MAX_PORTS};
pub use error::{MstError, ProtocolError, Result};
pub use hub::{MstHub, HUB_PBN, MAX_HUB_CHILDREN};
pub use probe::{guid_hex, probe, ProbedBranch, ProbedPort};
pub use root::{MstRoot, ROOT_PORT};
pub use topology::{DeviceId, MstTopology, WORK_BUDGET, WORK_QUEUE_DEPTH};
