//! Walks a topology from its root the way a DRM MST manager enumerates a tree.

use serde::Serialize;

use crate::dpcd::GUID_LEN;
use crate::error::{MstError, Result};
use crate::sideband::{
    request_name, req_type, LinkAddressPort, PeerDeviceType, RemoteI2cRead, ReplyBody,
    SidebandReply, SidebandRequest, MAX_LCT,
};
use crate::topology::{DeviceId, MstTopology};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbedPort {
    pub port: u8,
    pub peer_device_type: PeerDeviceType,
    pub dpcd_revision: u8,
    /// Set for MST branching peers.
    pub branch: Option<ProbedBranch>,
    /// Base EDID block of an SST sink.
    pub edid: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbedBranch {
    /// RAD path from the first branch.
    pub path: Vec<u8>,
    pub guid: String,
    pub ports: Vec<ProbedPort>,
}

pub fn guid_hex(guid: &[u8; GUID_LEN]) -> String {
    guid.iter().map(|b| format!("{b:02x}")).collect()
}

fn expect_ack(reply: SidebandReply, request: u8) -> Result<ReplyBody> {
    match reply.body {
        ReplyBody::Nak { reason, .. } => Err(MstError::Nak {
            request: request_name(request),
            reason,
        }),
        body if reply.req_type == request => Ok(body),
        _ => Err(MstError::UnexpectedReply {
            request: request_name(request),
        }),
    }
}

fn read_edid(
    topology: &mut MstTopology,
    root: DeviceId,
    path: &[u8],
    port: u8,
) -> Result<Vec<u8>> {
    let request = SidebandRequest::RemoteI2cRead(RemoteI2cRead::edid_block(port, 0));
    let reply = topology.request(root, path, &request)?;
    match expect_ack(reply, req_type::REMOTE_I2C_READ)? {
        ReplyBody::RemoteI2cRead(ack) => Ok(ack.bytes),
        _ => Err(MstError::UnexpectedReply {
            request: request_name(req_type::REMOTE_I2C_READ),
        }),
    }
}

fn probe_port(
    topology: &mut MstTopology,
    root: DeviceId,
    path: &[u8],
    descriptor: &LinkAddressPort,
) -> Result<ProbedPort> {
    let mut probed = ProbedPort {
        port: descriptor.port_number,
        peer_device_type: descriptor.peer_device_type,
        dpcd_revision: descriptor.dpcd_revision,
        branch: None,
        edid: None,
    };
    match descriptor.peer_device_type {
        PeerDeviceType::MstBranching if path.len() + 1 < usize::from(MAX_LCT) => {
            let mut child = path.to_vec();
            child.push(descriptor.port_number);
            probed.branch = Some(probe_branch(topology, root, &child)?);
        }
        PeerDeviceType::MstBranching => {
            tracing::warn!(?path, port = descriptor.port_number, "branch too deep to address");
        }
        PeerDeviceType::SstSink => {
            match read_edid(topology, root, path, descriptor.port_number) {
                Ok(edid) => probed.edid = Some(edid),
                Err(err) => {
                    tracing::warn!(?path, port = descriptor.port_number, %err, "EDID read failed");
                }
            }
        }
        _ => {}
    }
    Ok(probed)
}

fn probe_branch(topology: &mut MstTopology, root: DeviceId, path: &[u8]) -> Result<ProbedBranch> {
    let reply = topology.request(root, path, &SidebandRequest::LinkAddress)?;
    let ack = match expect_ack(reply, req_type::LINK_ADDRESS)? {
        ReplyBody::LinkAddress(ack) => ack,
        _ => {
            return Err(MstError::UnexpectedReply {
                request: request_name(req_type::LINK_ADDRESS),
            })
        }
    };

    let mut ports = Vec::new();
    for descriptor in ack.ports.iter().filter(|p| !p.input_port) {
        ports.push(probe_port(topology, root, path, descriptor)?);
    }
    Ok(ProbedBranch {
        path: path.to_vec(),
        guid: guid_hex(&ack.guid),
        ports,
    })
}

/// Enumerates every branch reachable from `root` with LINK_ADDRESS, reading the base EDID
/// block of each SST sink through its parent branch.
pub fn probe(topology: &mut MstTopology, root: DeviceId) -> Result<ProbedBranch> {
    probe_branch(topology, root, &[])
}
