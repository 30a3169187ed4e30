//! Serde description of an MST tree.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::root::ROOT_PORT;
use crate::topology::{DeviceId, MstTopology};

fn default_root_name() -> String {
    "root".to_string()
}

/// One device below the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MstNodeDescription {
    /// Child `i` is attached to down-facing port `i + 1`. `ports` may reserve extra empty
    /// down-facing ports beyond the children.
    Hub {
        name: String,
        #[serde(default)]
        ports: Option<u8>,
        #[serde(default)]
        children: Vec<MstNodeDescription>,
    },
    Display {
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MstTopologyDescription {
    #[serde(default = "default_root_name")]
    pub root: String,
    /// Device plugged into the root's port.
    pub branch: MstNodeDescription,
}

impl MstNodeDescription {
    fn build(&self, topology: &mut MstTopology) -> Result<DeviceId> {
        match self {
            Self::Display { name } => Ok(topology.add_display(name)),
            Self::Hub {
                name,
                ports,
                children,
            } => {
                let requested = ports.map_or(0, usize::from).max(children.len());
                let count = u8::try_from(requested).unwrap_or(u8::MAX);
                let hub = topology.add_hub(name, count)?;
                for (i, child) in children.iter().enumerate() {
                    let id = child.build(topology)?;
                    topology.connect(hub, i as u8 + 1, id, 0)?;
                }
                Ok(hub)
            }
        }
    }
}

impl MstTopology {
    /// Builds a connected topology. Returns it together with the root device.
    pub fn from_description(description: &MstTopologyDescription) -> Result<(Self, DeviceId)> {
        let mut topology = Self::new();
        let root = topology.add_root(&description.root);
        let branch = description.branch.build(&mut topology)?;
        topology.connect(root, ROOT_PORT, branch, 0)?;
        Ok((topology, root))
    }
}
