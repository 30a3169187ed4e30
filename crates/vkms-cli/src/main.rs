#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use vkms_config::ConfigDescription;
use vkms_device::{DeviceLayout, DeviceOptions, VkmsContext, DEFAULT_DEVICE_NAME};
use vkms_mst::{MstNodeDescription, MstTopology, MstTopologyDescription};

#[derive(Debug, Parser)]
#[command(name = "vkms", about = "Virtual KMS configuration and MST topology tool")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a JSON device configuration and print the layout it would produce.
    Validate {
        /// Configuration description (JSON).
        config: PathBuf,
    },

    /// Bring up the default device and print its configuration and layout.
    ///
    /// Options start from VKMS_ENABLE_CURSOR, VKMS_ENABLE_WRITEBACK and VKMS_ENABLE_OVERLAY;
    /// flags override them.
    Default {
        #[arg(long, action = clap::ArgAction::SetTrue)]
        overlay: bool,

        #[arg(long, action = clap::ArgAction::SetTrue)]
        no_cursor: bool,

        #[arg(long, action = clap::ArgAction::SetTrue)]
        no_writeback: bool,
    },

    /// Enumerate an emulated MST tree from its root and print what was found.
    MstProbe {
        /// Topology description (JSON). Defaults to one hub with two displays.
        topology: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct DefaultReport {
    device: String,
    options: DeviceOptions,
    config: ConfigDescription,
    layout: DeviceLayout,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("serialize output")?
    );
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    let description: ConfigDescription = read_json(path)?;
    let config = description
        .build()
        .with_context(|| format!("build configuration from {}", path.display()))?;
    let layout = DeviceLayout::new(&config)
        .with_context(|| format!("{} is not a usable device", path.display()))?;
    print_json(&layout)
}

fn default_device(overlay: bool, no_cursor: bool, no_writeback: bool) -> Result<()> {
    let mut options = DeviceOptions::from_env().context("read device options")?;
    options.enable_overlay |= overlay;
    options.enable_cursor &= !no_cursor;
    options.enable_writeback &= !no_writeback;

    let mut context = VkmsContext::init(options).context("create default device")?;
    let device = context
        .device(DEFAULT_DEVICE_NAME)
        .context("default device missing")?;
    let config = device.read_config(|config| config.describe())?;
    let layout = device.layout()?.context("default device is not enabled")?;
    print_json(&DefaultReport {
        device: device.name().to_string(),
        options,
        config,
        layout,
    })?;
    context.shutdown();
    Ok(())
}

fn sample_topology() -> MstTopologyDescription {
    let display = |name: &str| MstNodeDescription::Display {
        name: name.to_string(),
    };
    MstTopologyDescription {
        root: "root".to_string(),
        branch: MstNodeDescription::Hub {
            name: "hub".to_string(),
            ports: None,
            children: vec![display("display-1"), display("display-2")],
        },
    }
}

fn mst_probe(path: Option<&Path>) -> Result<()> {
    let description = match path {
        Some(path) => read_json(path)?,
        None => sample_topology(),
    };
    let (mut topology, root) =
        MstTopology::from_description(&description).context("build MST topology")?;
    let tree = vkms_mst::probe(&mut topology, root).context("probe MST topology")?;
    print_json(&tree)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Validate { config } => validate(&config),
        Command::Default {
            overlay,
            no_cursor,
            no_writeback,
        } => default_device(overlay, no_cursor, no_writeback),
        Command::MstProbe { topology } => mst_probe(topology.as_deref()),
    }
}
