//! QEMU machine types and the capabilities they imply.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Accelerator options for machines that expose NVDIMM.
const ACCEL_NVDIMM: &str = "kvm,kernel_irqchip,nvdimm";

/// Accelerator options for the standard PC machine.
const ACCEL_DEFAULT: &str = "kvm,kernel_irqchip";

/// Supported QEMU machine types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MachineType {
    /// Lightweight PC machine from qemu-lite.
    #[default]
    #[serde(rename = "pc-lite")]
    PcLite,
    /// Standard i440FX PC machine.
    #[serde(rename = "pc")]
    Pc,
    /// Q35 PCI Express machine.
    #[serde(rename = "q35")]
    Q35,
}

impl MachineType {
    /// Every supported machine type.
    pub const ALL: [MachineType; 3] = [MachineType::PcLite, MachineType::Pc, MachineType::Q35];

    /// Name as passed to `-machine`.
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineType::PcLite => "pc-lite",
            MachineType::Pc => "pc",
            MachineType::Q35 => "q35",
        }
    }

    /// Accelerator string for this machine.
    pub fn acceleration(&self) -> &'static str {
        match self {
            MachineType::PcLite | MachineType::Q35 => ACCEL_NVDIMM,
            MachineType::Pc => ACCEL_DEFAULT,
        }
    }

    /// Capabilities of this machine.
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::default();
        // Only pc can hotplug drives.
        if *self == MachineType::Pc {
            caps.set_block_device_hotplug_support();
        }
        caps
    }
}

impl FromStr for MachineType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MachineType::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::InvalidMachineType(s.to_string()))
    }
}

impl std::fmt::Display for MachineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Machine description handed to QEMU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Machine type.
    pub machine_type: MachineType,
    /// Accelerator options.
    pub acceleration: String,
}

impl Machine {
    /// Machine type name as configured.
    pub fn type_name(&self) -> &'static str {
        self.machine_type.as_str()
    }
}

impl From<MachineType> for Machine {
    fn from(machine_type: MachineType) -> Self {
        Self {
            machine_type,
            acceleration: machine_type.acceleration().to_string(),
        }
    }
}

/// Look up a machine by its exact, case-sensitive name.
pub fn get_machine(name: &str) -> Result<Machine> {
    let machine_type: MachineType = name.parse()?;
    Ok(machine_type.into())
}

/// Capabilities derived from a raw machine type string.
///
/// Unknown names have no capabilities.
pub fn capabilities_for(name: &str) -> Capabilities {
    name.parse::<MachineType>()
        .map(|m| m.capabilities())
        .unwrap_or_default()
}

const BLOCK_DEVICE_HOTPLUG: u32 = 1 << 0;

/// Hypervisor capability flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    flags: u32,
}

impl Capabilities {
    /// Whether drives can be attached to a running VM.
    pub fn is_block_device_hotplug_supported(&self) -> bool {
        self.flags & BLOCK_DEVICE_HOTPLUG != 0
    }

    /// Mark block device hotplug as supported.
    pub fn set_block_device_hotplug_support(&mut self) {
        self.flags |= BLOCK_DEVICE_HOTPLUG;
    }
}
