//! Assembled QEMU configuration for a pod VM.

use crate::device::QemuDevice;
use crate::machine::Machine;
use crate::resources::{Memory, Smp};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CPU model exposed to the guest.
pub const DEFAULT_CPU_MODEL: &str = "host";

/// Guest kernel and its command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kernel {
    /// Kernel image.
    pub path: PathBuf,
    /// Space-joined command line.
    pub params: String,
}

/// QEMU behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Knobs {
    /// `-no-user-config`.
    pub no_user_config: bool,
    /// `-nodefaults`.
    pub no_defaults: bool,
    /// `-nographic`.
    pub no_graphic: bool,
    /// `-daemonize`.
    pub daemonize: bool,
}

impl Knobs {
    /// Switches used for every pod VM.
    pub fn pod() -> Self {
        Self {
            no_user_config: true,
            no_defaults: true,
            no_graphic: true,
            daemonize: true,
        }
    }
}

/// Everything needed to launch one pod VM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QemuConfig {
    /// VM name.
    pub name: String,

    /// Machine type and accelerator, once selected.
    pub machine: Option<Machine>,

    /// CPU topology.
    pub smp: Option<Smp>,

    /// Memory layout.
    pub memory: Option<Memory>,

    /// CPU model.
    pub cpu_model: String,

    /// Guest kernel.
    pub kernel: Kernel,

    /// QMP control socket.
    pub qmp_socket: Option<PathBuf>,

    /// Behaviour switches.
    pub knobs: Knobs,

    /// Devices, in the order they were appended.
    pub devices: Vec<QemuDevice>,
}

impl QemuConfig {
    /// Create a builder for QemuConfig.
    pub fn builder(name: impl Into<String>) -> QemuConfigBuilder {
        QemuConfigBuilder::new(name)
    }
}

/// Builder for QemuConfig.
#[derive(Debug)]
pub struct QemuConfigBuilder {
    config: QemuConfig,
}

impl QemuConfigBuilder {
    /// Create a new builder with the given VM name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: QemuConfig {
                name: name.into(),
                cpu_model: DEFAULT_CPU_MODEL.to_string(),
                knobs: Knobs::pod(),
                ..Default::default()
            },
        }
    }

    /// Set the machine.
    pub fn machine(mut self, machine: Machine) -> Self {
        self.config.machine = Some(machine);
        self
    }

    /// Set the CPU topology.
    pub fn smp(mut self, smp: Smp) -> Self {
        self.config.smp = Some(smp);
        self
    }

    /// Set the memory layout.
    pub fn memory(mut self, memory: Memory) -> Self {
        self.config.memory = Some(memory);
        self
    }

    /// Set the guest kernel.
    pub fn kernel(mut self, path: impl Into<PathBuf>, params: impl Into<String>) -> Self {
        self.config.kernel = Kernel {
            path: path.into(),
            params: params.into(),
        };
        self
    }

    /// Set the QMP control socket.
    pub fn qmp_socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.qmp_socket = Some(path.into());
        self
    }

    /// Set the device list.
    pub fn devices(mut self, devices: Vec<QemuDevice>) -> Self {
        self.config.devices = devices;
        self
    }

    /// Build the QemuConfig.
    pub fn build(self) -> QemuConfig {
        self.config
    }
}
