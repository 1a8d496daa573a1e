//! Static hypervisor configuration.
//!
//! A [`HypervisorConfig`] is embedded in every pod configuration. It can be
//! built in code or read from a TOML runtime configuration file.

use crate::error::{Error, Result};
use crate::paths::DEFAULT_HYPERVISOR_PATH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of vCPUs for a pod VM.
pub const DEFAULT_VCPUS: u32 = 1;

/// Default memory size in MiB for a pod VM.
pub const DEFAULT_MEMORY_MIB: u32 = 2048;

/// Default number of PCI bridges.
pub const DEFAULT_BRIDGES: u32 = 1;

/// A single kernel command line parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name.
    pub key: String,
    /// Parameter value; empty for flag-style parameters.
    #[serde(default)]
    pub value: String,
}

impl Param {
    /// Create a `key=value` parameter.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a flag-style parameter rendered as the bare key.
    pub fn flag(key: impl Into<String>) -> Self {
        Self::new(key, "")
    }
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.key.is_empty() {
            write!(f, "{}", self.value)
        } else if self.value.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}={}", self.key, self.value)
        }
    }
}

/// Hypervisor configuration for one pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypervisorConfig {
    /// Guest kernel image.
    pub kernel_path: PathBuf,

    /// Guest root filesystem image.
    pub image_path: PathBuf,

    /// Hypervisor binary (empty = [`DEFAULT_HYPERVISOR_PATH`]).
    #[serde(default)]
    pub hypervisor_path: PathBuf,

    /// QEMU machine type (empty = `pc-lite`).
    #[serde(default)]
    pub hypervisor_machine_type: String,

    /// Default number of vCPUs.
    #[serde(default)]
    pub default_vcpus: u32,

    /// Default memory in MiB.
    #[serde(default)]
    pub default_memory_mib: u32,

    /// Default number of PCI bridges.
    #[serde(default)]
    pub default_bridges: u32,

    /// Extra kernel parameters, appended after the built-in ones.
    #[serde(default)]
    pub kernel_params: Vec<Param>,

    /// Boot the guest with verbose kernel and systemd output.
    #[serde(default)]
    pub debug: bool,
}

impl HypervisorConfig {
    /// Create a configuration with the required asset paths and default sizing.
    pub fn new(kernel_path: impl Into<PathBuf>, image_path: impl Into<PathBuf>) -> Self {
        Self {
            kernel_path: kernel_path.into(),
            image_path: image_path.into(),
            default_vcpus: DEFAULT_VCPUS,
            default_memory_mib: DEFAULT_MEMORY_MIB,
            default_bridges: DEFAULT_BRIDGES,
            ..Default::default()
        }
    }

    /// Parse a configuration from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading hypervisor config");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check required fields and fill zero counts with defaults.
    pub fn validate(&mut self) -> Result<()> {
        if self.kernel_path.as_os_str().is_empty() {
            return Err(Error::config("missing kernel path"));
        }
        if self.image_path.as_os_str().is_empty() {
            return Err(Error::config("missing image path"));
        }
        if self.default_vcpus == 0 {
            self.default_vcpus = DEFAULT_VCPUS;
        }
        if self.default_memory_mib == 0 {
            self.default_memory_mib = DEFAULT_MEMORY_MIB;
        }
        if self.default_bridges == 0 {
            self.default_bridges = DEFAULT_BRIDGES;
        }
        Ok(())
    }

    /// Hypervisor binary to launch.
    pub fn hypervisor_path(&self) -> PathBuf {
        if self.hypervisor_path.as_os_str().is_empty() {
            PathBuf::from(DEFAULT_HYPERVISOR_PATH)
        } else {
            self.hypervisor_path.clone()
        }
    }

    /// Add a user kernel parameter.
    pub fn kernel_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.kernel_params.push(Param::new(key, value));
        self
    }

    /// Set the machine type.
    pub fn machine_type(mut self, machine_type: impl Into<String>) -> Self {
        self.hypervisor_machine_type = machine_type.into();
        self
    }

    /// Enable or disable debug boot output.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }
}
