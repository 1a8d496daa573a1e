//! podvm - QEMU hypervisor driver for VM-based container pods.
//!
//! Turns a pod description into a QEMU machine, kernel command line and
//! device list, and persists enough of it that a later process can reattach
//! to the running VM.
//!
//! ```no_run
//! use podvm::{HypervisorConfig, PodConfig, Qemu};
//!
//! # fn main() -> podvm::Result<()> {
//! let config = HypervisorConfig::new("/usr/share/vm/vmlinux", "/usr/share/vm/rootfs.img");
//! let pod = PodConfig::new("my-pod", config);
//!
//! let mut qemu = Qemu::default();
//! qemu.init(&pod)?;
//! qemu.create_pod(&pod)?;
//! println!("{}", qemu.kernel_cmdline());
//! # Ok(())
//! # }
//! ```

pub mod annotations;
pub mod config;
pub mod device;
pub mod error;
pub mod host;
pub mod kernel;
pub mod logging;
pub mod machine;
pub mod paths;
pub mod pod;
pub mod resources;
pub mod storage;
pub mod vm;

pub use config::{HypervisorConfig, Param};
pub use device::{DeviceInfo, QemuDevice};
pub use error::{Error, Result};
pub use host::{HostInfo, ProcHost};
pub use machine::{get_machine, Capabilities, Machine, MachineType};
pub use pod::{ContainerConfig, PodConfig};
pub use resources::Resources;
pub use storage::{Filesystem, PersistedState, Storage};
pub use vm::{Qemu, QemuConfig};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
