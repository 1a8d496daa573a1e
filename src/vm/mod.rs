//! Pod VM configuration lifecycle.
//!
//! - [`Qemu`]: the driver owning one pod VM's configuration
//! - [`QemuConfig`]: the assembled machine, sizing, kernel and device list

mod append;
pub mod config;
mod qemu;

pub use config::{Kernel, Knobs, QemuConfig, QemuConfigBuilder};
pub use qemu::Qemu;
