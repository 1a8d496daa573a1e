//! Host information sources.
//!
//! Sizing and nested-virtualization detection depend on the host. The
//! [`HostInfo`] trait lets callers substitute fixed values for `/proc`.

use crate::error::{Error, Result};
use crate::paths::{PROC_CPUINFO, PROC_MEMINFO};
use std::path::PathBuf;

/// Source of host facts needed to size and configure a VM.
pub trait HostInfo: Send {
    /// Total physical memory in KiB.
    fn total_memory_kb(&self) -> Result<u64>;

    /// Whether this host is itself a virtual machine.
    fn running_on_vmm(&self) -> Result<bool>;
}

/// Host information read from procfs.
#[derive(Debug, Clone)]
pub struct ProcHost {
    meminfo: PathBuf,
    cpuinfo: PathBuf,
}

impl Default for ProcHost {
    fn default() -> Self {
        Self::new(PROC_MEMINFO, PROC_CPUINFO)
    }
}

impl ProcHost {
    /// Read from custom meminfo/cpuinfo files.
    pub fn new(meminfo: impl Into<PathBuf>, cpuinfo: impl Into<PathBuf>) -> Self {
        Self {
            meminfo: meminfo.into(),
            cpuinfo: cpuinfo.into(),
        }
    }
}

impl HostInfo for ProcHost {
    fn total_memory_kb(&self) -> Result<u64> {
        let content = std::fs::read_to_string(&self.meminfo)?;
        parse_mem_total(&content)
    }

    fn running_on_vmm(&self) -> Result<bool> {
        let content = std::fs::read_to_string(&self.cpuinfo)?;
        Ok(has_cpu_flag(&content, "hypervisor"))
    }
}

/// Extract `MemTotal` (KiB) from meminfo content.
fn parse_mem_total(content: &str) -> Result<u64> {
    let line = content
        .lines()
        .find(|l| l.starts_with("MemTotal:"))
        .ok_or_else(|| Error::host_info("MemTotal not found in meminfo"))?;

    let mut fields = line.split_whitespace().skip(1);
    let value = fields
        .next()
        .ok_or_else(|| Error::host_info(format!("malformed meminfo line: {}", line)))?;

    if let Some(unit) = fields.next() {
        if unit != "kB" {
            return Err(Error::host_info(format!("unexpected meminfo unit: {}", unit)));
        }
    }

    value
        .parse()
        .map_err(|_| Error::host_info(format!("invalid MemTotal value: {}", value)))
}

/// Check the first `flags` line of cpuinfo for `flag`.
fn has_cpu_flag(content: &str, flag: &str) -> bool {
    content
        .lines()
        .find(|l| l.starts_with("flags"))
        .and_then(|l| l.split_once(':'))
        .map(|(_, flags)| flags.split_whitespace().any(|f| f == flag))
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;

    /// Host with fixed answers.
    pub(crate) struct FixedHost {
        pub mem_kb: u64,
        pub nested: bool,
    }

    impl HostInfo for FixedHost {
        fn total_memory_kb(&self) -> Result<u64> {
            Ok(self.mem_kb)
        }

        fn running_on_vmm(&self) -> Result<bool> {
            Ok(self.nested)
        }
    }

    /// Host whose meminfo is unreadable.
    pub(crate) struct BrokenHost;

    impl HostInfo for BrokenHost {
        fn total_memory_kb(&self) -> Result<u64> {
            Err(Error::host_info("MemTotal not found in meminfo"))
        }

        fn running_on_vmm(&self) -> Result<bool> {
            Ok(false)
        }
    }
}
