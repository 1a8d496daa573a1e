//! CPU topology and memory sizing.

use crate::error::Result;
use crate::host::HostInfo;
use serde::{Deserialize, Serialize};

/// Memory hotplug slots reserved at boot.
pub const DEFAULT_MEM_SLOTS: u8 = 2;

/// Extra MiB added to host memory for the max-memory bound.
pub const MAX_MEMORY_OFFSET_MIB: u64 = 1024;

/// Resources requested for a pod VM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// Number of vCPUs.
    pub vcpus: u32,
    /// Memory in MiB.
    pub memory_mib: u32,
}

impl Resources {
    /// Create a resource request.
    pub fn new(vcpus: u32, memory_mib: u32) -> Self {
        Self { vcpus, memory_mib }
    }
}

/// CPU topology (`-smp`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Smp {
    /// Total vCPUs.
    pub cpus: u32,
    /// Cores per socket.
    pub cores: u32,
    /// Sockets.
    pub sockets: u32,
    /// Threads per core.
    pub threads: u32,
}

/// Memory layout (`-m`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    /// Boot memory, e.g. `"2048M"`.
    pub size: String,
    /// Hotplug slots.
    pub slots: u8,
    /// Upper bound for hotplugged memory.
    pub max_mem: String,
}

/// Flat topology: every vCPU is a core on a single socket.
pub fn cpu_topology(resources: &Resources) -> Smp {
    Smp {
        cpus: resources.vcpus,
        cores: resources.vcpus,
        sockets: 1,
        threads: 1,
    }
}

/// Size boot memory and reserve address space for memory hotplug.
pub fn memory_sizing(resources: &Resources, host: &dyn HostInfo) -> Result<Memory> {
    let host_mem_mib = host.total_memory_kb()? / 1024;
    let max_mem = host_mem_mib + MAX_MEMORY_OFFSET_MIB;

    Ok(Memory {
        size: format!("{}M", resources.memory_mib),
        slots: DEFAULT_MEM_SLOTS,
        max_mem: format!("{}M", max_mem),
    })
}
