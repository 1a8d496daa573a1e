//! QEMU driver for one pod VM.

use super::config::QemuConfig;
use crate::config::HypervisorConfig;
use crate::error::{Error, Result};
use crate::host::{HostInfo, ProcHost};
use crate::kernel;
use crate::machine::{get_machine, Capabilities, MachineType};
use crate::paths;
use crate::pod::PodConfig;
use crate::resources::{cpu_topology, memory_sizing, Resources};
use crate::storage::{Filesystem, PersistedState, Storage};
use std::path::{Path, PathBuf};

/// Configuration state for one pod's QEMU VM.
///
/// Owned by the workflow managing the pod; nothing here is synchronized, so
/// all mutation goes through `&mut self`.
pub struct Qemu {
    pub(super) config: HypervisorConfig,
    pub(super) path: PathBuf,
    pub(super) kernel_params: Vec<String>,
    pub(super) qemu_config: QemuConfig,
    pub(super) nested_run: bool,
    storage: Box<dyn Storage>,
    host: Box<dyn HostInfo>,
}

impl Default for Qemu {
    fn default() -> Self {
        Self::new(Filesystem::default(), ProcHost::default())
    }
}

impl std::fmt::Debug for Qemu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Qemu")
            .field("config", &self.config)
            .field("path", &self.path)
            .field("kernel_params", &self.kernel_params)
            .field("qemu_config", &self.qemu_config)
            .field("nested_run", &self.nested_run)
            .field("run_root", &self.storage.run_root())
            .finish_non_exhaustive()
    }
}

impl Qemu {
    /// Create an uninitialized driver.
    pub fn new(storage: impl Storage + 'static, host: impl HostInfo + 'static) -> Self {
        Self {
            config: HypervisorConfig::default(),
            path: PathBuf::new(),
            kernel_params: Vec::new(),
            qemu_config: QemuConfig::default(),
            nested_run: false,
            storage: Box::new(storage),
            host: Box::new(host),
        }
    }

    /// Load the pod's persisted configuration, or build and persist a new one.
    ///
    /// The pod's storage directory must already exist. On error the driver is
    /// left as it was.
    pub fn init(&mut self, pod: &PodConfig) -> Result<()> {
        let mut config = pod.effective_hypervisor_config()?;
        config.validate()?;

        let nested_run = self.host.running_on_vmm()?;

        let state = match self.storage.fetch_hypervisor_state(&pod.id)? {
            Some(state) => {
                tracing::info!(pod_id = %pod.id, "restored hypervisor state");
                state
            }
            None => {
                let path = config.hypervisor_path();
                let kernel_params = kernel::build_kernel_params(&config)?;
                let state = PersistedState::new(config, path, kernel_params);
                self.storage.store_hypervisor_state(&pod.id, &state)?;
                tracing::info!(pod_id = %pod.id, "created hypervisor state");
                state
            }
        };

        tracing::debug!(
            pod_id = %pod.id,
            hypervisor = %state.hypervisor_path.display(),
            nested_run,
            "qemu driver initialized"
        );

        self.config = state.config;
        self.path = state.hypervisor_path;
        self.kernel_params = state.kernel_params;
        self.nested_run = nested_run;
        Ok(())
    }

    /// Assemble the VM configuration for `pod`: machine, sizing, kernel,
    /// filesystem shares, consoles and the guest image.
    ///
    /// Requires a prior [`Qemu::init`]. On error the previous VM
    /// configuration is kept.
    pub fn create_pod(&mut self, pod: &PodConfig) -> Result<()> {
        if self.kernel_params.is_empty() {
            return Err(Error::config("qemu driver used before init"));
        }

        let machine_type = if self.config.hypervisor_machine_type.is_empty() {
            MachineType::default().as_str()
        } else {
            self.config.hypervisor_machine_type.as_str()
        };
        let machine = get_machine(machine_type)?;

        let resources = self.resources_for(pod);
        let smp = cpu_topology(&resources);
        let memory = memory_sizing(&resources, self.host.as_ref())?;

        let mut devices = Vec::new();
        self.append_fs_devices(&mut devices, pod);
        self.append_consoles(&mut devices, &pod.id);
        self.append_image(&mut devices)?;

        tracing::info!(
            pod_id = %pod.id,
            machine = %machine.type_name(),
            vcpus = smp.cpus,
            memory = %memory.size,
            devices = devices.len(),
            "built qemu configuration"
        );

        self.qemu_config = QemuConfig::builder(format!("pod-{}", pod.id))
            .machine(machine)
            .smp(smp)
            .memory(memory)
            .kernel(&self.config.kernel_path, self.kernel_cmdline())
            .qmp_socket(paths::qmp_socket_path(self.storage.run_root(), &pod.id))
            .devices(devices)
            .build();
        Ok(())
    }

    /// Requested resources, with zero fields taken from the hypervisor defaults.
    fn resources_for(&self, pod: &PodConfig) -> Resources {
        let mut resources = pod.vm_config.clone();
        if resources.vcpus == 0 {
            resources.vcpus = self.config.default_vcpus;
        }
        if resources.memory_mib == 0 {
            resources.memory_mib = self.config.default_memory_mib;
        }
        resources
    }

    /// Console socket of `pod_id`.
    pub fn pod_console(&self, pod_id: &str) -> PathBuf {
        paths::console_path(self.storage.run_root(), pod_id)
    }

    /// Capabilities of the configured machine; none before a machine is set.
    pub fn capabilities(&self) -> Capabilities {
        self.qemu_config
            .machine
            .as_ref()
            .map(|m| m.machine_type.capabilities())
            .unwrap_or_default()
    }

    /// Whether drives can be hotplugged into this VM.
    pub fn hotplug_block_device_supported(&self) -> bool {
        self.capabilities().is_block_device_hotplug_supported()
    }

    /// Fail unless drives can be hotplugged into this VM.
    pub fn ensure_block_hotplug(&self) -> Result<()> {
        if self.hotplug_block_device_supported() {
            return Ok(());
        }
        Err(Error::HotplugUnsupported {
            device: "block device".to_string(),
            machine_type: self
                .qemu_config
                .machine
                .as_ref()
                .map(|m| m.type_name().to_string())
                .unwrap_or_default(),
        })
    }

    /// Hypervisor configuration in effect.
    pub fn config(&self) -> &HypervisorConfig {
        &self.config
    }

    /// Hypervisor binary.
    pub fn hypervisor_path(&self) -> &Path {
        &self.path
    }

    /// Kernel command line tokens.
    pub fn kernel_params(&self) -> &[String] {
        &self.kernel_params
    }

    /// Kernel command line as passed to `-append`.
    pub fn kernel_cmdline(&self) -> String {
        kernel::join(&self.kernel_params)
    }

    /// Assembled VM configuration.
    pub fn qemu_config(&self) -> &QemuConfig {
        &self.qemu_config
    }

    /// Whether the host is itself a VM.
    pub fn nested_run(&self) -> bool {
        self.nested_run
    }
}
