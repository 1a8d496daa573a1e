//! Device descriptors.
//!
//! [`DeviceInfo`] is what callers ask for; [`QemuDevice`] is what ends up in
//! the VM's device list, with the drivers, backends and IDs QEMU expects.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix for 9p filesystem share device IDs.
pub const FS_DEVICE_ID_PREFIX: &str = "extra-9p-";

/// Prefix for vhost-user character device IDs.
pub const VHOST_CHAR_ID_PREFIX: &str = "char-";

/// Prefix for vhost-user network device IDs.
pub const VHOST_NET_ID_PREFIX: &str = "net-";

/// Virtio serial controller ID.
pub const SERIAL_CONTROLLER_ID: &str = "serial0";

/// Console device ID.
pub const CONSOLE_DEVICE_ID: &str = "console0";

/// Console character device ID.
pub const CONSOLE_CHARDEV_ID: &str = "charconsole0";

/// NVDIMM device ID for the guest image.
pub const IMAGE_NVDIMM_ID: &str = "nv0";

/// Memory backend ID for the guest image.
pub const IMAGE_MEMORY_ID: &str = "mem0";

// =============================================================================
// Requested devices
// =============================================================================

/// Host directory shared with the guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// 9p mount tag seen by the guest.
    pub mount_tag: String,
    /// Directory on the host.
    pub host_path: PathBuf,
}

impl Volume {
    /// Create a volume.
    pub fn new(mount_tag: impl Into<String>, host_path: impl Into<PathBuf>) -> Self {
        Self {
            mount_tag: mount_tag.into(),
            host_path: host_path.into(),
        }
    }
}

/// Host socket exposed as a virtio serial port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Socket {
    /// Guest-visible device ID.
    pub device_id: String,
    /// Character device ID.
    pub id: String,
    /// Socket path on the host.
    pub host_path: PathBuf,
    /// Port name seen by the guest.
    pub name: String,
}

/// Disk image attached as a block device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drive {
    /// Backing file.
    pub file: PathBuf,
    /// Image format, passed through untouched.
    pub format: String,
    /// Drive ID.
    pub id: String,
}

/// Host PCI device passed through with VFIO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VfioDevice {
    /// Bus/device/function address, e.g. `02:10.1`.
    pub bdf: String,
}

/// Network interface backed by a vhost-user socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VhostUserNetDevice {
    /// Device identifier.
    pub id: String,
    /// vhost-user socket path.
    pub socket_path: PathBuf,
    /// Guest MAC address.
    pub mac_address: String,
}

/// A device a caller wants attached to the VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceInfo {
    /// 9p filesystem share.
    Volume(Volume),
    /// Virtio serial port.
    Socket(Socket),
    /// Block device.
    Drive(Drive),
    /// VFIO passthrough.
    Vfio(VfioDevice),
    /// vhost-user network interface.
    VhostUserNet(VhostUserNetDevice),
}

impl DeviceInfo {
    /// Short kind name for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceInfo::Volume(_) => "volume",
            DeviceInfo::Socket(_) => "serial port",
            DeviceInfo::Drive(_) => "block device",
            DeviceInfo::Vfio(_) => "vfio device",
            DeviceInfo::VhostUserNet(_) => "vhost-user net device",
        }
    }
}

// =============================================================================
// QEMU device model
// =============================================================================

/// Filesystem device driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FsDriver {
    /// `virtio-9p-pci`.
    #[serde(rename = "virtio-9p-pci")]
    Virtio9P,
}

/// Filesystem backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FsBackend {
    /// Host directory.
    Local,
}

/// 9p security model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityModel {
    /// No permission mapping.
    None,
}

/// Character device driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharDriver {
    /// `virtserialport`.
    #[serde(rename = "virtserialport")]
    VirtioSerialPort,
    /// `virtconsole`.
    #[serde(rename = "virtconsole")]
    Console,
}

/// Character device backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharBackend {
    /// Unix socket.
    Socket,
}

/// Serial controller driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SerialDriver {
    /// `virtio-serial-pci`.
    #[serde(rename = "virtio-serial-pci")]
    VirtioSerial,
}

/// Block device driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockDriver {
    /// `virtio-blk`.
    #[serde(rename = "virtio-blk")]
    VirtioBlock,
}

/// Block device asynchronous I/O mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aio {
    /// Thread pool.
    Threads,
}

/// vhost-user device flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VhostUserType {
    /// Network interface (`virtio-net-pci`).
    #[serde(rename = "virtio-net-pci")]
    Net,
}

/// Object driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectDriver {
    /// NVDIMM device.
    Nvdimm,
}

/// Object backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectType {
    /// `memory-backend-file`.
    #[serde(rename = "memory-backend-file")]
    MemoryBackendFile,
}

/// A device in the VM's device list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QemuDevice {
    /// 9p filesystem share.
    Fs {
        /// Driver.
        driver: FsDriver,
        /// Backend.
        fs_driver: FsBackend,
        /// Device ID.
        id: String,
        /// Host directory.
        path: PathBuf,
        /// Mount tag.
        mount_tag: String,
        /// Security model.
        security_model: SecurityModel,
        /// Disable virtio 1.0 negotiation (nested virtualization).
        disable_modern: bool,
    },

    /// Character device.
    Char {
        /// Driver.
        driver: CharDriver,
        /// Backend.
        backend: CharBackend,
        /// Device ID.
        device_id: String,
        /// Character device ID.
        id: String,
        /// Socket path.
        path: PathBuf,
        /// Port name, empty for consoles.
        name: String,
    },

    /// Serial controller.
    Serial {
        /// Driver.
        driver: SerialDriver,
        /// Controller ID.
        id: String,
        /// Disable virtio 1.0 negotiation (nested virtualization).
        disable_modern: bool,
    },

    /// Block device.
    Block {
        /// Driver.
        driver: BlockDriver,
        /// Drive ID.
        id: String,
        /// Backing file.
        file: PathBuf,
        /// AIO mode.
        aio: Aio,
        /// Image format.
        format: String,
        /// Drive interface.
        interface: String,
        /// Disable virtio 1.0 negotiation (nested virtualization).
        disable_modern: bool,
    },

    /// VFIO passthrough.
    Vfio {
        /// Host PCI address.
        bdf: String,
    },

    /// vhost-user device.
    VhostUser {
        /// vhost-user socket.
        socket_path: PathBuf,
        /// Character device ID.
        char_dev_id: String,
        /// Network device ID.
        type_dev_id: String,
        /// MAC address.
        address: String,
        /// Flavour.
        vhost_user_type: VhostUserType,
    },

    /// Memory backed object.
    Object {
        /// Driver.
        driver: ObjectDriver,
        /// Backend type.
        object_type: ObjectType,
        /// Device ID.
        device_id: String,
        /// Object ID.
        id: String,
        /// Backing file.
        mem_path: PathBuf,
        /// Size in bytes.
        size: u64,
    },
}

impl QemuDevice {
    /// The device's own identifier, if it has one.
    pub fn id(&self) -> Option<&str> {
        match self {
            QemuDevice::Fs { id, .. }
            | QemuDevice::Serial { id, .. }
            | QemuDevice::Block { id, .. } => Some(id.as_str()),
            QemuDevice::Char { device_id, .. } | QemuDevice::Object { device_id, .. } => {
                Some(device_id.as_str())
            }
            QemuDevice::VhostUser { type_dev_id, .. } => Some(type_dev_id.as_str()),
            QemuDevice::Vfio { .. } => None,
        }
    }
}
