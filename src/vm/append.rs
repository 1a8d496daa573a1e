//! Turning requested devices into QEMU devices.
//!
//! Every appender pushes onto the end of the list and never touches existing
//! entries. Virtio devices get `disable_modern` when running nested.

use super::qemu::Qemu;
use crate::device::{
    Aio, BlockDriver, CharBackend, CharDriver, DeviceInfo, Drive, FsBackend, FsDriver,
    ObjectDriver, ObjectType, QemuDevice, SecurityModel, SerialDriver, Socket, VfioDevice,
    VhostUserNetDevice, VhostUserType, Volume, CONSOLE_CHARDEV_ID, CONSOLE_DEVICE_ID,
    FS_DEVICE_ID_PREFIX, IMAGE_MEMORY_ID, IMAGE_NVDIMM_ID, SERIAL_CONTROLLER_ID,
    VHOST_CHAR_ID_PREFIX, VHOST_NET_ID_PREFIX,
};
use crate::error::{Error, Result};
use crate::pod::PodConfig;

impl Qemu {
    /// Attach a device to the VM configuration.
    pub fn add_device(&mut self, info: DeviceInfo) -> Result<()> {
        tracing::debug!(kind = info.kind(), "adding device");

        let mut devices = std::mem::take(&mut self.qemu_config.devices);
        match &info {
            DeviceInfo::Volume(volume) => self.append_volume(&mut devices, volume),
            DeviceInfo::Socket(socket) => self.append_socket(&mut devices, socket),
            DeviceInfo::Drive(drive) => self.append_block_device(&mut devices, drive),
            DeviceInfo::Vfio(vfio) => self.append_vfio_device(&mut devices, vfio),
            DeviceInfo::VhostUserNet(net) => self.append_vhost_user_device(&mut devices, net),
        }
        self.qemu_config.devices = devices;
        Ok(())
    }

    pub(super) fn append_volume(&self, devices: &mut Vec<QemuDevice>, volume: &Volume) {
        devices.push(QemuDevice::Fs {
            driver: FsDriver::Virtio9P,
            fs_driver: FsBackend::Local,
            id: format!("{}{}", FS_DEVICE_ID_PREFIX, volume.mount_tag),
            path: volume.host_path.clone(),
            mount_tag: volume.mount_tag.clone(),
            security_model: SecurityModel::None,
            disable_modern: self.nested_run,
        });
    }

    pub(super) fn append_socket(&self, devices: &mut Vec<QemuDevice>, socket: &Socket) {
        devices.push(QemuDevice::Char {
            driver: CharDriver::VirtioSerialPort,
            backend: CharBackend::Socket,
            device_id: socket.device_id.clone(),
            id: socket.id.clone(),
            path: socket.host_path.clone(),
            name: socket.name.clone(),
        });
    }

    pub(super) fn append_block_device(&self, devices: &mut Vec<QemuDevice>, drive: &Drive) {
        devices.push(QemuDevice::Block {
            driver: BlockDriver::VirtioBlock,
            id: drive.id.clone(),
            file: drive.file.clone(),
            aio: Aio::Threads,
            format: drive.format.clone(),
            interface: "none".to_string(),
            disable_modern: self.nested_run,
        });
    }

    pub(super) fn append_vfio_device(&self, devices: &mut Vec<QemuDevice>, vfio: &VfioDevice) {
        devices.push(QemuDevice::Vfio {
            bdf: vfio.bdf.clone(),
        });
    }

    pub(super) fn append_vhost_user_device(
        &self,
        devices: &mut Vec<QemuDevice>,
        net: &VhostUserNetDevice,
    ) {
        devices.push(QemuDevice::VhostUser {
            socket_path: net.socket_path.clone(),
            char_dev_id: format!("{}{}", VHOST_CHAR_ID_PREFIX, net.id),
            type_dev_id: format!("{}{}", VHOST_NET_ID_PREFIX, net.id),
            address: net.mac_address.clone(),
            vhost_user_type: VhostUserType::Net,
        });
    }

    /// One share per pod volume; container rootfs are not shared here.
    pub(super) fn append_fs_devices(&self, devices: &mut Vec<QemuDevice>, pod: &PodConfig) {
        for volume in &pod.volumes {
            self.append_volume(devices, volume);
        }
    }

    /// Serial controller plus the pod console.
    pub(super) fn append_consoles(&self, devices: &mut Vec<QemuDevice>, pod_id: &str) {
        devices.push(QemuDevice::Serial {
            driver: SerialDriver::VirtioSerial,
            id: SERIAL_CONTROLLER_ID.to_string(),
            disable_modern: self.nested_run,
        });
        devices.push(QemuDevice::Char {
            driver: CharDriver::Console,
            backend: CharBackend::Socket,
            device_id: CONSOLE_DEVICE_ID.to_string(),
            id: CONSOLE_CHARDEV_ID.to_string(),
            path: self.pod_console(pod_id),
            name: String::new(),
        });
    }

    /// Guest image as an NVDIMM sized to the image file.
    pub(super) fn append_image(&self, devices: &mut Vec<QemuDevice>) -> Result<()> {
        let image = &self.config.image_path;
        let metadata = std::fs::File::open(image)
            .and_then(|f| f.metadata())
            .map_err(|source| Error::Image {
                path: image.clone(),
                source,
            })?;

        devices.push(QemuDevice::Object {
            driver: ObjectDriver::Nvdimm,
            object_type: ObjectType::MemoryBackendFile,
            device_id: IMAGE_NVDIMM_ID.to_string(),
            id: IMAGE_MEMORY_ID.to_string(),
            mem_path: image.clone(),
            size: metadata.len(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HypervisorConfig;
    use crate::host::fake::FixedHost;
    use crate::paths;
    use crate::pod::ContainerConfig;
    use crate::storage::Filesystem;
    use std::path::{Path, PathBuf};

    fn driver(nested: bool) -> Qemu {
        let mut q = Qemu::new(
            Filesystem::default(),
            FixedHost {
                mem_kb: 0,
                nested,
            },
        );
        q.nested_run = nested;
        q
    }

    #[test]
    fn test_append_volume() {
        for nested in [true, false] {
            let mut devices = Vec::new();
            let volume = Volume::new("testMountTag", "testHostPath");
            driver(nested).append_volume(&mut devices, &volume);

            assert_eq!(
                devices,
                vec![QemuDevice::Fs {
                    driver: FsDriver::Virtio9P,
                    fs_driver: FsBackend::Local,
                    id: "extra-9p-testMountTag".to_string(),
                    path: PathBuf::from("testHostPath"),
                    mount_tag: "testMountTag".to_string(),
                    security_model: SecurityModel::None,
                    disable_modern: nested,
                }]
            );
        }
    }

    #[test]
    fn test_append_socket() {
        let socket = Socket {
            device_id: "channelTest".to_string(),
            id: "charchTest".to_string(),
            host_path: "/tmp/hyper_test.sock".into(),
            name: "sh.hyper.channel.test".to_string(),
        };
        let mut devices = Vec::new();
        driver(true).append_socket(&mut devices, &socket);

        assert_eq!(
            devices,
            vec![QemuDevice::Char {
                driver: CharDriver::VirtioSerialPort,
                backend: CharBackend::Socket,
                device_id: "channelTest".to_string(),
                id: "charchTest".to_string(),
                path: PathBuf::from("/tmp/hyper_test.sock"),
                name: "sh.hyper.channel.test".to_string(),
            }]
        );
    }

    #[test]
    fn test_append_block_device() {
        let drive = Drive {
            file: "/root".into(),
            format: "raw".to_string(),
            id: "blockDevTest".to_string(),
        };
        let mut devices = Vec::new();
        driver(true).append_block_device(&mut devices, &drive);

        assert_eq!(
            devices,
            vec![QemuDevice::Block {
                driver: BlockDriver::VirtioBlock,
                id: "blockDevTest".to_string(),
                file: PathBuf::from("/root"),
                aio: Aio::Threads,
                format: "raw".to_string(),
                interface: "none".to_string(),
                disable_modern: true,
            }]
        );
    }

    #[test]
    fn test_append_vfio_device() {
        let mut devices = Vec::new();
        driver(true).append_vfio_device(
            &mut devices,
            &VfioDevice {
                bdf: "02:10.1".to_string(),
            },
        );
        assert_eq!(
            devices,
            vec![QemuDevice::Vfio {
                bdf: "02:10.1".to_string()
            }]
        );
    }

    #[test]
    fn test_append_vhost_user_device() {
        let net = VhostUserNetDevice {
            id: "deadbeef".to_string(),
            socket_path: "nonexistentpath.sock".into(),
            mac_address: "00:11:22:33:44:55:66".to_string(),
        };
        let mut devices = Vec::new();
        driver(true).append_vhost_user_device(&mut devices, &net);

        assert_eq!(
            devices,
            vec![QemuDevice::VhostUser {
                socket_path: PathBuf::from("nonexistentpath.sock"),
                char_dev_id: "char-deadbeef".to_string(),
                type_dev_id: "net-deadbeef".to_string(),
                address: "00:11:22:33:44:55:66".to_string(),
                vhost_user_type: VhostUserType::Net,
            }]
        );
    }

    #[test]
    fn test_append_fs_devices_one_per_volume() {
        let mut pod = PodConfig::new("testPodID", HypervisorConfig::default());
        pod.volumes = vec![
            Volume::new("testVolMountTag.1", "testVolHostPath.1"),
            Volume::new("testVolMountTag.2", "testVolHostPath.2"),
        ];
        pod.containers = vec![
            ContainerConfig::new("testContID.1", "testContRootFs.1"),
            ContainerConfig::new("testContID.2", "testContRootFs.2"),
            ContainerConfig::new("testContID.3", "testContRootFs.3"),
        ];

        let q = driver(true);
        let mut devices = Vec::new();
        q.append_fs_devices(&mut devices, &pod);

        let mut expected = Vec::new();
        for volume in &pod.volumes {
            q.append_volume(&mut expected, volume);
        }
        assert_eq!(devices.len(), 2);
        assert_eq!(devices, expected);
        assert_eq!(devices[0].id(), Some("extra-9p-testVolMountTag.1"));
        assert_eq!(devices[1].id(), Some("extra-9p-testVolMountTag.2"));
    }

    #[test]
    fn test_append_consoles() {
        let q = driver(true);
        let mut devices = Vec::new();
        q.append_consoles(&mut devices, "testPodID");

        assert_eq!(
            devices,
            vec![
                QemuDevice::Serial {
                    driver: SerialDriver::VirtioSerial,
                    id: "serial0".to_string(),
                    disable_modern: true,
                },
                QemuDevice::Char {
                    driver: CharDriver::Console,
                    backend: CharBackend::Socket,
                    device_id: "console0".to_string(),
                    id: "charconsole0".to_string(),
                    path: Path::new(paths::RUN_STORAGE_PATH)
                        .join("testPodID")
                        .join(paths::DEFAULT_CONSOLE),
                    name: String::new(),
                },
            ]
        );
    }

    #[test]
    fn test_append_image() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("container.img");
        std::fs::write(&image, vec![0u8; 12345]).unwrap();

        let mut q = driver(false);
        q.config = HypervisorConfig::new("/k", &image);

        let mut devices = Vec::new();
        q.append_image(&mut devices).unwrap();

        assert_eq!(
            devices,
            vec![QemuDevice::Object {
                driver: ObjectDriver::Nvdimm,
                object_type: ObjectType::MemoryBackendFile,
                device_id: "nv0".to_string(),
                id: "mem0".to_string(),
                mem_path: image.clone(),
                size: 12345,
            }]
        );
    }

    #[test]
    fn test_append_image_missing_file_leaves_list() {
        let mut q = driver(false);
        q.config = HypervisorConfig::new("/k", "/nonexistent/container.img");

        let mut devices = Vec::new();
        q.append_volume(&mut devices, &Volume::new("tag", "/srv"));
        let before = devices.clone();

        let err = q.append_image(&mut devices).unwrap_err();
        assert!(matches!(err, Error::Image { .. }));
        assert_eq!(devices, before);
    }

    #[test]
    fn test_add_device() {
        let mut q = driver(true);
        let volume = Volume::new("testMountTag", "testHostPath");
        q.add_device(DeviceInfo::Volume(volume)).unwrap();
        q.add_device(DeviceInfo::Socket(Socket {
            device_id: "channelTest".to_string(),
            id: "charchTest".to_string(),
            host_path: "/tmp/hyper_test.sock".into(),
            name: "sh.hyper.channel.test".to_string(),
        }))
        .unwrap();
        q.add_device(DeviceInfo::Vfio(VfioDevice {
            bdf: "02:10.1".to_string(),
        }))
        .unwrap();

        let devices = &q.qemu_config().devices;
        assert_eq!(devices.len(), 3);
        assert!(matches!(
            &devices[0],
            QemuDevice::Fs { id, disable_modern: true, .. } if id == "extra-9p-testMountTag"
        ));
        assert!(matches!(
            &devices[1],
            QemuDevice::Char { driver: CharDriver::VirtioSerialPort, .. }
        ));
        assert!(matches!(&devices[2], QemuDevice::Vfio { .. }));
    }

    #[test]
    fn test_add_device_appends_after_existing() {
        let mut q = driver(false);
        let mut existing = Vec::new();
        q.append_consoles(&mut existing, "pod");
        q.qemu_config.devices = existing;

        q.add_device(DeviceInfo::Drive(Drive {
            file: "/dev/loop0".into(),
            format: "raw".to_string(),
            id: "drive-1".to_string(),
        }))
        .unwrap();
        q.add_device(DeviceInfo::VhostUserNet(VhostUserNetDevice {
            id: "eth0".to_string(),
            socket_path: "/tmp/vhost.sock".into(),
            mac_address: "02:42:ac:11:00:02".to_string(),
        }))
        .unwrap();

        let ids: Vec<_> = q
            .qemu_config()
            .devices
            .iter()
            .filter_map(QemuDevice::id)
            .collect();
        assert_eq!(ids, vec!["serial0", "console0", "drive-1", "net-eth0"]);
    }
}
