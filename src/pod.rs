//! Pod and container descriptors consumed by the driver.

use crate::annotations;
use crate::config::HypervisorConfig;
use crate::device::Volume;
use crate::error::{Error, Result};
use crate::resources::Resources;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A container running inside the pod VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Container ID.
    pub id: String,
    /// Host path of the container root filesystem.
    pub rootfs: PathBuf,
}

impl ContainerConfig {
    /// Create a container descriptor.
    pub fn new(id: impl Into<String>, rootfs: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            rootfs: rootfs.into(),
        }
    }
}

/// Everything the driver reads about a pod.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodConfig {
    /// Pod ID; names the pod's storage directory.
    pub id: String,

    /// Hypervisor settings for the pod VM.
    pub hypervisor_config: HypervisorConfig,

    /// Resources requested for the VM.
    #[serde(default)]
    pub vm_config: Resources,

    /// Host directories shared with the guest.
    #[serde(default)]
    pub volumes: Vec<Volume>,

    /// Containers in the pod.
    #[serde(default)]
    pub containers: Vec<ContainerConfig>,

    /// Pod annotations.
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

impl PodConfig {
    /// Create a pod with the given ID and hypervisor settings.
    pub fn new(id: impl Into<String>, hypervisor_config: HypervisorConfig) -> Self {
        Self {
            id: id.into(),
            hypervisor_config,
            ..Default::default()
        }
    }

    /// Hypervisor config with annotation overrides applied.
    ///
    /// Assets carrying a hash annotation are hashed and must match.
    pub fn effective_hypervisor_config(&self) -> Result<HypervisorConfig> {
        let mut config = self.hypervisor_config.clone();

        if let Some(hash_type) = self.annotations.get(annotations::ASSET_HASH_TYPE) {
            if hash_type != annotations::SHA512 {
                return Err(Error::config(format!(
                    "unsupported asset hash type: {}",
                    hash_type
                )));
            }
        }

        if let Some(kernel) = self.annotations.get(annotations::KERNEL_PATH) {
            tracing::debug!(pod_id = %self.id, kernel = %kernel, "kernel path from annotation");
            config.kernel_path = PathBuf::from(kernel);
        }
        if let Some(image) = self.annotations.get(annotations::IMAGE_PATH) {
            tracing::debug!(pod_id = %self.id, image = %image, "image path from annotation");
            config.image_path = PathBuf::from(image);
        }

        if let Some(hash) = self.annotations.get(annotations::KERNEL_HASH) {
            verify_asset_hash(&config.kernel_path, hash)?;
        }
        if let Some(hash) = self.annotations.get(annotations::IMAGE_HASH) {
            verify_asset_hash(&config.image_path, hash)?;
        }

        Ok(config)
    }
}

/// Hex SHA-512 of the file at `path`.
pub fn sha512_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha512::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn verify_asset_hash(path: &Path, expected: &str) -> Result<()> {
    let actual = sha512_file(path)?;
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(Error::config(format!(
            "asset {} has sha512 {}, annotation expects {}",
            path.display(),
            actual,
            expected
        )));
    }
    tracing::debug!(path = %path.display(), "asset hash verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_annotations_keeps_config() {
        let pod = PodConfig::new("pod", HypervisorConfig::new("/k", "/i"));
        assert_eq!(
            pod.effective_hypervisor_config().unwrap(),
            pod.hypervisor_config
        );
    }

    #[test]
    fn test_asset_annotations_override_paths() {
        let mut pod = PodConfig::new("pod", HypervisorConfig::new("/k", "/i"));
        pod.annotations
            .insert(annotations::KERNEL_PATH.to_string(), "/custom/vmlinux".to_string());
        pod.annotations
            .insert(annotations::IMAGE_PATH.to_string(), "/custom/image.img".to_string());
        pod.annotations
            .insert(annotations::ASSET_HASH_TYPE.to_string(), "sha512".to_string());

        let config = pod.effective_hypervisor_config().unwrap();
        assert_eq!(config.kernel_path, PathBuf::from("/custom/vmlinux"));
        assert_eq!(config.image_path, PathBuf::from("/custom/image.img"));
    }

    // sha512("abc")
    const ABC_SHA512: &str = "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f";

    #[test]
    fn test_sha512_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asset");
        std::fs::write(&path, "abc").unwrap();
        assert_eq!(sha512_file(&path).unwrap(), ABC_SHA512);
    }

    #[test]
    fn test_asset_hash_matches() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("image.img");
        let kernel = dir.path().join("vmlinux");
        std::fs::write(&image, "abc").unwrap();
        std::fs::write(&kernel, "abc").unwrap();

        let upper = ABC_SHA512.to_uppercase();
        let mut pod = PodConfig::new("pod", HypervisorConfig::new("/k", "/i"));
        for (key, value) in [
            (annotations::IMAGE_PATH, image.to_str().unwrap()),
            (annotations::KERNEL_PATH, kernel.to_str().unwrap()),
            (annotations::IMAGE_HASH, ABC_SHA512),
            (annotations::KERNEL_HASH, upper.as_str()),
        ] {
            pod.annotations.insert(key.to_string(), value.to_string());
        }

        let config = pod.effective_hypervisor_config().unwrap();
        assert_eq!(config.image_path, image);
        assert_eq!(config.kernel_path, kernel);
    }

    #[test]
    fn test_asset_hash_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("image.img");
        std::fs::write(&image, "not abc").unwrap();

        let mut pod = PodConfig::new("pod", HypervisorConfig::new("/k", &image));
        pod.annotations
            .insert(annotations::IMAGE_HASH.to_string(), ABC_SHA512.to_string());

        let err = pod.effective_hypervisor_config().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("image.img"));
    }

    #[test]
    fn test_asset_hash_missing_file() {
        let mut pod = PodConfig::new("pod", HypervisorConfig::new("/nonexistent/vmlinux", "/i"));
        pod.annotations
            .insert(annotations::KERNEL_HASH.to_string(), ABC_SHA512.to_string());
        assert!(pod.effective_hypervisor_config().unwrap_err().is_io());
    }

    #[test]
    fn test_unsupported_hash_type() {
        let mut pod = PodConfig::new("pod", HypervisorConfig::new("/k", "/i"));
        pod.annotations
            .insert(annotations::ASSET_HASH_TYPE.to_string(), "md5".to_string());
        assert!(matches!(
            pod.effective_hypervisor_config(),
            Err(Error::Config(_))
        ));
    }
}
