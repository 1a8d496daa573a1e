//! Error types for podvm.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using podvm's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring a pod VM.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Machine type is not one of the supported QEMU machines.
    #[error("unrecognised machine type: {0:?}")]
    InvalidMachineType(String),

    /// Host information source returned something unusable.
    #[error("host info error: {0}")]
    HostInfo(String),

    /// Persisted state was written with an incompatible schema.
    #[error("persisted state schema mismatch: expected version {expected}, found {found}")]
    SchemaMismatch {
        /// Version this build understands.
        expected: u32,
        /// Version found on disk.
        found: u32,
    },

    /// The configured machine type cannot hotplug this kind of device.
    #[error("{device} hotplug not supported on machine type {machine_type:?}")]
    HotplugUnsupported {
        /// Device kind being hotplugged.
        device: String,
        /// Current machine type.
        machine_type: String,
    },

    // Invariant violations
    /// Kernel command line could not be built.
    #[error("kernel parameter error: {0}")]
    KernelParams(String),

    // Storage errors
    /// The per-pod storage directory has not been created.
    #[error("pod storage directory missing: {}", path.display())]
    StorageDirMissing {
        /// Directory that was expected to exist.
        path: PathBuf,
    },

    /// Guest image could not be opened or stat'd.
    #[error("guest image {}: {source}", path.display())]
    Image {
        /// Image path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    // IO errors
    /// IO error wrapper.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error with a message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a host info error with a message.
    pub fn host_info(msg: impl Into<String>) -> Self {
        Self::HostInfo(msg.into())
    }

    /// Create a kernel parameter error with a message.
    pub fn kernel_params(msg: impl Into<String>) -> Self {
        Self::KernelParams(msg.into())
    }

    /// Whether this error came from the filesystem rather than from bad input.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::StorageDirMissing { .. } | Error::Image { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_machine_type_includes_value() {
        let err = Error::InvalidMachineType("PC".to_string());
        let msg = err.to_string();
        assert!(msg.contains("\"PC\""), "Error should quote the machine type");
    }

    #[test]
    fn test_storage_dir_missing_includes_path() {
        let err = Error::StorageDirMissing {
            path: PathBuf::from("/run/virtcontainers/pods/testPod"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/run/virtcontainers/pods/testPod"));
        assert!(err.is_io());
    }

    #[test]
    fn test_schema_mismatch_includes_both_versions() {
        let err = Error::SchemaMismatch {
            expected: 1,
            found: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains('1'));
        assert!(msg.contains('7'));
        assert!(!err.is_io());
    }

    #[test]
    fn test_hotplug_unsupported_names_machine() {
        let err = Error::HotplugUnsupported {
            device: "block device".to_string(),
            machine_type: "q35".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("block device"));
        assert!(msg.contains("q35"));
    }
}
