//! Persisted hypervisor state.
//!
//! The state written at `init` lets a later process reattach to a running
//! pod VM without rebuilding its configuration.
//!
//! # Layout
//!
//! ```text
//! <run root>/
//! └── {pod_id}/            # created by the pod workflow, never by us
//!     ├── hypervisor.json  # PersistedState
//!     ├── console.sock
//!     └── qmp.sock
//! ```

use crate::config::HypervisorConfig;
use crate::error::{Error, Result};
use crate::kernel;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// On-disk form of a pod's hypervisor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Schema version.
    pub version: u32,

    /// Hypervisor configuration the VM was built from.
    pub config: HypervisorConfig,

    /// Resolved hypervisor binary.
    pub hypervisor_path: PathBuf,

    /// Kernel command line tokens.
    pub kernel_params: Vec<String>,
}

impl PersistedState {
    /// Current schema version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Create state at the current schema version.
    pub fn new(
        config: HypervisorConfig,
        hypervisor_path: PathBuf,
        kernel_params: Vec<String>,
    ) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            config,
            hypervisor_path,
            kernel_params,
        }
    }

    /// Fail unless this state was written with the current schema.
    pub fn check_version(&self) -> Result<()> {
        if self.version != Self::CURRENT_VERSION {
            return Err(Error::SchemaMismatch {
                expected: Self::CURRENT_VERSION,
                found: self.version,
            });
        }
        Ok(())
    }

    /// Fail unless this state is current and its kernel parameters are usable.
    pub fn validate(&self) -> Result<()> {
        self.check_version()?;
        kernel::check_params(&self.kernel_params)
    }
}

/// Where pod hypervisor state lives.
pub trait Storage: Send {
    /// Root directory holding per-pod state directories.
    fn run_root(&self) -> &Path;

    /// Read a pod's state; `None` if it was never written.
    fn fetch_hypervisor_state(&self, pod_id: &str) -> Result<Option<PersistedState>>;

    /// Write a pod's state, replacing any previous copy.
    fn store_hypervisor_state(&self, pod_id: &str, state: &PersistedState) -> Result<()>;
}

/// JSON files under a run root.
#[derive(Debug, Clone)]
pub struct Filesystem {
    root: PathBuf,
}

impl Default for Filesystem {
    fn default() -> Self {
        Self::new(paths::RUN_STORAGE_PATH)
    }
}

impl Filesystem {
    /// Store state under a custom root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn state_path(&self, pod_id: &str) -> PathBuf {
        paths::hypervisor_state_path(&self.root, pod_id)
    }
}

impl Storage for Filesystem {
    fn run_root(&self) -> &Path {
        &self.root
    }

    fn fetch_hypervisor_state(&self, pod_id: &str) -> Result<Option<PersistedState>> {
        let path = self.state_path(pod_id);
        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let state: PersistedState = serde_json::from_slice(&content)?;
        state.validate()?;

        tracing::debug!(pod_id = %pod_id, path = %path.display(), "loaded hypervisor state");
        Ok(Some(state))
    }

    fn store_hypervisor_state(&self, pod_id: &str, state: &PersistedState) -> Result<()> {
        let dir = paths::pod_dir(&self.root, pod_id);
        if !dir.is_dir() {
            return Err(Error::StorageDirMissing { path: dir });
        }

        let json = serde_json::to_vec_pretty(state)?;

        // Write beside the target and rename, so readers never see a partial file.
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;

        let path = self.state_path(pod_id);
        tmp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!(pod_id = %pod_id, path = %path.display(), "stored hypervisor state");
        Ok(())
    }
}
