//! Centralized path constants and helpers.
//!
//! Downstream tooling locates pod state by these names, so they are fixed.

use std::path::{Path, PathBuf};

// =============================================================================
// Run Storage
// =============================================================================

/// Root directory holding one subdirectory of runtime state per pod.
pub const RUN_STORAGE_PATH: &str = "/run/virtcontainers/pods";

/// Persisted hypervisor state file name inside a pod directory.
pub const HYPERVISOR_STATE_FILE: &str = "hypervisor.json";

/// Console socket name inside a pod directory.
pub const DEFAULT_CONSOLE: &str = "console.sock";

/// QMP control socket name inside a pod directory.
pub const QMP_CONTROL_SOCKET: &str = "qmp.sock";

// =============================================================================
// Host Binaries and Info Sources
// =============================================================================

/// Hypervisor binary used when the configuration does not name one.
pub const DEFAULT_HYPERVISOR_PATH: &str = "/usr/bin/qemu-lite-system-x86_64";

/// Host memory information.
pub const PROC_MEMINFO: &str = "/proc/meminfo";

/// Host CPU information.
pub const PROC_CPUINFO: &str = "/proc/cpuinfo";

// =============================================================================
// Helpers
// =============================================================================

/// Directory holding a pod's runtime state.
pub fn pod_dir(run_root: &Path, pod_id: &str) -> PathBuf {
    run_root.join(pod_id)
}

/// Path of a pod's persisted hypervisor state.
pub fn hypervisor_state_path(run_root: &Path, pod_id: &str) -> PathBuf {
    pod_dir(run_root, pod_id).join(HYPERVISOR_STATE_FILE)
}

/// Path of a pod's console socket.
///
/// Pure function of its inputs; nothing is touched on disk.
pub fn console_path(run_root: &Path, pod_id: &str) -> PathBuf {
    pod_dir(run_root, pod_id).join(DEFAULT_CONSOLE)
}

/// Path of a pod's QMP control socket.
pub fn qmp_socket_path(run_root: &Path, pod_id: &str) -> PathBuf {
    pod_dir(run_root, pod_id).join(QMP_CONTROL_SOCKET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_path_layout() {
        let path = console_path(Path::new(RUN_STORAGE_PATH), "testPodID");
        assert_eq!(
            path,
            PathBuf::from("/run/virtcontainers/pods/testPodID/console.sock")
        );
    }

    #[test]
    fn test_state_path_layout() {
        let path = hypervisor_state_path(Path::new("/tmp/root"), "pod-a");
        assert_eq!(path, PathBuf::from("/tmp/root/pod-a/hypervisor.json"));
    }
}
