//! Pod annotation keys understood by the driver.

const PREFIX: &str = "com.github.containers.virtcontainers.";

/// Per-pod kernel image path override.
pub const KERNEL_PATH: &str = "com.github.containers.virtcontainers.KernelPath";

/// Per-pod guest image path override.
pub const IMAGE_PATH: &str = "com.github.containers.virtcontainers.ImagePath";

/// SHA-512 of the kernel image.
pub const KERNEL_HASH: &str = "com.github.containers.virtcontainers.KernelHash";

/// SHA-512 of the guest image.
pub const IMAGE_HASH: &str = "com.github.containers.virtcontainers.ImageHash";

/// Hash algorithm used by the asset hash annotations.
pub const ASSET_HASH_TYPE: &str = "com.github.containers.virtcontainers.AssetHashType";

/// The only supported asset hash algorithm.
pub const SHA512: &str = "sha512";

/// Whether `key` belongs to this runtime's annotation namespace.
pub fn is_runtime_annotation(key: &str) -> bool {
    key.starts_with(PREFIX)
}
