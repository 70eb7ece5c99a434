//! # Shim Constants
//!
//! File names, environment variables, annotation keys, and limits used by
//! the create path. Kept in one place so the loader, classifier, and config
//! resolver agree on them.
//!
//! ## Cross-References
//!
//! - [`crate::bundle`]: Uses `OCI_CONFIG_FILENAME` and `MAX_CONFIG_SIZE`
//! - [`crate::classify`]: Uses the container-type annotation keys
//! - [`crate::config`]: Uses `CONFIG_ENV_VAR` and the default search paths
//! - [`crate::options`]: Uses the option payload type URLs
//! - [`crate::service`]: Uses `MAX_CONTAINERS`

// =============================================================================
// Bundle Layout
// =============================================================================

/// Name of the OCI runtime configuration file inside a bundle.
pub const OCI_CONFIG_FILENAME: &str = "config.json";

/// Maximum size of a bundle's `config.json` (1 MiB).
///
/// **Security**: Prevents memory exhaustion from parsing oversized specs.
/// Real-world specs, hooks and annotations included, stay well under 64 KiB.
pub const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Environment variable naming a runtime configuration file.
///
/// Consulted only when the request's options payload carries no path.
pub const CONFIG_ENV_VAR: &str = "MAGIKSHIM_CONF_FILE";

/// File name of the runtime configuration.
pub const CONFIG_FILENAME: &str = "configuration.toml";

/// System-wide configuration, edited by the operator.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/magikshim/configuration.toml";

/// Configuration shipped with the package.
pub const DEFAULTS_CONFIG_PATH: &str = "/usr/share/defaults/magikshim/configuration.toml";

/// Subdirectory of the user's config dir holding a per-user configuration.
pub const USER_CONFIG_SUBDIR: &str = "magikshim";

/// Default number of vCPUs for a sandbox.
pub const DEFAULT_SANDBOX_VCPUS: u32 = 1;

/// Default sandbox memory (2 GiB).
pub const DEFAULT_SANDBOX_MEMORY_MIB: u32 = 2048;

/// Minimum sandbox memory accepted from configuration.
///
/// **Rationale**: A guest below 64 MiB cannot boot a kernel plus agent.
pub const MIN_SANDBOX_MEMORY_MIB: u32 = 64;

// =============================================================================
// Option Payload Type URLs
// =============================================================================

/// Type URL of the CRI runtime options payload (carries `config_path`).
pub const RUNTIME_OPTIONS_TYPE_URL: &str = "runtimeoptions.v1.Options";

/// Type URL of the runc options payload passed by the default CRI handler.
pub const RUNC_OPTIONS_TYPE_URL: &str = "containerd.linux.runc.RuncOptions";

// =============================================================================
// Pod Annotations
// =============================================================================
//
// Orchestrators mark the pod-defining unit and its members through
// annotations on the OCI spec. containerd's CRI plugin and CRI-O use
// different keys for the same convention.
// =============================================================================

/// containerd CRI container-type annotation.
pub const CRI_CONTAINER_TYPE_ANNOTATION: &str = "io.kubernetes.cri.container-type";

/// CRI-O container-type annotation.
pub const CRIO_CONTAINER_TYPE_ANNOTATION: &str = "io.kubernetes.cri-o.ContainerType";

/// Container-type annotation keys, in lookup order.
pub const CONTAINER_TYPE_ANNOTATIONS: &[&str] =
    &[CRI_CONTAINER_TYPE_ANNOTATION, CRIO_CONTAINER_TYPE_ANNOTATION];

/// containerd CRI sandbox-id annotation.
pub const CRI_SANDBOX_ID_ANNOTATION: &str = "io.kubernetes.cri.sandbox-id";

/// CRI-O sandbox-id annotation.
pub const CRIO_SANDBOX_ID_ANNOTATION: &str = "io.kubernetes.cri-o.SandboxID";

/// Sandbox-id annotation keys, in lookup order.
pub const SANDBOX_ID_ANNOTATIONS: &[&str] =
    &[CRI_SANDBOX_ID_ANNOTATION, CRIO_SANDBOX_ID_ANNOTATION];

/// Annotation value marking the pod-defining unit.
pub const CONTAINER_TYPE_SANDBOX: &str = "sandbox";

/// Annotation value marking a member joining an existing pod.
pub const CONTAINER_TYPE_CONTAINER: &str = "container";

// =============================================================================
// Service Limits
// =============================================================================

/// Maximum number of container records per service.
///
/// **Security**: Bounds registry growth if the caller never deletes.
pub const MAX_CONTAINERS: usize = 1024;

/// Valid characters for container IDs.
///
/// Includes: `a-z`, `A-Z`, `0-9`, `-`, `_`, `.`
///
/// **Security**: Excludes `/` and other characters that could be used for
/// path traversal when container IDs are used in filesystem paths. The
/// dot-only IDs `.` and `..` are rejected separately.
pub const CONTAINER_NAME_VALID_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_.";

/// Maximum container ID length.
///
/// **Rationale**: 128 characters accommodates 64-char CRI hex IDs and UUIDs.
pub const MAX_CONTAINER_ID_LEN: usize = 128;

// =============================================================================
// Container ID Validation Helper
// =============================================================================

/// Validates a container ID.
///
/// Ensures the ID is non-empty, no longer than `MAX_CONTAINER_ID_LEN`,
/// drawn from `CONTAINER_NAME_VALID_CHARS`, and not `.` or `..`.
///
/// # Returns
///
/// `Ok(())` if valid, `Err(reason)` with a description of the failure.
#[inline]
#[must_use = "validation result must be checked to ensure container ID is safe"]
pub fn validate_container_id(id: &str) -> std::result::Result<(), &'static str> {
    if id.is_empty() {
        return Err("container ID cannot be empty");
    }
    if id.len() > MAX_CONTAINER_ID_LEN {
        return Err("container ID exceeds maximum length");
    }
    if !id.chars().all(|c| CONTAINER_NAME_VALID_CHARS.contains(c)) {
        return Err("container ID contains invalid characters");
    }
    if id == "." || id == ".." {
        return Err("container ID cannot be a relative path component");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_container_id() {
        assert!(validate_container_id("abc-123_x").is_ok());
        assert!(validate_container_id("nginx.v1").is_ok());
        assert!(validate_container_id(".").is_err());
        assert!(validate_container_id("..").is_err());
        assert!(validate_container_id("a/b").is_err());
        assert!(validate_container_id("").is_err());
        assert!(validate_container_id("../etc").is_err());
        assert!(validate_container_id(&"a".repeat(MAX_CONTAINER_ID_LEN + 1)).is_err());
    }
}
