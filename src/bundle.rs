//! OCI Runtime Bundle loading.
//!
//! Resolves a bundle directory handed to us by the orchestration layer and
//! parses its `config.json` into a [`Spec`]. The bundle's rootfs is not
//! inspected; that is the sandbox's business.
//!
//! Well-formedness of the request (ID and path) is checked before touching
//! the filesystem, so an empty path never reaches `canonicalize`.

use crate::constants::{MAX_CONFIG_SIZE, OCI_CONFIG_FILENAME, validate_container_id};
use crate::error::{Error, Result};
use crate::spec::Spec;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A resolved bundle with its parsed spec.
#[derive(Debug, Clone)]
pub struct LoadedBundle {
    /// Absolute, symlink-free bundle directory.
    pub path: PathBuf,
    /// Parsed `config.json`.
    pub spec: Spec,
}

/// Validates the container ID and bundle path, returning the resolved
/// bundle directory.
///
/// # Errors
///
/// - [`Error::InvalidContainerId`] if the ID fails validation
/// - [`Error::InvalidBundle`] if the path is empty, cannot be resolved, or
///   is not a directory
pub fn validate_bundle(id: &str, bundle: &Path) -> Result<PathBuf> {
    validate_container_id(id).map_err(|reason| Error::InvalidContainerId {
        id: id.to_string(),
        reason: reason.to_string(),
    })?;

    if bundle.as_os_str().is_empty() {
        return Err(Error::InvalidBundle {
            path: bundle.to_path_buf(),
            reason: "bundle path cannot be empty".to_string(),
        });
    }

    let resolved = bundle.canonicalize().map_err(|e| Error::InvalidBundle {
        path: bundle.to_path_buf(),
        reason: format!("cannot resolve path: {e}"),
    })?;

    if !resolved.is_dir() {
        return Err(Error::InvalidBundle {
            path: resolved,
            reason: "not a directory".to_string(),
        });
    }

    debug!(container = %id, bundle = %resolved.display(), "Resolved bundle");
    Ok(resolved)
}

/// Parses `config.json` from a resolved bundle directory.
///
/// # Errors
///
/// Returns [`Error::SpecParse`] if the file is missing, unreadable, larger
/// than `MAX_CONFIG_SIZE`, not valid JSON, or violates a rule checked by
/// [`Spec::validate`].
pub fn parse_config(bundle: &Path) -> Result<Spec> {
    let config_path = bundle.join(OCI_CONFIG_FILENAME);
    let parse_err = |reason: String| Error::SpecParse {
        path: config_path.clone(),
        reason,
    };

    let metadata = fs::metadata(&config_path).map_err(|e| parse_err(e.to_string()))?;
    if metadata.len() > MAX_CONFIG_SIZE {
        return Err(parse_err(format!(
            "config size {} exceeds limit of {}",
            metadata.len(),
            MAX_CONFIG_SIZE
        )));
    }

    let data = fs::read(&config_path).map_err(|e| parse_err(e.to_string()))?;
    let spec: Spec = serde_json::from_slice(&data).map_err(|e| parse_err(e.to_string()))?;
    spec.validate().map_err(parse_err)?;

    Ok(spec)
}

/// Validates and loads a bundle in one step.
///
/// No retries: any failure is final for the request.
pub fn load_bundle(id: &str, bundle: &Path) -> Result<LoadedBundle> {
    let path = validate_bundle(id, bundle)?;
    let spec = parse_config(&path)?;
    Ok(LoadedBundle { path, spec })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_path_rejected_before_io() {
        let err = validate_bundle("c1", Path::new("")).unwrap_err();
        assert!(matches!(err, Error::InvalidBundle { .. }));
    }

    #[test]
    fn test_invalid_id_rejected_first() {
        let err = validate_bundle("", Path::new("")).unwrap_err();
        assert!(matches!(err, Error::InvalidContainerId { .. }));
    }

    #[test]
    fn test_file_is_not_a_bundle() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("config.json");
        fs::write(&file, "{}").unwrap();

        let err = validate_bundle("c1", &file).unwrap_err();
        assert!(matches!(err, Error::InvalidBundle { .. }));
    }

    #[test]
    fn test_oversized_config_rejected() {
        let dir = TempDir::new().unwrap();
        let padding = " ".repeat(MAX_CONFIG_SIZE as usize + 1);
        fs::write(dir.path().join(OCI_CONFIG_FILENAME), padding).unwrap();

        let err = parse_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains("exceeds limit"));
    }
}
