//! Container type classification.
//!
//! Pod-aware orchestrators annotate each OCI spec to say whether it defines
//! the pod sandbox or joins one. Callers that are not pod-aware send no such
//! annotation; those specs run as standalone containers.

use crate::constants::{
    CONTAINER_TYPE_ANNOTATIONS, CONTAINER_TYPE_CONTAINER, CONTAINER_TYPE_SANDBOX,
    SANDBOX_ID_ANNOTATIONS,
};
use crate::error::{Error, Result};
use crate::spec::Spec;
use serde::{Deserialize, Serialize};

/// Kind of entity a create request asks for.
///
/// Derived from a spec; never stored apart from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerType {
    /// The pod-defining unit: creating it creates the sandbox.
    SandboxRoot,
    /// A container joining the already-running sandbox.
    SandboxMember,
    /// A container outside any pod.
    Standalone,
}

impl ContainerType {
    /// Returns true if creating this entity creates a sandbox.
    pub fn is_sandbox(&self) -> bool {
        *self == Self::SandboxRoot
    }
}

impl std::fmt::Display for ContainerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SandboxRoot => write!(f, "sandbox-root"),
            Self::SandboxMember => write!(f, "sandbox-member"),
            Self::Standalone => write!(f, "standalone"),
        }
    }
}

/// Classifies a spec by its container-type annotation.
///
/// Keys are consulted in the order of `CONTAINER_TYPE_ANNOTATIONS`; the
/// first one present decides.
///
/// # Errors
///
/// Returns [`Error::Classification`] if a recognized key carries a value
/// other than `sandbox` or `container`. A spec with no recognized key is
/// [`ContainerType::Standalone`], not an error.
pub fn classify(spec: &Spec) -> Result<ContainerType> {
    for key in CONTAINER_TYPE_ANNOTATIONS {
        let Some(value) = spec.annotation(key) else {
            continue;
        };

        return match value {
            CONTAINER_TYPE_SANDBOX => Ok(ContainerType::SandboxRoot),
            CONTAINER_TYPE_CONTAINER => Ok(ContainerType::SandboxMember),
            other => Err(Error::Classification {
                key: (*key).to_string(),
                value: other.to_string(),
            }),
        };
    }

    Ok(ContainerType::Standalone)
}

/// Returns the sandbox ID the orchestrator recorded on the spec, if any.
pub fn sandbox_id_annotation(spec: &Spec) -> Option<&str> {
    SANDBOX_ID_ANNOTATIONS
        .iter()
        .find_map(|key| spec.annotation(key))
}
