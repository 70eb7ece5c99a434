//! Container records.
//!
//! A record is what a successful create leaves behind in the service
//! registry: the logical container the caller will start, wait on, and
//! eventually delete through other paths. Lifecycle state past creation
//! belongs to those paths and is not tracked here.

use crate::classify::ContainerType;
use crate::spec::Spec;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome of a successful create.
#[derive(Debug, Clone)]
pub struct ContainerRecord {
    /// Container ID from the request.
    pub id: String,
    /// Sandbox this container belongs to.
    ///
    /// The new sandbox's ID for a sandbox root, the bound sandbox's ID for a
    /// member, `None` for a standalone container.
    pub sandbox_id: Option<String>,
    /// Classified type.
    pub container_type: ContainerType,
    /// Resolved bundle directory.
    pub bundle: PathBuf,
    /// Normalized spec the container was created from.
    pub spec: Arc<Spec>,
    /// Caller attaches a terminal.
    pub terminal: bool,
    /// Process output was suppressed.
    pub disable_output: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ContainerRecord {
    /// Returns true if this record is the pod sandbox itself.
    pub fn is_sandbox(&self) -> bool {
        self.container_type.is_sandbox()
    }
}
