//! Sandbox orchestrator capability.
//!
//! The create path never builds a sandbox itself. It hands a normalized spec
//! to a [`SandboxOrchestrator`], which owns the real lifecycle (VM boot,
//! namespace setup, agent calls, ...). The shim only keeps the opaque
//! [`Sandbox`] handle it gets back.
//!
//! ```text
//!   CreationCoordinator
//!          │
//!          ├── SandboxRoot    ──► create_sandbox(params)          ──► SandboxRef
//!          ├── SandboxMember  ──► create_container(Some(sb), ..)
//!          └── Standalone     ──► create_container(None, ..)
//! ```
//!
//! Errors are `anyhow::Error` and reach the caller unchanged as
//! [`Error::Orchestrator`](crate::error::Error::Orchestrator).

use crate::config::RuntimeConfig;
use crate::spec::Spec;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Opaque handle to a running sandbox.
pub trait Sandbox: std::fmt::Debug + Send + Sync {
    /// Sandbox identifier (the ID of the request that created it).
    fn id(&self) -> &str;
}

/// Shared sandbox handle.
pub type SandboxRef = Arc<dyn Sandbox>;

/// Inputs for creating a sandbox.
#[derive(Debug, Clone, Copy)]
pub struct SandboxParams<'a> {
    /// Sandbox ID.
    pub id: &'a str,
    /// Resolved bundle directory.
    pub bundle: &'a Path,
    /// Normalized spec.
    pub spec: &'a Spec,
    /// Service configuration.
    pub config: &'a RuntimeConfig,
    /// Suppress the process's output.
    pub disable_output: bool,
}

/// Inputs for creating a container.
#[derive(Debug, Clone, Copy)]
pub struct ContainerParams<'a> {
    /// Container ID.
    pub id: &'a str,
    /// Resolved bundle directory.
    pub bundle: &'a Path,
    /// Normalized spec.
    pub spec: &'a Spec,
    /// Suppress the process's output.
    pub disable_output: bool,
}

/// Creates sandboxes and containers on behalf of the shim.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. The shim serializes create
/// requests, but other callers may share the orchestrator.
#[async_trait]
pub trait SandboxOrchestrator: Send + Sync {
    /// Returns the orchestrator name (for logs).
    fn name(&self) -> &str;

    /// Prepares the sandbox factory before a sandbox is created.
    ///
    /// Called with the service configuration on every sandbox creation.
    /// Failures are the orchestrator's to log; they never fail the request.
    async fn prepare_factory(&self, config: &RuntimeConfig) {
        let _ = config;
    }

    /// Creates and starts a sandbox, returning its handle.
    async fn create_sandbox(&self, params: SandboxParams<'_>) -> anyhow::Result<SandboxRef>;

    /// Creates a container.
    ///
    /// `sandbox` is the bound sandbox for pod members and `None` for
    /// standalone containers.
    async fn create_container(
        &self,
        sandbox: Option<&SandboxRef>,
        params: ContainerParams<'_>,
    ) -> anyhow::Result<()>;
}
