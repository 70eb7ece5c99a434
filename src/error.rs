//! Error types for the create path.

use std::path::PathBuf;

/// Result type alias for shim operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while handling a create request.
///
/// Every variant aborts the request. Nothing is retried: the causes are bad
/// input, invariant violations, unreachable configuration, or a downstream
/// failure, none of which are transient.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Request Errors
    // =========================================================================
    /// Container ID failed validation.
    #[error("invalid container ID '{id}': {reason}")]
    InvalidContainerId { id: String, reason: String },

    /// Bundle path is empty, unresolvable, or not a directory.
    #[error("invalid bundle at {path}: {reason}")]
    InvalidBundle { path: PathBuf, reason: String },

    /// Bundle `config.json` is missing, unreadable, or malformed.
    #[error("failed to parse OCI spec at {path}: {reason}")]
    SpecParse { path: PathBuf, reason: String },

    /// A registered option payload could not be decoded.
    #[error("invalid options payload '{type_url}': {reason}")]
    InvalidOptions { type_url: String, reason: String },

    // =========================================================================
    // Classification Errors
    // =========================================================================
    /// Container-type annotation carries an unknown value.
    #[error("unknown container type '{value}' in annotation {key}")]
    Classification { key: String, value: String },

    // =========================================================================
    // Sandbox State Errors
    // =========================================================================
    /// A sandbox is already bound to this service.
    #[error("cannot create another sandbox in sandbox: {existing}")]
    DuplicateSandbox { existing: String },

    /// A member container arrived before any sandbox was created.
    ///
    /// This is an orchestration-layer defect, not a user error. See
    /// [`Error::is_bug`].
    #[error("BUG: cannot create container '{id}', since the sandbox hasn't been created")]
    NoActiveSandbox { id: String },

    /// Container ID is already registered.
    #[error("container already exists: {0}")]
    ContainerAlreadyExists(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Runtime configuration could not be located, read, or parsed.
    #[error("failed to load runtime configuration from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    // =========================================================================
    // Orchestrator Errors
    // =========================================================================
    /// Failure reported by the sandbox orchestrator, passed through as-is.
    #[error(transparent)]
    Orchestrator(#[from] anyhow::Error),

    // =========================================================================
    // Resource Errors
    // =========================================================================
    /// A service limit was reached.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if the error signals a defect in the calling
    /// orchestration layer rather than bad input.
    #[must_use]
    pub fn is_bug(&self) -> bool {
        matches!(self, Self::NoActiveSandbox { .. })
    }
}
