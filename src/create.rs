//! Create path: turns a create request into a sandbox or a container.
//!
//! ```text
//!   CreateRequest
//!        │
//!        ▼
//!   load_bundle ──► normalize_spec ──► classify
//!                                         │
//!        ┌────────────────────────────────┼─────────────────────┐
//!        ▼                                ▼                     ▼
//!   SandboxRoot                      SandboxMember          Standalone
//!   slot must be empty               slot must be bound     no precondition
//!   resolve config                   create_container       create_container
//!   create_sandbox                   (in bound sandbox)     (no sandbox)
//!   bind slot
//!        └────────────────────────────────┬─────────────────────┘
//!                                         ▼
//!                            register ContainerRecord
//! ```
//!
//! The service lock is held from the sandbox-slot check to registration, so
//! a failure anywhere leaves the slot and the registry untouched.

use crate::bundle::load_bundle;
use crate::classify::{ContainerType, classify};
use crate::config::ConfigResolver;
use crate::constants::MAX_CONTAINERS;
use crate::error::{Error, Result};
use crate::normalize::normalize_spec;
use crate::options::{DecodedOptions, OptionsRegistry, TypedPayload};
use crate::orchestrator::{ContainerParams, SandboxOrchestrator, SandboxParams, SandboxRef};
use crate::record::ContainerRecord;
use crate::service::{ServiceInner, ServiceState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// A request to create a sandbox or container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// Caller-supplied ID, unique within the service.
    pub id: String,
    /// Path to the OCI bundle.
    pub bundle: PathBuf,
    /// Optional type-tagged options.
    pub options: Option<TypedPayload>,
    /// Caller will attach a terminal.
    pub terminal: bool,
}

impl CreateRequest {
    /// Creates a request without options or terminal.
    pub fn new(id: impl Into<String>, bundle: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            bundle: bundle.into(),
            options: None,
            terminal: false,
        }
    }

    /// Attaches an options payload.
    #[must_use]
    pub fn with_options(mut self, options: TypedPayload) -> Self {
        self.options = Some(options);
        self
    }

    /// Sets the terminal flag.
    #[must_use]
    pub fn with_terminal(mut self, terminal: bool) -> Self {
        self.terminal = terminal;
        self
    }
}

/// Decides whether the created process's output is suppressed.
///
/// Output is kept if the caller attaches a terminal or the spec's process
/// asks for one; it is suppressed only when neither does.
#[inline]
pub fn output_disabled(request_terminal: bool, process_terminal: bool) -> bool {
    !request_terminal && !process_terminal
}

/// Runs create requests against one service.
pub struct CreationCoordinator {
    state: Arc<ServiceState>,
    orchestrator: Arc<dyn SandboxOrchestrator>,
    resolver: ConfigResolver,
    options: OptionsRegistry,
}

impl CreationCoordinator {
    /// Creates a coordinator with the default options registry and a config
    /// resolver reading `MAGIKSHIM_CONF_FILE`.
    pub fn new(state: Arc<ServiceState>, orchestrator: Arc<dyn SandboxOrchestrator>) -> Self {
        Self {
            state,
            orchestrator,
            resolver: ConfigResolver::from_env(),
            options: OptionsRegistry::with_defaults(),
        }
    }

    /// Replaces the config resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: ConfigResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replaces the options registry.
    #[must_use]
    pub fn with_options_registry(mut self, options: OptionsRegistry) -> Self {
        self.options = options;
        self
    }

    /// Returns the service state.
    pub fn state(&self) -> &Arc<ServiceState> {
        &self.state
    }

    /// Handles one create request.
    ///
    /// `netns` is the network namespace handle for this call; it is written
    /// into any network namespace descriptor without a path.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidContainerId`], [`Error::InvalidBundle`],
    ///   [`Error::SpecParse`] from bundle loading
    /// - [`Error::Classification`] for an unknown container-type annotation
    /// - [`Error::InvalidOptions`] for an undecodable registered payload
    /// - [`Error::ContainerAlreadyExists`] if the ID is already registered
    /// - [`Error::DuplicateSandbox`] if a sandbox is already bound
    /// - [`Error::NoActiveSandbox`] if a member arrives before its sandbox
    /// - [`Error::ConfigLoad`] if the runtime configuration cannot be loaded
    /// - [`Error::Orchestrator`] for any orchestrator failure, unchanged
    pub async fn create(&self, req: &CreateRequest, netns: &str) -> Result<ContainerRecord> {
        let bundle = load_bundle(&req.id, &req.bundle)?;
        let bundle_path = bundle.path;
        let mut spec = bundle.spec;

        normalize_spec(&mut spec, netns);
        let container_type = classify(&spec)?;
        let disable_output = output_disabled(req.terminal, spec.process_terminal());

        debug!(
            container = %req.id,
            kind = %container_type,
            disable_output,
            "Classified create request"
        );

        let mut inner = self.state.lock().await;

        // Slot preconditions are reported ahead of registry conflicts.
        let joined = check_sandbox_slot(&inner, container_type, &req.id)?;

        if inner.containers.contains_key(&req.id) {
            return Err(Error::ContainerAlreadyExists(req.id.clone()));
        }
        if inner.containers.len() >= MAX_CONTAINERS {
            return Err(Error::ResourceExhausted(format!(
                "maximum container limit reached ({MAX_CONTAINERS})"
            )));
        }

        let sandbox_id = match container_type {
            ContainerType::SandboxRoot => {
                let options = self.decode_options(req)?;
                let resolved = self
                    .resolver
                    .resolve(options.as_ref(), self.state.config_cache())?;
                debug!(
                    sandbox = %req.id,
                    source = %resolved.source,
                    cached = resolved.cached,
                    "Resolved runtime configuration"
                );

                // The sandbox is built from the service's cached config,
                // which is the one just loaded unless it was seeded earlier.
                let config = self.state.config().ok_or_else(|| {
                    Error::Internal("runtime configuration missing after resolution".to_string())
                })?;

                self.orchestrator.prepare_factory(&config).await;
                let sandbox = self
                    .orchestrator
                    .create_sandbox(SandboxParams {
                        id: &req.id,
                        bundle: &bundle_path,
                        spec: &spec,
                        config: &config,
                        disable_output,
                    })
                    .await?;

                let id = sandbox.id().to_string();
                info!(
                    sandbox = %id,
                    orchestrator = %self.orchestrator.name(),
                    "Bound sandbox"
                );
                inner.sandbox = Some(sandbox);
                Some(id)
            }
            ContainerType::SandboxMember => {
                let sandbox = joined.ok_or_else(|| Error::NoActiveSandbox {
                    id: req.id.clone(),
                })?;

                self.orchestrator
                    .create_container(
                        Some(&sandbox),
                        ContainerParams {
                            id: &req.id,
                            bundle: &bundle_path,
                            spec: &spec,
                            disable_output,
                        },
                    )
                    .await?;
                Some(sandbox.id().to_string())
            }
            ContainerType::Standalone => {
                self.orchestrator
                    .create_container(
                        None,
                        ContainerParams {
                            id: &req.id,
                            bundle: &bundle_path,
                            spec: &spec,
                            disable_output,
                        },
                    )
                    .await?;
                None
            }
        };

        let record = ContainerRecord {
            id: req.id.clone(),
            sandbox_id,
            container_type,
            bundle: bundle_path,
            spec: Arc::new(spec),
            terminal: req.terminal,
            disable_output,
            created_at: chrono::Utc::now(),
        };
        inner.containers.insert(record.id.clone(), record.clone());

        info!(
            container = %record.id,
            kind = %record.container_type,
            sandbox = ?record.sandbox_id,
            "Registered container"
        );

        Ok(record)
    }

    fn decode_options(&self, req: &CreateRequest) -> Result<Option<DecodedOptions>> {
        req.options
            .as_ref()
            .map(|payload| self.options.decode(payload))
            .transpose()
    }
}

/// Checks the sandbox slot against the request type.
///
/// Returns the bound sandbox for a member, `None` otherwise.
fn check_sandbox_slot(
    inner: &ServiceInner,
    container_type: ContainerType,
    id: &str,
) -> Result<Option<SandboxRef>> {
    match (container_type, &inner.sandbox) {
        (ContainerType::SandboxRoot, Some(existing)) => Err(Error::DuplicateSandbox {
            existing: existing.id().to_string(),
        }),
        (ContainerType::SandboxMember, None) => Err(Error::NoActiveSandbox {
            id: id.to_string(),
        }),
        (ContainerType::SandboxMember, Some(sandbox)) => Ok(Some(sandbox.clone())),
        _ => Ok(None),
    }
}
