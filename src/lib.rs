//! # magikshim
//!
//! **Create path of a pod-aware OCI shim**
//!
//! This crate decides what a "create" request from the orchestration layer
//! actually means and hands the answer to a sandbox orchestrator: either
//! boot a new sandbox, or add a container to the sandbox this shim already
//! drives. Building sandboxes is not done here; the orchestrator is an
//! injected capability ([`SandboxOrchestrator`]).
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          magikshim                                  │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  CreateRequest { id, bundle, options, terminal }                    │
//! │        │                                                            │
//! │        ▼                                                            │
//! │  ┌──────────────┐   ┌───────────────┐   ┌──────────────┐            │
//! │  │   bundle     │──►│  normalize    │──►│  classify    │            │
//! │  │ config.json  │   │ drop pid ns   │   │ CRI / CRI-O  │            │
//! │  │  → Spec      │   │ inject netns  │   │ annotations  │            │
//! │  └──────────────┘   └───────────────┘   └──────┬───────┘            │
//! │                                                │                    │
//! │  ┌─────────────────────────────────────────────▼──────────────┐     │
//! │  │                  CreationCoordinator                        │     │
//! │  │  ServiceState (one sandbox slot, registry, config cache)    │     │
//! │  │  ConfigResolver (options > env > search path)               │     │
//! │  └─────────────────────────────┬──────────────────────────────┘     │
//! ├────────────────────────────────┼────────────────────────────────────┤
//! │                   SandboxOrchestrator (injected)                    │
//! │        create_sandbox(..)              create_container(..)         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Service Lifecycle
//!
//! ```text
//!   ┌─────────┐  create(sandbox root)  ┌─────────┐
//!   │  empty  │ ─────────────────────► │  bound  │ ◄─┐ create(member)
//!   └─────────┘                        └─────────┘ ──┘
//!        │ create(member) → NoActiveSandbox (BUG)     │ create(root) → DuplicateSandbox
//! ```
//!
//! Only an external teardown ([`ServiceState::unbind_sandbox`]) returns a
//! service to `empty`.
//!
//! # Example
//!
//! ```rust,ignore
//! use magikshim::{CreateRequest, CreationCoordinator, ServiceState};
//! use std::sync::Arc;
//!
//! let state = Arc::new(ServiceState::new());
//! let coordinator = CreationCoordinator::new(state, orchestrator);
//!
//! let req = CreateRequest::new("pod-1", "/run/containerd/bundles/pod-1");
//! let record = coordinator.create(&req, "/var/run/netns/cni-1234").await?;
//! assert!(record.is_sandbox());
//! ```

pub mod bundle;
pub mod classify;
pub mod config;
pub mod constants;
pub mod create;
pub mod error;
pub mod normalize;
pub mod options;
pub mod orchestrator;
pub mod record;
pub mod service;
pub mod spec;

// Re-exports
pub use bundle::{LoadedBundle, load_bundle};
pub use classify::{ContainerType, classify};
pub use config::{ConfigCache, ConfigResolver, ConfigSource, ResolvedConfig, RuntimeConfig};
pub use create::{CreateRequest, CreationCoordinator, output_disabled};
pub use error::{Error, Result};
pub use normalize::normalize_spec;
pub use options::{DecodedOptions, OptionsRegistry, TypedPayload};
pub use orchestrator::{ContainerParams, Sandbox, SandboxOrchestrator, SandboxParams, SandboxRef};
pub use record::ContainerRecord;
pub use service::ServiceState;
pub use spec::{Namespace, NamespaceType, Spec};
