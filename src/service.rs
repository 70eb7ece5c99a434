//! Per-service state.
//!
//! One shim service drives at most one sandbox. The state object is passed
//! explicitly to every operation rather than living in a global.
//!
//! ```text
//!   ServiceState
//!   ├── Mutex ─┬── sandbox:    Option<SandboxRef>   empty ──► bound (once)
//!   │          └── containers: id → ContainerRecord
//!   └── config:    ConfigCache                       write-once
//! ```
//!
//! ## Locking
//!
//! The mutex is a `tokio` mutex because the create path holds it across the
//! orchestrator call. Holding it for the whole request is what makes the
//! duplicate-sandbox and no-sandbox checks meaningful: no other request can
//! observe or change the slot between the check and the bind.

use crate::config::{ConfigCache, RuntimeConfig};
use crate::orchestrator::SandboxRef;
use crate::record::ContainerRecord;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

/// Mutable part of the service, guarded by the service mutex.
#[derive(Debug, Default)]
pub(crate) struct ServiceInner {
    /// Bound sandbox. Set once by the first successful sandbox create.
    pub(crate) sandbox: Option<SandboxRef>,
    /// Container ID → record.
    pub(crate) containers: HashMap<String, ContainerRecord>,
}

/// State shared by every request to one shim service.
#[derive(Debug, Default)]
pub struct ServiceState {
    inner: Mutex<ServiceInner>,
    config: ConfigCache,
}

impl ServiceState {
    /// Creates an empty service: no sandbox, no containers, no config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service with a pre-seeded configuration.
    ///
    /// The seeded configuration is never replaced by later resolutions.
    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Mutex::default(),
            config: ConfigCache::seeded(config),
        }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, ServiceInner> {
        self.inner.lock().await
    }

    /// Returns the configuration cache.
    pub fn config_cache(&self) -> &ConfigCache {
        &self.config
    }

    /// Returns the cached configuration, if any.
    pub fn config(&self) -> Option<Arc<RuntimeConfig>> {
        self.config.get()
    }

    /// Returns the bound sandbox, if any.
    pub async fn sandbox(&self) -> Option<SandboxRef> {
        self.lock().await.sandbox.clone()
    }

    /// Returns the bound sandbox's ID, if any.
    pub async fn sandbox_id(&self) -> Option<String> {
        self.lock().await.sandbox.as_ref().map(|s| s.id().to_string())
    }

    /// Returns a copy of the record for `id`.
    pub async fn container(&self, id: &str) -> Option<ContainerRecord> {
        self.lock().await.containers.get(id).cloned()
    }

    /// Lists registered container IDs, sorted.
    pub async fn container_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().await.containers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns the number of registered containers.
    pub async fn container_count(&self) -> usize {
        self.lock().await.containers.len()
    }

    // =========================================================================
    // Teardown hooks
    // =========================================================================

    /// Removes a record. Called by the delete path.
    pub async fn remove_container(&self, id: &str) -> Option<ContainerRecord> {
        self.lock().await.containers.remove(id)
    }

    /// Clears the sandbox slot. Called once the sandbox has been torn down.
    pub async fn unbind_sandbox(&self) -> Option<SandboxRef> {
        let sandbox = self.lock().await.sandbox.take();
        if let Some(sb) = &sandbox {
            info!(sandbox = %sb.id(), "Unbound sandbox");
        }
        sandbox
    }
}
