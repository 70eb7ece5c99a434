//! Runtime configuration.
//!
//! The configuration file is TOML. Which file is loaded depends on three
//! sources, highest precedence first:
//!
//! ```text
//! 1. options payload   runtimeoptions.v1.Options { config_path }
//! 2. environment       MAGIKSHIM_CONF_FILE
//! 3. search path       /etc/magikshim/configuration.toml
//!                      /usr/share/defaults/magikshim/configuration.toml
//!                      <user config dir>/magikshim/configuration.toml
//! ```
//!
//! ## Caching
//!
//! A service keeps the first configuration it resolves in a [`ConfigCache`]
//! for the rest of its life. Later resolutions still load and return their
//! file but never replace the cached one. A cache seeded up front (tests do
//! this) therefore wins over anything loaded afterwards.

use crate::constants::{
    CONFIG_ENV_VAR, CONFIG_FILENAME, DEFAULT_SANDBOX_MEMORY_MIB, DEFAULT_SANDBOX_VCPUS,
    DEFAULTS_CONFIG_PATH, MIN_SANDBOX_MEMORY_MIB, SYSTEM_CONFIG_PATH, USER_CONFIG_SUBDIR,
};
use crate::error::{Error, Result};
use crate::options::DecodedOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

// =============================================================================
// Default value functions for serde
// =============================================================================

const fn default_vcpus() -> u32 {
    DEFAULT_SANDBOX_VCPUS
}

const fn default_memory_mib() -> u32 {
    DEFAULT_SANDBOX_MEMORY_MIB
}

// =============================================================================
// Configuration Types
// =============================================================================

/// Effective runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Shim behavior.
    pub runtime: RuntimeSection,
    /// Sizing handed to the orchestrator when creating a sandbox.
    pub sandbox: SandboxSection,
    /// Sandbox factory (template) settings.
    pub factory: FactorySection,
    /// File this configuration was loaded from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// `[runtime]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    /// Emit debug-level logs.
    pub enable_debug: bool,
    /// Do not create a network namespace for the sandbox.
    pub disable_new_netns: bool,
    /// Place only the sandbox (not its containers) in the pod cgroup.
    pub sandbox_cgroup_only: bool,
}

/// `[sandbox]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSection {
    /// Number of vCPUs at boot.
    #[serde(default = "default_vcpus")]
    pub vcpus: u32,
    /// Memory at boot in MiB.
    #[serde(default = "default_memory_mib")]
    pub memory_mib: u32,
    /// Extra kernel command-line parameters.
    pub kernel_params: String,
}

impl Default for SandboxSection {
    fn default() -> Self {
        Self {
            vcpus: default_vcpus(),
            memory_mib: default_memory_mib(),
            kernel_params: String::new(),
        }
    }
}

/// `[factory]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorySection {
    /// Clone new sandboxes from a pre-booted template.
    pub enable_template: bool,
}

impl RuntimeConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error string if `vcpus` is 0 or `memory_mib` is below
    /// `MIN_SANDBOX_MEMORY_MIB`.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.sandbox.vcpus == 0 {
            return Err("sandbox.vcpus must be at least 1".to_string());
        }

        if self.sandbox.memory_mib < MIN_SANDBOX_MEMORY_MIB {
            return Err(format!(
                "sandbox.memory_mib ({}) must be >= {}",
                self.sandbox.memory_mib, MIN_SANDBOX_MEMORY_MIB
            ));
        }

        Ok(())
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml(text: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(text).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }
}

/// Loads and validates the configuration file at `path`.
///
/// # Errors
///
/// Returns [`Error::ConfigLoad`] on I/O, TOML, or validation failure.
pub fn load_runtime_config(path: &Path) -> Result<RuntimeConfig> {
    let load_err = |reason: String| Error::ConfigLoad {
        path: path.to_path_buf(),
        reason,
    };

    let text = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
    let mut config = RuntimeConfig::from_toml(&text).map_err(load_err)?;
    config.source = Some(path.to_path_buf());
    Ok(config)
}

/// Returns the built-in search path, in lookup order.
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(SYSTEM_CONFIG_PATH),
        PathBuf::from(DEFAULTS_CONFIG_PATH),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(USER_CONFIG_SUBDIR).join(CONFIG_FILENAME));
    }
    paths
}

// =============================================================================
// Cache
// =============================================================================

/// Write-once holder for a service's configuration.
///
/// The first successful `set_if_unset` wins; later calls are no-ops.
#[derive(Debug, Default)]
pub struct ConfigCache {
    inner: OnceLock<Arc<RuntimeConfig>>,
}

impl ConfigCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache already holding `config`.
    #[must_use]
    pub fn seeded(config: RuntimeConfig) -> Self {
        let cache = Self::new();
        let _ = cache.inner.set(Arc::new(config));
        cache
    }

    /// Returns the cached configuration, if any.
    pub fn get(&self) -> Option<Arc<RuntimeConfig>> {
        self.inner.get().cloned()
    }

    /// Stores `config` if nothing is cached yet.
    ///
    /// Returns true if this call populated the cache.
    pub fn set_if_unset(&self, config: Arc<RuntimeConfig>) -> bool {
        self.inner.set(config).is_ok()
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Where a resolved configuration path came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Path from the request's options payload.
    Request(PathBuf),
    /// Path from `MAGIKSHIM_CONF_FILE`.
    Environment(PathBuf),
    /// First existing file on the search path.
    Default(PathBuf),
}

impl ConfigSource {
    /// Returns the chosen path.
    pub fn path(&self) -> &Path {
        match self {
            Self::Request(p) | Self::Environment(p) | Self::Default(p) => p,
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request(p) => write!(f, "request options ({})", p.display()),
            Self::Environment(p) => write!(f, "{} ({})", CONFIG_ENV_VAR, p.display()),
            Self::Default(p) => write!(f, "search path ({})", p.display()),
        }
    }
}

/// Outcome of a resolution.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Which precedence level supplied the path.
    pub source: ConfigSource,
    /// The configuration just loaded from `source`.
    pub config: Arc<RuntimeConfig>,
    /// True if this resolution populated the cache.
    pub cached: bool,
}

/// Resolves the runtime configuration for a create request.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    env_override: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
}

impl ConfigResolver {
    /// Creates a resolver reading the override from `MAGIKSHIM_CONF_FILE`.
    ///
    /// The variable is read once, here. An empty value counts as unset.
    #[must_use]
    pub fn from_env() -> Self {
        let env_override = std::env::var_os(CONFIG_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Self {
            env_override,
            search_paths: default_search_paths(),
        }
    }

    /// Replaces the environment override.
    #[must_use]
    pub fn with_env_override(mut self, path: Option<PathBuf>) -> Self {
        self.env_override = path.filter(|p| !p.as_os_str().is_empty());
        self
    }

    /// Replaces the default search path.
    #[must_use]
    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    /// Returns the environment override, if set.
    pub fn env_override(&self) -> Option<&Path> {
        self.env_override.as_deref()
    }

    /// Picks the configuration path by precedence without loading it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigLoad`] if no source names a path and no file on
    /// the search path exists.
    pub fn select(&self, options: Option<&DecodedOptions>) -> Result<ConfigSource> {
        if let Some(path) = options.and_then(DecodedOptions::config_path) {
            return Ok(ConfigSource::Request(path.to_path_buf()));
        }

        if let Some(path) = &self.env_override {
            return Ok(ConfigSource::Environment(path.clone()));
        }

        self.search_paths
            .iter()
            .find(|p| p.is_file())
            .map(|p| ConfigSource::Default(p.clone()))
            .ok_or_else(|| Error::ConfigLoad {
                path: self.search_paths.first().cloned().unwrap_or_default(),
                reason: format!(
                    "no configuration file found in search path {:?}",
                    self.search_paths
                ),
            })
    }

    /// Selects, loads, and offers the configuration to `cache`.
    ///
    /// The loaded configuration is always returned. It becomes the cached
    /// one only if the cache was empty.
    pub fn resolve(
        &self,
        options: Option<&DecodedOptions>,
        cache: &ConfigCache,
    ) -> Result<ResolvedConfig> {
        let source = self.select(options)?;
        debug!(source = %source, "Selected runtime configuration");

        let config = Arc::new(load_runtime_config(source.path())?);
        let cached = cache.set_if_unset(config.clone());
        if !cached {
            warn!(
                path = %source.path().display(),
                "Runtime configuration already cached, keeping existing"
            );
        }

        Ok(ResolvedConfig {
            source,
            config,
            cached,
        })
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::from_env()
    }
}
