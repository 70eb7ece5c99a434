//! OCI Runtime Spec types.
//!
//! Only the fields the create path reads are typed. Everything else in
//! `config.json` (hooks, seccomp, resources, ...) is kept verbatim in the
//! flattened `extra` maps, so a normalized spec handed to the orchestrator
//! still carries the full document.
//!
//! Ref: https://github.com/opencontainers/runtime-spec/blob/main/config.md

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

// =============================================================================
// Spec
// =============================================================================

/// OCI runtime specification parsed from a bundle's `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    pub oci_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<Root>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<Process>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<Mount>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux: Option<Linux>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Spec {
    /// Returns the annotation value for `key`, if present.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// Returns the Linux namespace descriptors (empty when `linux` is absent).
    pub fn namespaces(&self) -> &[Namespace] {
        self.linux
            .as_ref()
            .map(|l| l.namespaces.as_slice())
            .unwrap_or_default()
    }

    /// Mutable access to the namespace list, if the spec has a `linux` section.
    pub fn namespaces_mut(&mut self) -> Option<&mut Vec<Namespace>> {
        self.linux.as_mut().map(|l| &mut l.namespaces)
    }

    /// Returns true if the process descriptor asks for a terminal.
    pub fn process_terminal(&self) -> bool {
        self.process.as_ref().is_some_and(|p| p.terminal)
    }

    /// Checks the MUST / MUST NOT rules this shim depends on.
    ///
    /// - `ociVersion` is set
    /// - `root.path` is non-empty when `root` is present
    /// - `process.cwd` is absolute
    /// - no namespace type appears twice
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.oci_version.trim().is_empty() {
            return Err("ociVersion must be set".to_string());
        }

        if let Some(root) = &self.root {
            if root.path.is_empty() {
                return Err("root.path must not be empty".to_string());
            }
        }

        if let Some(process) = &self.process {
            if !process.cwd.starts_with('/') {
                return Err(format!(
                    "process.cwd must be an absolute path, got '{}'",
                    process.cwd
                ));
            }
        }

        let mut seen = HashSet::new();
        for ns in self.namespaces() {
            if !seen.insert(ns.ns_type) {
                return Err(format!("namespace type '{}' specified more than once", ns.ns_type));
            }
        }

        Ok(())
    }
}

/// OCI root filesystem config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Root {
    pub path: String,
    #[serde(default)]
    pub readonly: bool,
}

/// OCI process config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    #[serde(default)]
    pub terminal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<String>,
    pub cwd: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// OCI user config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub uid: u32,
    pub gid: u32,
}

/// OCI mount config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mount {
    pub destination: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mount_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

/// OCI Linux-specific config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Linux {
    #[serde(default)]
    pub namespaces: Vec<Namespace>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Namespaces
// =============================================================================

/// Linux namespace kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceType {
    Pid,
    Network,
    Mount,
    Ipc,
    Uts,
    User,
    Cgroup,
    Time,
}

impl std::fmt::Display for NamespaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pid => write!(f, "pid"),
            Self::Network => write!(f, "network"),
            Self::Mount => write!(f, "mount"),
            Self::Ipc => write!(f, "ipc"),
            Self::Uts => write!(f, "uts"),
            Self::User => write!(f, "user"),
            Self::Cgroup => write!(f, "cgroup"),
            Self::Time => write!(f, "time"),
        }
    }
}

/// OCI namespace descriptor.
///
/// A descriptor with a `path` joins an existing namespace; without one the
/// runtime creates a fresh namespace of that kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    #[serde(rename = "type")]
    pub ns_type: NamespaceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Namespace {
    /// Creates a descriptor without a path.
    pub fn new(ns_type: NamespaceType) -> Self {
        Self { ns_type, path: None }
    }

    /// Creates a descriptor joining the namespace at `path`.
    pub fn with_path(ns_type: NamespaceType, path: impl Into<String>) -> Self {
        Self {
            ns_type,
            path: Some(path.into()),
        }
    }

    /// Returns true if no path is set (absent or empty string).
    pub fn has_empty_path(&self) -> bool {
        self.path.as_deref().is_none_or(str::is_empty)
    }
}
