//! Create-request option payloads.
//!
//! Callers attach an `Any`-style payload: a type URL plus encoded bytes. The
//! set of schemas we understand lives in an explicit [`OptionsRegistry`]
//! populated at startup, so it can be enumerated and tested.
//!
//! Decoding yields a tagged [`DecodedOptions`]. A type URL nobody registered
//! decodes to [`DecodedOptions::Unrecognized`], which the create path treats
//! exactly like "no options". The default CRI handler sends runc options to
//! every runtime, and rejecting them would break that path.

use crate::constants::{RUNC_OPTIONS_TYPE_URL, RUNTIME_OPTIONS_TYPE_URL};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

// =============================================================================
// Payload Envelope
// =============================================================================

/// Type-tagged option payload as received on a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedPayload {
    /// Schema identifier (e.g. `runtimeoptions.v1.Options`).
    pub type_url: String,
    /// Encoded payload. JSON for every schema registered here.
    pub value: Vec<u8>,
}

impl TypedPayload {
    /// Creates a payload from a type URL and raw bytes.
    pub fn new(type_url: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            type_url: type_url.into(),
            value: value.into(),
        }
    }

    /// Encodes `value` as JSON under `type_url`.
    pub fn from_json<T: Serialize>(type_url: impl Into<String>, value: &T) -> Result<Self> {
        let type_url = type_url.into();
        let bytes = serde_json::to_vec(value).map_err(|e| Error::InvalidOptions {
            type_url: type_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(type_url, bytes))
    }
}

// =============================================================================
// Known Schemas
// =============================================================================

/// CRI runtime options: the one schema that can name a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeOptions {
    /// Runtime type the options were written for.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub type_url: String,
    /// Path to the runtime configuration file.
    #[serde(default, alias = "configPath")]
    pub config_path: String,
}

/// runc options. Decoded so they are recognized, otherwise unused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuncOptions {
    #[serde(default)]
    pub runtime: String,
    #[serde(default, alias = "runtimeRoot")]
    pub runtime_root: String,
    #[serde(default, alias = "criuPath")]
    pub criu_path: String,
    #[serde(default, alias = "systemdCgroup")]
    pub systemd_cgroup: bool,
}

/// Result of decoding a [`TypedPayload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedOptions {
    /// CRI runtime options.
    Runtime(RuntimeOptions),
    /// runc options.
    Runc(RuncOptions),
    /// A schema with no registered decoder.
    Unrecognized { type_url: String },
}

impl DecodedOptions {
    /// Returns the configuration path carried by the payload, if any.
    ///
    /// Only [`DecodedOptions::Runtime`] with a non-empty path yields one.
    pub fn config_path(&self) -> Option<&Path> {
        match self {
            Self::Runtime(opts) if !opts.config_path.is_empty() => {
                Some(Path::new(&opts.config_path))
            }
            _ => None,
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Decoder for one payload schema.
pub type Decoder = fn(&[u8]) -> std::result::Result<DecodedOptions, String>;

fn decode_runtime_options(bytes: &[u8]) -> std::result::Result<DecodedOptions, String> {
    serde_json::from_slice(bytes)
        .map(DecodedOptions::Runtime)
        .map_err(|e| e.to_string())
}

fn decode_runc_options(bytes: &[u8]) -> std::result::Result<DecodedOptions, String> {
    serde_json::from_slice(bytes)
        .map(DecodedOptions::Runc)
        .map_err(|e| e.to_string())
}

/// Mapping from type URL to decoder.
#[derive(Debug, Clone)]
pub struct OptionsRegistry {
    decoders: BTreeMap<String, Decoder>,
}

impl OptionsRegistry {
    /// Creates an empty registry. Every payload decodes as unrecognized.
    #[must_use]
    pub fn new() -> Self {
        Self {
            decoders: BTreeMap::new(),
        }
    }

    /// Creates a registry with the CRI runtime options and runc options
    /// schemas.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(RUNTIME_OPTIONS_TYPE_URL, decode_runtime_options);
        registry.register(RUNC_OPTIONS_TYPE_URL, decode_runc_options);
        registry
    }

    /// Registers (or replaces) the decoder for `type_url`.
    pub fn register(&mut self, type_url: impl Into<String>, decoder: Decoder) {
        self.decoders.insert(type_url.into(), decoder);
    }

    /// Returns true if `type_url` has a decoder.
    #[must_use]
    pub fn is_registered(&self, type_url: &str) -> bool {
        self.decoders.contains_key(type_url)
    }

    /// Lists registered type URLs in sorted order.
    #[must_use]
    pub fn type_urls(&self) -> Vec<&str> {
        self.decoders.keys().map(String::as_str).collect()
    }

    /// Decodes a payload.
    ///
    /// A leading `type.googleapis.com/` prefix on the type URL is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOptions`] only when a registered schema's
    /// bytes fail to decode. Unregistered schemas are not errors.
    pub fn decode(&self, payload: &TypedPayload) -> Result<DecodedOptions> {
        let key = normalize_type_url(&payload.type_url);

        let Some(decoder) = self.decoders.get(key) else {
            warn!(type_url = %payload.type_url, "Ignoring unrecognized options payload");
            return Ok(DecodedOptions::Unrecognized {
                type_url: payload.type_url.clone(),
            });
        };

        decoder(&payload.value).map_err(|reason| Error::InvalidOptions {
            type_url: payload.type_url.clone(),
            reason,
        })
    }
}

impl Default for OptionsRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn normalize_type_url(type_url: &str) -> &str {
    type_url
        .strip_prefix("type.googleapis.com/")
        .unwrap_or(type_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_registered() {
        let registry = OptionsRegistry::with_defaults();
        assert_eq!(
            registry.type_urls(),
            vec![RUNC_OPTIONS_TYPE_URL, RUNTIME_OPTIONS_TYPE_URL]
        );
        assert!(registry.is_registered(RUNTIME_OPTIONS_TYPE_URL));
    }

    #[test]
    fn test_decode_runtime_options_camel_case() {
        let registry = OptionsRegistry::with_defaults();
        let payload = TypedPayload::new(
            "type.googleapis.com/runtimeoptions.v1.Options",
            br#"{"configPath":"/etc/a.toml"}"#.to_vec(),
        );

        let decoded = registry.decode(&payload).unwrap();
        assert_eq!(decoded.config_path(), Some(Path::new("/etc/a.toml")));
    }

    #[test]
    fn test_runc_options_carry_no_config_path() {
        let registry = OptionsRegistry::with_defaults();
        let payload = TypedPayload::from_json(
            RUNC_OPTIONS_TYPE_URL,
            &RuncOptions {
                systemd_cgroup: true,
                ..Default::default()
            },
        )
        .unwrap();

        let decoded = registry.decode(&payload).unwrap();
        assert!(matches!(decoded, DecodedOptions::Runc(ref o) if o.systemd_cgroup));
        assert_eq!(decoded.config_path(), None);
    }

    #[test]
    fn test_unknown_type_is_unrecognized() {
        let registry = OptionsRegistry::with_defaults();
        let payload = TypedPayload::new("example.v1.Other", b"\x00\x01".to_vec());

        let decoded = registry.decode(&payload).unwrap();
        assert_eq!(
            decoded,
            DecodedOptions::Unrecognized {
                type_url: "example.v1.Other".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_registered_payload_is_error() {
        let registry = OptionsRegistry::with_defaults();
        let payload = TypedPayload::new(RUNTIME_OPTIONS_TYPE_URL, b"not json".to_vec());

        let err = registry.decode(&payload).unwrap_err();
        assert!(matches!(err, Error::InvalidOptions { .. }));
    }

    #[test]
    fn test_empty_config_path_is_absent() {
        let decoded = DecodedOptions::Runtime(RuntimeOptions::default());
        assert_eq!(decoded.config_path(), None);
    }
}
