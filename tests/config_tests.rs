//! Tests for runtime configuration resolution.
//!
//! Validates source precedence (request options, environment, search path),
//! TOML parsing, and the write-once cache.

use magikshim::config::load_runtime_config;
use magikshim::constants::{
    DEFAULT_SANDBOX_MEMORY_MIB, RUNC_OPTIONS_TYPE_URL, RUNTIME_OPTIONS_TYPE_URL,
};
use magikshim::{
    ConfigCache, ConfigResolver, ConfigSource, DecodedOptions, Error, OptionsRegistry,
    RuntimeConfig, TypedPayload,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

fn write_config(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

fn decode(payload: &TypedPayload) -> DecodedOptions {
    OptionsRegistry::with_defaults().decode(payload).unwrap()
}

fn request_options(path: &Path) -> DecodedOptions {
    decode(
        &TypedPayload::from_json(
            RUNTIME_OPTIONS_TYPE_URL,
            &serde_json::json!({ "configPath": path }),
        )
        .unwrap(),
    )
}

fn isolated_resolver(env: Option<PathBuf>) -> ConfigResolver {
    ConfigResolver::from_env()
        .with_env_override(env)
        .with_search_paths(vec![])
}

// =============================================================================
// Precedence Tests
// =============================================================================

#[test]
fn test_request_path_beats_environment() {
    let temp = TempDir::new().unwrap();
    let a = write_config(&temp, "a.toml", "[sandbox]\nvcpus = 2\n");
    let b = write_config(&temp, "b.toml", "[sandbox]\nvcpus = 3\n");

    let resolver = isolated_resolver(Some(b));
    let source = resolver.select(Some(&request_options(&a))).unwrap();

    assert_eq!(source, ConfigSource::Request(a));
}

#[test]
fn test_environment_used_without_options() {
    let temp = TempDir::new().unwrap();
    let b = write_config(&temp, "b.toml", "");

    let source = isolated_resolver(Some(b.clone())).select(None).unwrap();
    assert_eq!(source, ConfigSource::Environment(b));
}

#[test]
fn test_empty_config_path_falls_through() {
    let temp = TempDir::new().unwrap();
    let b = write_config(&temp, "b.toml", "");
    let options = decode(
        &TypedPayload::from_json(RUNTIME_OPTIONS_TYPE_URL, &serde_json::json!({})).unwrap(),
    );

    let source = isolated_resolver(Some(b.clone()))
        .select(Some(&options))
        .unwrap();
    assert_eq!(source, ConfigSource::Environment(b));
}

#[test]
fn test_runc_options_carry_no_config_path() {
    let temp = TempDir::new().unwrap();
    let b = write_config(&temp, "b.toml", "");
    let options = decode(
        &TypedPayload::from_json(
            RUNC_OPTIONS_TYPE_URL,
            &serde_json::json!({ "runtime": "runc", "systemd_cgroup": true }),
        )
        .unwrap(),
    );

    assert!(matches!(options, DecodedOptions::Runc(_)));
    assert_eq!(
        isolated_resolver(Some(b.clone())).select(Some(&options)).unwrap(),
        ConfigSource::Environment(b)
    );
}

#[test]
fn test_search_path_first_existing_file() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("missing.toml");
    let present = write_config(&temp, "present.toml", "");

    let resolver = isolated_resolver(None).with_search_paths(vec![missing, present.clone()]);
    assert_eq!(
        resolver.select(None).unwrap(),
        ConfigSource::Default(present)
    );
}

#[test]
fn test_no_source_at_all() {
    let err = isolated_resolver(None).select(None).unwrap_err();
    assert!(matches!(err, Error::ConfigLoad { .. }));
}

// =============================================================================
// Loading Tests
// =============================================================================

#[test]
fn test_load_fills_defaults() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "c.toml", "[runtime]\nenable_debug = true\n");

    let config = load_runtime_config(&path).unwrap();

    assert!(config.runtime.enable_debug);
    assert_eq!(config.sandbox.memory_mib, DEFAULT_SANDBOX_MEMORY_MIB);
    assert_eq!(config.source.as_deref(), Some(path.as_path()));
}

#[test]
fn test_load_rejects_bad_toml() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "c.toml", "[sandbox\nvcpus = ");

    let err = load_runtime_config(&path).unwrap_err();
    assert!(matches!(err, Error::ConfigLoad { path: ref p, .. } if p == &path));
}

#[test]
fn test_load_rejects_zero_vcpus() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "c.toml", "[sandbox]\nvcpus = 0\n");

    assert!(matches!(
        load_runtime_config(&path).unwrap_err(),
        Error::ConfigLoad { .. }
    ));
}

// =============================================================================
// Cache Tests
// =============================================================================

#[test]
fn test_resolve_populates_empty_cache() {
    let temp = TempDir::new().unwrap();
    let a = write_config(&temp, "a.toml", "[sandbox]\nvcpus = 2\n");
    let cache = ConfigCache::new();

    let resolved = isolated_resolver(None)
        .resolve(Some(&request_options(&a)), &cache)
        .unwrap();

    assert!(resolved.cached);
    assert_eq!(cache.get().unwrap().sandbox.vcpus, 2);
}

#[test]
fn test_resolve_never_replaces_seeded_cache() {
    let temp = TempDir::new().unwrap();
    let a = write_config(&temp, "a.toml", "[sandbox]\nvcpus = 2\n");
    let seeded = RuntimeConfig::from_toml("[sandbox]\nvcpus = 8\n").unwrap();
    let cache = ConfigCache::seeded(seeded);

    let resolved = isolated_resolver(None)
        .resolve(Some(&request_options(&a)), &cache)
        .unwrap();

    assert!(!resolved.cached);
    assert_eq!(resolved.config.sandbox.vcpus, 2, "loaded config is still returned");
    assert_eq!(cache.get().unwrap().sandbox.vcpus, 8);
}

#[test]
fn test_cache_first_writer_wins() {
    let cache = ConfigCache::new();
    let first = Arc::new(RuntimeConfig::from_toml("[sandbox]\nvcpus = 1\n").unwrap());
    let second = Arc::new(RuntimeConfig::from_toml("[sandbox]\nvcpus = 2\n").unwrap());

    assert!(cache.set_if_unset(first));
    assert!(!cache.set_if_unset(second));
    assert_eq!(cache.get().unwrap().sandbox.vcpus, 1);
}

#[test]
fn test_failed_resolve_leaves_cache_empty() {
    let temp = TempDir::new().unwrap();
    let cache = ConfigCache::new();

    let result = isolated_resolver(None)
        .resolve(Some(&request_options(&temp.path().join("missing.toml"))), &cache);

    assert!(result.is_err());
    assert!(cache.get().is_none());
}
