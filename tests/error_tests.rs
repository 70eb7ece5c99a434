//! Tests for error types.
//!
//! Validates display formatting, orchestrator pass-through, and the
//! bug/non-bug split.

use magikshim::Error;
use std::path::PathBuf;

// =============================================================================
// Request Error Tests
// =============================================================================

#[test]
fn test_invalid_container_id_display() {
    let err = Error::InvalidContainerId {
        id: "bad/../id".to_string(),
        reason: "contains invalid characters".to_string(),
    };
    let msg = format!("{}", err);

    assert!(msg.contains("bad/../id"), "should include container ID");
    assert!(
        msg.contains("contains invalid characters"),
        "should include reason"
    );
}

#[test]
fn test_invalid_bundle_display() {
    let err = Error::InvalidBundle {
        path: PathBuf::from("/run/bundles/c1"),
        reason: "not a directory".to_string(),
    };
    let msg = format!("{}", err);

    assert!(msg.contains("/run/bundles/c1"), "should include path");
    assert!(msg.contains("not a directory"), "should include reason");
}

#[test]
fn test_spec_parse_display() {
    let err = Error::SpecParse {
        path: PathBuf::from("/run/bundles/c1/config.json"),
        reason: "expected value at line 1".to_string(),
    };
    assert!(err.to_string().contains("config.json"));
}

#[test]
fn test_invalid_options_display() {
    let err = Error::InvalidOptions {
        type_url: "runtimeoptions.v1.Options".to_string(),
        reason: "trailing characters".to_string(),
    };
    assert!(err.to_string().contains("runtimeoptions.v1.Options"));
}

#[test]
fn test_classification_display() {
    let err = Error::Classification {
        key: "io.kubernetes.cri.container-type".to_string(),
        value: "podsandbox".to_string(),
    };
    let msg = err.to_string();

    assert!(msg.contains("podsandbox"), "should include value");
    assert!(msg.contains("io.kubernetes.cri.container-type"), "should include key");
}

// =============================================================================
// Sandbox State Error Tests
// =============================================================================

#[test]
fn test_duplicate_sandbox_display() {
    let err = Error::DuplicateSandbox {
        existing: "pod-1".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "cannot create another sandbox in sandbox: pod-1"
    );
}

#[test]
fn test_no_active_sandbox_flagged_as_bug() {
    let err = Error::NoActiveSandbox {
        id: "c1".to_string(),
    };
    let msg = err.to_string();

    assert!(msg.starts_with("BUG:"), "should be marked as a bug");
    assert!(msg.contains("c1"), "should include container ID");
    assert!(err.is_bug());
}

#[test]
fn test_container_already_exists_display() {
    let err = Error::ContainerAlreadyExists("existing-container".to_string());
    let msg = format!("{}", err);

    assert!(msg.contains("existing-container"));
    assert!(msg.contains("already exists"));
}

#[test]
fn test_other_errors_are_not_bugs() {
    let errors = [
        Error::DuplicateSandbox {
            existing: "pod-1".to_string(),
        },
        Error::ContainerAlreadyExists("c1".to_string()),
        Error::ConfigLoad {
            path: PathBuf::from("/etc/magikshim/configuration.toml"),
            reason: "missing".to_string(),
        },
        Error::Internal("oops".to_string()),
    ];

    for err in &errors {
        assert!(!err.is_bug(), "{err} should not be a bug");
    }
}

#[test]
fn test_resource_exhausted_display() {
    let err = Error::ResourceExhausted("maximum container limit reached (1024)".to_string());
    let msg = format!("{}", err);

    assert!(
        msg.contains("resource exhausted"),
        "should indicate resource exhausted"
    );
    assert!(msg.contains("1024"), "should include limit");
    assert!(!err.is_bug());
}

// =============================================================================
// Pass-through Tests
// =============================================================================

#[test]
fn test_orchestrator_error_is_transparent() {
    let err: Error = anyhow::anyhow!("hypervisor refused to start").into();

    assert!(matches!(err, Error::Orchestrator(_)));
    assert_eq!(err.to_string(), "hypervisor refused to start");
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync + 'static>() {}
    assert_send_sync::<Error>();
}
