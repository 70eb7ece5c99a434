//! Spec normalization.
//!
//! Reconciles what the orchestration layer put in the spec with what the
//! sandbox layer can honor. Two rewrites, always in this order:
//!
//! 1. Drop every PID namespace descriptor. Shared PID namespaces are broken
//!    in the sandbox agent, so pods run with per-container PID namespaces
//!    until that is fixed, whatever the spec asked for.
//! 2. Give every network namespace descriptor without a path the network
//!    namespace handle of this create call.
//!
//! The network namespace belongs to the sandbox as a whole. The sandbox
//! layer ignores the field for containers joining a running sandbox, so the
//! injected path only matters when the sandbox itself is created.

use crate::spec::{NamespaceType, Spec};
use tracing::debug;

/// Removes every namespace descriptor of kind `ns_type`.
///
/// Returns the number of descriptors removed.
pub fn remove_namespace(spec: &mut Spec, ns_type: NamespaceType) -> usize {
    let Some(namespaces) = spec.namespaces_mut() else {
        return 0;
    };

    let before = namespaces.len();
    namespaces.retain(|ns| ns.ns_type != ns_type);
    before - namespaces.len()
}

/// Sets `netns` on every network namespace descriptor lacking a path.
///
/// Descriptors with a path already set are left alone. Returns the number
/// of descriptors updated.
pub fn inject_network_namespace(spec: &mut Spec, netns: &str) -> usize {
    let Some(namespaces) = spec.namespaces_mut() else {
        return 0;
    };

    let mut updated = 0;
    for ns in namespaces
        .iter_mut()
        .filter(|ns| ns.ns_type == NamespaceType::Network && ns.has_empty_path())
    {
        ns.path = Some(netns.to_string());
        updated += 1;
    }
    updated
}

/// Applies both rewrites in place. Total over any parsed spec.
pub fn normalize_spec(spec: &mut Spec, netns: &str) {
    let removed = remove_namespace(spec, NamespaceType::Pid);
    let injected = inject_network_namespace(spec, netns);

    debug!(
        pid_removed = removed,
        netns_injected = injected,
        netns = %netns,
        "Normalized namespaces"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{Linux, Namespace};

    fn spec_with(namespaces: Vec<Namespace>) -> Spec {
        let mut spec: Spec =
            serde_json::from_value(serde_json::json!({ "ociVersion": "1.0.2" })).unwrap();
        spec.linux = Some(Linux {
            namespaces,
            ..Default::default()
        });
        spec
    }

    #[test]
    fn test_all_pid_namespaces_removed() {
        let mut spec = spec_with(vec![
            Namespace::new(NamespaceType::Pid),
            Namespace::new(NamespaceType::Ipc),
            Namespace::with_path(NamespaceType::Pid, "/proc/9/ns/pid"),
        ]);

        normalize_spec(&mut spec, "/var/run/netns/cni-1");

        assert!(spec.namespaces().iter().all(|ns| ns.ns_type != NamespaceType::Pid));
        assert_eq!(spec.namespaces().len(), 1);
    }

    #[test]
    fn test_empty_network_path_filled() {
        let mut spec = spec_with(vec![
            Namespace::new(NamespaceType::Network),
            Namespace::with_path(NamespaceType::Network, ""),
        ]);

        normalize_spec(&mut spec, "/var/run/netns/cni-1");

        for ns in spec.namespaces() {
            assert_eq!(ns.path.as_deref(), Some("/var/run/netns/cni-1"));
        }
    }

    #[test]
    fn test_preset_network_path_untouched() {
        let mut spec = spec_with(vec![
            Namespace::with_path(NamespaceType::Network, "/proc/1/ns/net"),
            Namespace::new(NamespaceType::Uts),
        ]);

        normalize_spec(&mut spec, "/var/run/netns/cni-1");

        assert_eq!(spec.namespaces()[0].path.as_deref(), Some("/proc/1/ns/net"));
        assert_eq!(spec.namespaces()[1].path, None);
    }

    #[test]
    fn test_spec_without_linux_section() {
        let mut spec = spec_with(vec![]);
        spec.linux = None;

        normalize_spec(&mut spec, "/var/run/netns/cni-1");
        assert!(spec.namespaces().is_empty());
    }
}
