//! Labels and annotations shared by every child object

use std::collections::BTreeMap;

/// Label every child object carries, used as the pod selector
pub const NAME_LABEL: &str = "app.kubernetes.io/name";
const COMPONENT_LABEL: &str = "app.kubernetes.io/component";
const PART_OF_LABEL: &str = "app.kubernetes.io/part-of";

/// Keys in these domains (or their subdomains) belong to Kubernetes tooling
/// and are never copied from the parent onto children.
const RESERVED_DOMAINS: [&str; 2] = ["kubernetes.io", "k8s.io"];

/// Whether a label/annotation key is owned by Kubernetes itself
fn is_reserved_key(key: &str) -> bool {
    let Some((prefix, _)) = key.split_once('/') else {
        return false;
    };
    RESERVED_DOMAINS
        .iter()
        .any(|domain| prefix == *domain || prefix.ends_with(&format!(".{}", domain)))
}

/// Selector labels for the cluster's pods
pub fn label_selector(instance_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(NAME_LABEL.to_string(), instance_name.to_string())])
}

/// Labels for a child object: the parent's own labels (minus reserved keys)
/// plus the operator's identifying labels.
pub fn get_labels(
    instance_name: &str,
    instance_labels: Option<&BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    let mut labels: BTreeMap<String, String> = instance_labels
        .into_iter()
        .flatten()
        .filter(|(key, _)| !is_reserved_key(key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    labels.insert(NAME_LABEL.to_string(), instance_name.to_string());
    labels.insert(COMPONENT_LABEL.to_string(), "rabbitmq".to_string());
    labels.insert(PART_OF_LABEL.to_string(), "rabbitmq".to_string());
    labels
}

/// Merge the parent's annotations onto the existing ones of a child.
///
/// Annotations already on the child are kept; reserved-domain annotations
/// of the parent (e.g. `kubectl.kubernetes.io/last-applied-configuration`)
/// are dropped. Returns `None` when the result is empty so unset stays unset.
pub fn reconcile_and_filter_annotations(
    existing: Option<&BTreeMap<String, String>>,
    instance_annotations: Option<&BTreeMap<String, String>>,
) -> Option<BTreeMap<String, String>> {
    let mut merged = existing.cloned().unwrap_or_default();
    for (key, value) in instance_annotations.into_iter().flatten() {
        if !is_reserved_key(key) {
            merged.insert(key.clone(), value.clone());
        }
    }
    if merged.is_empty() {
        None
    } else {
        Some(merged)
    }
}

/// Merge labels onto the existing ones of a child, keeping foreign labels
pub fn reconcile_labels(
    existing: Option<&BTreeMap<String, String>>,
    desired: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = existing.cloned().unwrap_or_default();
    merged.extend(desired);
    merged
}
