//! Custom Resource Definitions for the RabbitMQ Kubernetes Operator
//!
//! This module defines the `RabbitmqCluster` CRD that represents a clustered
//! RabbitMQ deployment in Kubernetes.

use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::{CustomResource, ResourceExt};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use validator::{Validate, ValidationError};

/// Regex for validating Kubernetes resource quantities (e.g., "10Gi", ".5Gi", "500m", "1e3")
static QUANTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([KMGTPE]i|[numkMGTPE]|[eE][+-]?[0-9]+)?$")
        .unwrap()
});

/// Regex for validating Kubernetes names (RFC 1123 subdomain)
static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());

/// Regex for RabbitMQ plugin identifiers (e.g. "rabbitmq_web_mqtt")
static PLUGIN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+$").unwrap());

/// Upper bound for each free-form configuration overlay
const MAX_CONFIG_BYTES: usize = 100_000;

/// Validate a Kubernetes resource quantity string
fn validate_quantity(value: &str) -> Result<(), ValidationError> {
    if QUANTITY_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_quantity")
            .with_message(format!("'{}' is not a valid Kubernetes quantity", value).into()))
    }
}

/// Validate a container image reference
fn validate_image(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(()); // Empty is allowed (uses default)
    }
    if value.len() > 255 {
        return Err(ValidationError::new("image_too_long")
            .with_message("image reference exceeds 255 characters".into()));
    }
    if value.contains("..") || value.starts_with('/') || value.starts_with('-') {
        return Err(ValidationError::new("invalid_image")
            .with_message(format!("'{}' is not a valid container image", value).into()));
    }
    Ok(())
}

/// Validate a Kubernetes name (RFC 1123 subdomain)
fn validate_k8s_name(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(()); // Empty is allowed for optional fields
    }
    if value.len() > 63 {
        return Err(
            ValidationError::new("name_too_long").with_message("name exceeds 63 characters".into())
        );
    }
    if !NAME_REGEX.is_match(value) {
        return Err(ValidationError::new("invalid_name").with_message(
            format!("'{}' is not a valid Kubernetes name (RFC 1123)", value).into(),
        ));
    }
    Ok(())
}

fn validate_plugins(plugins: &[String]) -> Result<(), ValidationError> {
    if plugins.len() > 100 {
        return Err(ValidationError::new("too_many_plugins")
            .with_message("maximum 100 additional plugins allowed".into()));
    }
    for plugin in plugins {
        if !PLUGIN_REGEX.is_match(plugin) {
            return Err(ValidationError::new("invalid_plugin")
                .with_message(format!("'{}' is not a valid plugin name", plugin).into()));
        }
    }
    Ok(())
}

fn validate_config_size(value: &str) -> Result<(), ValidationError> {
    if value.len() > MAX_CONFIG_BYTES {
        return Err(ValidationError::new("config_too_large")
            .with_message(format!("configuration exceeds {} bytes", MAX_CONFIG_BYTES).into()));
    }
    Ok(())
}

fn validate_service_type(value: &str) -> Result<(), ValidationError> {
    match value {
        "ClusterIP" | "NodePort" | "LoadBalancer" => Ok(()),
        _ => Err(ValidationError::new("invalid_service_type")
            .with_message("service type must be ClusterIP, NodePort or LoadBalancer".into())),
    }
}

/// RabbitmqCluster custom resource definition
///
/// Represents a clustered RabbitMQ deployment. The operator watches these
/// resources and converges the child objects (configuration, secrets,
/// services, RBAC and the StatefulSet) towards the desired state.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema, Validate)]
#[kube(
    group = "rabbitmq.com",
    version = "v1beta1",
    kind = "RabbitmqCluster",
    plural = "rabbitmqclusters",
    shortname = "rmq",
    namespaced,
    status = "RabbitmqClusterStatus",
    printcolumn = r#"{"name":"Replicas", "type":"integer", "jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.clusterStatus"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RabbitmqClusterSpec {
    /// Number of RabbitMQ nodes (0-100)
    #[serde(default = "default_replicas")]
    #[validate(range(min = 0, max = 100, message = "replicas must be between 0 and 100"))]
    pub replicas: i32,

    /// Container image (overrides the operator default)
    #[serde(default)]
    #[validate(custom(function = "validate_image"))]
    pub image: Option<String>,

    /// Name of an existing image pull secret in the cluster namespace.
    /// When empty, the operator's default pull secret is copied in.
    #[serde(default)]
    #[validate(custom(function = "validate_k8s_name"))]
    pub image_pull_secret: Option<String>,

    /// Client-facing service settings
    #[serde(default)]
    #[validate(nested)]
    pub service: RabbitmqServiceSpec,

    /// Persistent storage settings
    #[serde(default)]
    #[validate(nested)]
    pub persistence: PersistenceSpec,

    /// Resource requirements (CPU, memory)
    #[serde(default)]
    #[schemars(skip)]
    pub resources: Option<ResourceRequirements>,

    /// RabbitMQ configuration overlays and plugins
    #[serde(default)]
    #[validate(nested)]
    pub rabbitmq: RabbitmqConfigSpec,

    /// TLS configuration
    #[serde(default)]
    #[validate(nested)]
    pub tls: TlsSpec,
}

/// Settings for the `<name>-ingress` service
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RabbitmqServiceSpec {
    /// Service type (ClusterIP, NodePort, LoadBalancer)
    #[serde(default, rename = "type")]
    #[validate(custom(function = "validate_service_type"))]
    pub service_type: Option<String>,

    /// Annotations added to the ingress service
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// Persistence specification for broker data
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceSpec {
    /// Storage class name (empty uses the operator default)
    #[serde(default)]
    #[validate(custom(function = "validate_k8s_name"))]
    pub storage_class_name: Option<String>,

    /// Requested storage size (e.g., "10Gi")
    #[serde(default)]
    #[validate(custom(function = "validate_quantity"))]
    pub storage: Option<String>,
}

/// RabbitMQ-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RabbitmqConfigSpec {
    /// Plugins enabled in addition to the built-in ones
    #[serde(default)]
    #[validate(custom(function = "validate_plugins"))]
    pub additional_plugins: Vec<String>,

    /// Extra `rabbitmq.conf` entries, merged over the generated configuration
    #[serde(default)]
    #[validate(custom(function = "validate_config_size"))]
    pub additional_config: String,

    /// Contents of `advanced.config` (Erlang terms)
    #[serde(default)]
    #[validate(custom(function = "validate_config_size"))]
    pub advanced_config: String,

    /// Contents of `rabbitmq-env.conf`
    #[serde(default)]
    #[validate(custom(function = "validate_config_size"))]
    pub env_config: String,
}

/// TLS configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TlsSpec {
    /// Secret holding `tls.crt` and `tls.key`; enables TLS when set
    #[serde(default)]
    #[validate(custom(function = "validate_k8s_name"))]
    pub secret_name: Option<String>,

    /// Secret holding `ca.crt`; enables mutual TLS when set alongside `secretName`
    #[serde(default)]
    #[validate(custom(function = "validate_k8s_name"))]
    pub ca_secret_name: Option<String>,

    /// Only expose TLS listeners
    #[serde(default, rename = "disableNonTLSListeners")]
    pub disable_non_tls_listeners: bool,
}

/// Status of a RabbitmqCluster
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RabbitmqClusterStatus {
    /// Coarse lifecycle marker; "created" once a reconcile pass completed
    #[serde(default)]
    pub cluster_status: String,

    /// Conditions describing cluster state
    #[serde(default)]
    pub conditions: Vec<ClusterCondition>,

    /// Generation observed by the last successful pass
    #[serde(default)]
    pub observed_generation: i64,
}

/// Condition describing an aspect of cluster state
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCondition {
    /// Type of condition
    #[serde(rename = "type")]
    pub condition_type: String,

    /// Status of the condition (True, False, Unknown)
    pub status: String,

    /// Reason for the condition
    pub reason: Option<String>,

    /// Human-readable message
    pub message: Option<String>,

    /// Last transition time
    pub last_transition_time: Option<String>,
}

fn default_replicas() -> i32 {
    1
}

impl Default for RabbitmqClusterSpec {
    fn default() -> Self {
        Self {
            replicas: default_replicas(),
            image: None,
            image_pull_secret: None,
            service: RabbitmqServiceSpec::default(),
            persistence: PersistenceSpec::default(),
            resources: None,
            rabbitmq: RabbitmqConfigSpec::default(),
            tls: TlsSpec::default(),
        }
    }
}

impl RabbitmqClusterSpec {
    /// TLS is on when a certificate secret is referenced
    pub fn tls_enabled(&self) -> bool {
        self.tls
            .secret_name
            .as_deref()
            .is_some_and(|name| !name.is_empty())
    }

    /// Mutual TLS needs both TLS and a CA secret
    pub fn mutual_tls_enabled(&self) -> bool {
        self.tls_enabled()
            && self
                .tls
                .ca_secret_name
                .as_deref()
                .is_some_and(|name| !name.is_empty())
    }

    pub fn disable_non_tls_listeners(&self) -> bool {
        self.tls.disable_non_tls_listeners
    }

    pub fn additional_plugin_enabled(&self, plugin: &str) -> bool {
        self.rabbitmq.additional_plugins.iter().any(|p| p == plugin)
    }

    /// Declared memory limit, if any
    pub fn memory_limit(&self) -> Option<&Quantity> {
        self.resources
            .as_ref()
            .and_then(|r| r.limits.as_ref())
            .and_then(|limits| limits.get("memory"))
    }

    /// Image pull secret named in the spec, ignoring empty strings
    pub fn image_pull_secret(&self) -> Option<&str> {
        self.image_pull_secret
            .as_deref()
            .filter(|name| !name.is_empty())
    }
}

impl RabbitmqCluster {
    /// Name of a child object: `<cluster name>-<suffix>`
    pub fn child_resource_name(&self, suffix: &str) -> String {
        format!("{}-{}", self.name_any(), suffix)
    }

    /// Namespace of the cluster, "default" when unset
    pub fn namespace_or_default(&self) -> String {
        self.namespace().unwrap_or_else(|| "default".to_string())
    }
}
