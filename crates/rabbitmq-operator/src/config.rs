//! Operator-wide configuration
//!
//! Defaults applied to every `RabbitmqCluster` that does not override them:
//! the broker image, an optional registry pull secret living in the
//! operator's own namespace, the ingress service type and the persistent
//! storage settings. Loaded from a YAML file; every field is optional.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default RabbitMQ image
pub const DEFAULT_IMAGE: &str = "rabbitmq:3.8.5-management";

/// Default namespace the operator runs in
pub const DEFAULT_OPERATOR_NAMESPACE: &str = "rabbitmq-system";

/// Operator configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperatorConfig {
    /// Image used when the cluster spec names none
    pub image: String,

    /// Name of a registry secret in `operator_namespace` copied into every
    /// cluster namespace whose spec has no `imagePullSecret`
    pub image_pull_secret: Option<String>,

    /// Namespace holding operator-owned objects such as the registry secret
    pub operator_namespace: String,

    /// Ingress service defaults
    pub service: ServiceConfig,

    /// Persistence defaults
    pub persistence: PersistenceConfig,
}

/// Ingress service defaults
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    #[serde(rename = "type")]
    pub service_type: String,
    pub annotations: BTreeMap<String, String>,
}

/// Persistence defaults
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistenceConfig {
    pub storage: String,
    pub storage_class_name: Option<String>,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            image_pull_secret: None,
            operator_namespace: DEFAULT_OPERATOR_NAMESPACE.to_string(),
            service: ServiceConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_type: "ClusterIP".to_string(),
            annotations: BTreeMap::new(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            storage: "10Gi".to_string(),
            storage_class_name: None,
        }
    }
}

impl OperatorConfig {
    /// Parse configuration from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            crate::error::OperatorError::InvalidConfig(format!(
                "cannot read operator config {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&text)
    }

    /// Default pull secret name, ignoring empty strings
    pub fn default_image_pull_secret(&self) -> Option<&str> {
        self.image_pull_secret
            .as_deref()
            .filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OperatorConfig::from_yaml("").unwrap();
        assert_eq!(config, OperatorConfig::default());
        assert_eq!(config.service.service_type, "ClusterIP");
        assert_eq!(config.persistence.storage, "10Gi");
        assert!(config.default_image_pull_secret().is_none());
    }

    #[test]
    fn test_partial_yaml() {
        let config = OperatorConfig::from_yaml(
            r#"
imagePullSecret: pivotal-rmq-registry-access
service:
  type: LoadBalancer
  annotations:
    cloud.example.com/internal: "true"
persistence:
  storageClassName: fast
"#,
        )
        .unwrap();

        assert_eq!(
            config.default_image_pull_secret(),
            Some("pivotal-rmq-registry-access")
        );
        assert_eq!(config.image, DEFAULT_IMAGE);
        assert_eq!(config.service.service_type, "LoadBalancer");
        assert_eq!(config.service.annotations.len(), 1);
        assert_eq!(config.persistence.storage, "10Gi");
        assert_eq!(
            config.persistence.storage_class_name.as_deref(),
            Some("fast")
        );
    }

    #[test]
    fn test_empty_pull_secret_is_none() {
        let config = OperatorConfig::from_yaml("imagePullSecret: \"\"").unwrap();
        assert!(config.default_image_pull_secret().is_none());
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(OperatorConfig::from_yaml("service: [1, 2").is_err());
    }
}
