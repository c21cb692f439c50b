//! Error types for the RabbitMQ Kubernetes Operator

use thiserror::Error;

/// Errors that can occur during operator operations
#[derive(Error, Debug)]
pub enum OperatorError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// Resource not found
    #[error("Resource not found: {kind}/{name} in namespace {namespace}")]
    NotFound {
        kind: String,
        name: String,
        namespace: String,
    },

    /// Malformed configuration text (operator template or user overlay)
    #[error("failed to parse {source_name} at line {line}: {message}")]
    ConfigParse {
        source_name: String,
        line: usize,
        message: String,
    },

    /// Owner reference could not be attached to a child object
    #[error("failed setting controller reference: {0}")]
    OwnerReference(String),

    /// Resource quantity could not be parsed
    #[error("Invalid quantity '{0}'")]
    InvalidQuantity(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// YAML serialization error
    #[error("YAML serialization error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Result type for operator operations
pub type Result<T> = std::result::Result<T, OperatorError>;

impl OperatorError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, OperatorError::KubeError(_))
    }

    /// Whether this is an optimistic-concurrency conflict on write
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            OperatorError::KubeError(kube::Error::Api(response)) if response.code == 409
        )
    }

    /// Get a suggested requeue delay for retryable errors
    pub fn requeue_delay(&self) -> Option<std::time::Duration> {
        if self.is_conflict() {
            Some(std::time::Duration::from_secs(1))
        } else if self.is_retryable() {
            Some(std::time::Duration::from_secs(30))
        } else {
            None
        }
    }
}
