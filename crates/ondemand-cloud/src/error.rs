//! Cloud error types

use thiserror::Error;

/// Errors raised while composing or resolving cloud resources
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Parameter '{name}' not found in {region}; apply the domain stack first")]
    ParameterNotFound { name: String, region: String },

    #[error("Access denied reading parameter '{name}' in {region}: {message}")]
    ParameterAccessDenied {
        name: String,
        region: String,
        message: String,
    },

    #[error("Parameter lookup failed for '{name}' in {region}: {message}")]
    ParameterLookup {
        name: String,
        region: String,
        message: String,
    },

    #[error("Resource already exists: {0}")]
    DuplicateResource(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Resource '{resource}' depends on unknown resource '{dependency}'")]
    UnknownDependency {
        resource: String,
        dependency: String,
    },

    #[error("Circular dependency detected at: {0}")]
    CircularDependency(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Whether this error came from a cross-region parameter lookup
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            CloudError::ParameterNotFound { .. }
                | CloudError::ParameterAccessDenied { .. }
                | CloudError::ParameterLookup { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
