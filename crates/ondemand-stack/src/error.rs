//! Stack composition errors

use ondemand_cloud::CloudError;
use ondemand_config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("Asset discovery failed: {0}")]
    Asset(String),
}

/// Error category reported to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing configuration input
    Validation,
    /// Cross-region parameter missing or unreadable
    Lookup,
    /// Resource-level conflict
    ProvisioningConflict,
}

impl StackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StackError::Config(_) | StackError::Asset(_) => ErrorKind::Validation,
            StackError::Cloud(CloudError::InvalidConfig(_)) => ErrorKind::Validation,
            StackError::Cloud(e) if e.is_lookup() => ErrorKind::Lookup,
            StackError::Cloud(_) => ErrorKind::ProvisioningConflict,
        }
    }
}

pub type Result<T> = std::result::Result<T, StackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        let err: StackError = ConfigError::Missing("DOMAIN_NAME".into()).into();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err: StackError = CloudError::ParameterNotFound {
            name: "x".into(),
            region: "us-east-1".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Lookup);

        let err: StackError = CloudError::DuplicateResource("Vpc".into()).into();
        assert_eq!(err.kind(), ErrorKind::ProvisioningConflict);
    }
}
