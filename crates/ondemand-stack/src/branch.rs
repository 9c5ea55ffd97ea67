//! Composition branches selected by discriminator fields
//!
//! Each optional input picks exactly one variant here. The composer matches
//! on these instead of re-inspecting the raw configuration.

use crate::constants::LOG_RETENTION_DAYS;
use ondemand_config::StackConfig;

/// Where the network comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkBranch {
    /// New isolated network without NAT gateways
    CreateIsolated,
    /// Existing network looked up by ID
    Existing { vpc_id: String },
}

impl NetworkBranch {
    pub fn from_config(config: &StackConfig) -> Self {
        match config.vpc_id.as_deref() {
            Some(id) if !id.is_empty() => Self::Existing {
                vpc_id: id.to_string(),
            },
            _ => Self::CreateIsolated,
        }
    }
}

/// Whether the watchdog gets a notification topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationBranch {
    Disabled,
    Email { address: String },
}

impl NotificationBranch {
    pub fn from_config(config: &StackConfig) -> Self {
        match config.sns_email_address.as_deref() {
            Some(address) if !address.is_empty() => Self::Email {
                address: address.to_string(),
            },
            _ => Self::Disabled,
        }
    }
}

/// Container log streaming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingBranch {
    Disabled,
    CloudWatch { retention_days: u32 },
}

impl LoggingBranch {
    pub fn from_config(config: &StackConfig) -> Self {
        if config.debug {
            Self::CloudWatch {
                retention_days: LOG_RETENTION_DAYS,
            }
        } else {
            Self::Disabled
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityProvider {
    Fargate,
    FargateSpot,
}

impl CapacityProvider {
    pub fn from_config(config: &StackConfig) -> Self {
        if config.use_fargate_spot {
            Self::FargateSpot
        } else {
            Self::Fargate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fargate => "FARGATE",
            Self::FargateSpot => "FARGATE_SPOT",
        }
    }
}

/// All branch decisions for one composition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branches {
    pub network: NetworkBranch,
    pub notification: NotificationBranch,
    pub logging: LoggingBranch,
    pub capacity: CapacityProvider,
}

impl Branches {
    pub fn from_config(config: &StackConfig) -> Self {
        Self {
            network: NetworkBranch::from_config(config),
            notification: NotificationBranch::from_config(config),
            logging: LoggingBranch::from_config(config),
            capacity: CapacityProvider::from_config(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config(extra: &[(&str, &str)]) -> StackConfig {
        let mut input = BTreeMap::from([
            ("DOMAIN_NAME".to_string(), "example.com".to_string()),
            ("CDK_DEFAULT_ACCOUNT".to_string(), "123456789012".to_string()),
            ("CDK_DEFAULT_REGION".to_string(), "us-east-1".to_string()),
            (
                "MINECRAFT_IMAGE_ENV_VARS_JSON".to_string(),
                r#"{"EULA":"TRUE"}"#.to_string(),
            ),
        ]);
        for (key, value) in extra {
            input.insert(key.to_string(), value.to_string());
        }
        ondemand_config::resolve(&input).unwrap()
    }

    #[test]
    fn test_defaults() {
        let branches = Branches::from_config(&config(&[]));
        assert_eq!(branches.network, NetworkBranch::CreateIsolated);
        assert_eq!(branches.notification, NotificationBranch::Disabled);
        assert_eq!(branches.logging, LoggingBranch::Disabled);
        assert_eq!(branches.capacity, CapacityProvider::Fargate);
    }

    #[test]
    fn test_discriminators_present() {
        let branches = Branches::from_config(&config(&[
            ("VPC_ID", "vpc-123"),
            ("SNS_EMAIL_ADDRESS", "a@b.com"),
            ("DEBUG", "true"),
            ("USE_FARGATE_SPOT", "TRUE"),
        ]));
        assert_eq!(
            branches.network,
            NetworkBranch::Existing {
                vpc_id: "vpc-123".into()
            }
        );
        assert_eq!(
            branches.notification,
            NotificationBranch::Email {
                address: "a@b.com".into()
            }
        );
        assert_eq!(
            branches.logging,
            LoggingBranch::CloudWatch { retention_days: 3 }
        );
        assert_eq!(branches.capacity.as_str(), "FARGATE_SPOT");
    }

    #[test]
    fn test_empty_discriminators_are_absent() {
        let branches = Branches::from_config(&config(&[("VPC_ID", ""), ("SNS_EMAIL_ADDRESS", "")]));
        assert_eq!(branches.network, NetworkBranch::CreateIsolated);
        assert_eq!(branches.notification, NotificationBranch::Disabled);
    }
}
