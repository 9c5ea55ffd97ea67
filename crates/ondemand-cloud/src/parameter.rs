//! Cross-region parameter exchange
//!
//! Stacks in different regions hand identifiers to each other through a
//! region-scoped parameter store. The provisioning engine cannot reference
//! those values directly, so the composer reads them through a
//! [`ParameterReader`] before wiring the nodes that need them.

use crate::error::{CloudError, Result};
use crate::graph::Resource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashMap;

/// Response field holding the parameter value
pub const PARAMETER_VALUE_FIELD: &str = "Parameter.Value";

/// Reads a named parameter from a region's parameter store
///
/// Implementations fail with [`CloudError::ParameterNotFound`] when the
/// parameter does not exist and [`CloudError::ParameterAccessDenied`] when
/// the caller may not read it. Neither is retried.
#[async_trait]
pub trait ParameterReader: Send + Sync {
    async fn read(&self, name: &str, region: &str) -> Result<String>;
}

/// In-memory parameter store
#[derive(Debug, Clone, Default)]
pub struct StaticParameters {
    values: HashMap<(String, String), String>,
}

impl StaticParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        region: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.insert(region, name, value);
        self
    }

    pub fn insert(
        &mut self,
        region: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.values
            .insert((region.into(), name.into()), value.into());
    }
}

#[async_trait]
impl ParameterReader for StaticParameters {
    async fn read(&self, name: &str, region: &str) -> Result<String> {
        self.values
            .get(&(region.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| CloudError::ParameterNotFound {
                name: name.to_string(),
                region: region.to_string(),
            })
    }
}

/// Physical ID of a parameter read step
///
/// Keyed by the apply timestamp so every apply re-fetches the value.
pub fn read_step_physical_id(name: &str, at: DateTime<Utc>) -> String {
    format!("SSMParam-{}-{}", name, at.timestamp_millis())
}

/// Graph node for a parameter read executed by the engine at apply time
pub fn parameter_read_step(
    logical_id: &str,
    name: &str,
    region: &str,
    at: DateTime<Utc>,
) -> Resource {
    let call = json!({
        "service": "SSM",
        "action": "getParameter",
        "parameters": { "Name": name },
        "region": region,
        "physicalResourceId": read_step_physical_id(name, at),
    });

    Resource::new(
        logical_id,
        "Custom::AWS",
        json!({
            "Create": call,
            "Update": call,
            "OutputPaths": [PARAMETER_VALUE_FIELD],
            "Policy": {
                "Statement": [{
                    "Effect": "Allow",
                    "Action": ["ssm:GetParameter"],
                    "Resource": ["*"],
                }],
            },
        }),
    )
}
