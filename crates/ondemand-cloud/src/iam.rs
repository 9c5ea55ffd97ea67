//! Access-control statements

use crate::error::{CloudError, Result};
use serde::Serialize;
use serde_json::Value;

const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// A single policy statement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    pub action: Vec<String>,
    pub resource: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

impl PolicyStatement {
    pub fn allow<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sid: None,
            effect: Effect::Allow,
            action: actions.into_iter().map(Into::into).collect(),
            resource: Vec::new(),
            condition: None,
        }
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn on(mut self, resource: impl Into<Value>) -> Self {
        self.resource.push(resource.into());
        self
    }

    pub fn with_condition(mut self, condition: Value) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Whether the statement applies to every resource
    pub fn is_wildcard(&self) -> bool {
        self.resource.iter().any(|r| r.as_str() == Some("*"))
    }
}

/// A policy document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: &'static str,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION,
            statement,
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// `arn:aws:<service>:<region>:<account>:<resource>`
pub fn format_arn(service: &str, region: &str, account: &str, resource: &str) -> String {
    format!("arn:aws:{}:{}:{}:{}", service, region, account, resource)
}

/// Role name from a role ARN (`arn:aws:iam::<account>:role/<path>/<name>`)
pub fn role_name_from_arn(arn: &str) -> Result<String> {
    let resource = arn
        .strip_prefix("arn:")
        .and_then(|rest| rest.splitn(5, ':').nth(4))
        .filter(|resource| resource.starts_with("role/"))
        .ok_or_else(|| CloudError::InvalidConfig(format!("Not a role ARN: {}", arn)))?;

    match resource.rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(CloudError::InvalidConfig(format!(
            "Role ARN has no role name: {}",
            arn
        ))),
    }
}
