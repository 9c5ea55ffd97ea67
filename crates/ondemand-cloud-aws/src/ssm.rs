//! AWS Systems Manager parameter reader

use crate::error::{AwsError, Result};
use async_trait::async_trait;
use aws_sdk_ssm::config::Region;
use aws_sdk_ssm::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_ssm::operation::get_parameter::GetParameterError;
use ondemand_cloud::ParameterReader;

const ACCESS_DENIED: &str = "AccessDeniedException";

/// Reads parameters from the SSM parameter store of any region
///
/// A client is built per call for the requested region, so one reader can
/// serve stacks deployed to different regions.
#[derive(Debug, Clone, Default)]
pub struct SsmParameterReader {
    profile: Option<String>,
}

impl SsmParameterReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a named profile instead of the default credential chain
    pub fn with_profile(profile: impl Into<String>) -> Self {
        Self {
            profile: Some(profile.into()),
        }
    }

    async fn client(&self, region: &str) -> aws_sdk_ssm::Client {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()));
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;
        aws_sdk_ssm::Client::new(&config)
    }

    /// Fetch the current value of a parameter
    #[tracing::instrument(skip(self))]
    pub async fn get_parameter(&self, name: &str, region: &str) -> Result<String> {
        let client = self.client(region).await;

        let output = client
            .get_parameter()
            .name(name)
            .send()
            .await
            .map_err(|e| classify(name, region, e.into_service_error()))?;

        let value = output
            .parameter()
            .and_then(|p| p.value())
            .ok_or_else(|| AwsError::EmptyParameter {
                name: name.to_string(),
                region: region.to_string(),
            })?;

        tracing::debug!("Read parameter {} from {}", name, region);
        Ok(value.to_string())
    }
}

#[async_trait]
impl ParameterReader for SsmParameterReader {
    async fn read(&self, name: &str, region: &str) -> ondemand_cloud::Result<String> {
        Ok(self.get_parameter(name, region).await?)
    }
}

fn classify(name: &str, region: &str, err: GetParameterError) -> AwsError {
    let name = name.to_string();
    let region = region.to_string();

    if err.is_parameter_not_found() {
        return AwsError::ParameterNotFound { name, region };
    }

    if err.code() == Some(ACCESS_DENIED) {
        return AwsError::AccessDenied {
            name,
            region,
            message: err.message().unwrap_or_default().to_string(),
        };
    }

    AwsError::ApiError {
        name,
        region,
        message: DisplayErrorContext(&err).to_string(),
    }
}
