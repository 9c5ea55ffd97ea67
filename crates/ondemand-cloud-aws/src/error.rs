//! AWS provider error types

use ondemand_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("Parameter not found: {name} ({region})")]
    ParameterNotFound { name: String, region: String },

    #[error("Access denied: {name} ({region}): {message}")]
    AccessDenied {
        name: String,
        region: String,
        message: String,
    },

    #[error("Parameter {name} ({region}) has no value")]
    EmptyParameter { name: String, region: String },

    #[error("AWS API error: {name} ({region}): {message}")]
    ApiError {
        name: String,
        region: String,
        message: String,
    },
}

impl From<AwsError> for CloudError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::ParameterNotFound { name, region }
            | AwsError::EmptyParameter { name, region } => {
                CloudError::ParameterNotFound { name, region }
            }
            AwsError::AccessDenied {
                name,
                region,
                message,
            } => CloudError::ParameterAccessDenied {
                name,
                region,
                message,
            },
            AwsError::ApiError {
                name,
                region,
                message,
            } => CloudError::ParameterLookup {
                name,
                region,
                message,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;
