//! AWS provider for the on-demand stack
//!
//! Implements [`ondemand_cloud::ParameterReader`] on top of AWS Systems
//! Manager so the composer can read identifiers that another stack published
//! in a different region.
//!
//! # Requirements
//!
//! - Credentials from the default provider chain (env vars, profile, SSO)
//! - `ssm:GetParameter` on the parameters in the target region
//!
//! # Example
//!
//! ```ignore
//! use ondemand_cloud::ParameterReader;
//! use ondemand_cloud_aws::SsmParameterReader;
//!
//! let reader = SsmParameterReader::new();
//! let zone_id = reader.read("MinecraftHostedZoneID", "us-east-1").await?;
//! ```

pub mod error;
pub mod ssm;

pub use error::{AwsError, Result};
pub use ssm::SsmParameterReader;
