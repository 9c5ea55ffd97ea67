//! On-demand stack cloud primitives
//!
//! This crate provides the provider-neutral pieces the stack composer is
//! built from.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  ondemand CLI                    │
//! │           (ondemand validate/plan/synth)         │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                 ondemand-stack                   │
//! │   edition selector / composer / policy binder    │
//! └───────┬─────────────────────────┬───────────────┘
//!         │                         │
//! ┌───────▼───────────────┐ ┌───────▼───────────────┐
//! │    ondemand-cloud     │ │  ondemand-cloud-aws   │
//! │ ResourceGraph, Token  │ │  SSM ParameterReader  │
//! │ trait ParameterReader │ │                       │
//! └───────────────────────┘ └───────────────────────┘
//! ```

pub mod action;
pub mod error;
pub mod graph;
pub mod iam;
pub mod parameter;

// Re-exports
pub use action::{Action, ActionType, Plan, PlanSummary};
pub use error::{CloudError, Result};
pub use graph::{Lifecycle, RemovalPolicy, Resource, ResourceGraph, Token, join, select_after};
pub use iam::{Effect, PolicyDocument, PolicyStatement, format_arn, role_name_from_arn};
pub use parameter::{
    PARAMETER_VALUE_FIELD, ParameterReader, StaticParameters, parameter_read_step,
    read_step_physical_id,
};
