//! On-demand Minecraft server stack
//!
//! Turns a resolved [`StackConfig`](ondemand_config::StackConfig) into the
//! resource graph of the server topology:
//!
//! ```text
//! StackConfig ──► edition::select ──► EditionProfile
//!      │
//!      └──► StackComposer ──► ParameterReader (domain stack region)
//!                 │
//!                 ├── network / storage / cluster / task
//!                 ├── asset bucket + uploads
//!                 ├── containers / service / notifications
//!                 └── PolicyBinder ──► ResourceGraph
//! ```

pub mod assets;
pub mod branch;
pub mod composer;
pub mod constants;
pub mod edition;
pub mod error;
pub mod policy;

pub use branch::{Branches, CapacityProvider, LoggingBranch, NetworkBranch, NotificationBranch};
pub use composer::{ComposeOptions, ComposedStack, CrossRegionValues, StackComposer, WatchdogImage};
pub use edition::{EditionProfile, Transport, select};
pub use error::{ErrorKind, Result, StackError};
pub use policy::{BindingTargets, BoundPolicies, PolicyBinder};
