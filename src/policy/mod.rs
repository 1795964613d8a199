//! Routing policy data model
//!
//! ```text
//! RoutingPolicy ─┬─ production: DeploymentPolicy ─┬─ default: EndpointRef
//!                ├─ sandbox:    DeploymentPolicy  └─ categories: [Category → EndpointRef]
//!                └─ suspendDuration
//! ```

pub mod category;
pub mod deployment;
pub mod document;
pub mod endpoint;

pub use category::Category;
pub use deployment::DeploymentPolicy;
pub use document::{Environment, PolicyError, RoutingPolicy, MILLISECONDS_IN_SECOND};
pub use endpoint::EndpointRef;
