//! Stack data model: members, the per-deployment instance and options

pub mod instance;
pub mod member;
pub mod options;

pub use instance::{Instance, OwnerRef, generate_workspace_id};
pub use member::{APP_LABEL, Member, WORKSPACE_LABEL, workspace_selector};
pub use options::{DeployOptions, DeploymentResult};
