//! codewind-remote - deploy, inspect and remove Codewind stacks on Kubernetes and OpenShift

pub mod commands;
pub mod config;
pub mod install;
pub mod inventory;
pub mod k8s;
pub mod keycloak;
pub mod remove;
pub mod resources;
pub mod stack;
pub mod utils;

pub use install::{DeployContext, deploy};
pub use inventory::{ExistingDeployment, list_deployments};
pub use remove::{RemovalResult, RemovalStatus, remove_keycloak, remove_stack};
pub use stack::{DeployOptions, DeploymentResult, Instance, Member};
pub use utils::errors::{CodewindError, Stage};
