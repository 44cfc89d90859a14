//! Kubernetes operations

pub mod certs;
#[cfg(test)]
pub mod fake;
pub mod gateway;
pub mod kube_gateway;
pub mod objects;
pub mod readiness;

pub use gateway::{ClusterGateway, GatewayError, GatewayResult};
pub use kube_gateway::KubeGateway;
pub use objects::{ClusterObject, ResourceKind};
