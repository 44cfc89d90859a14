//! Cluster gateway: the seam between orchestration logic and the cluster API
//!
//! Every cluster read and write the orchestrator, removal engine and inventory
//! perform goes through [`ClusterGateway`]. Production code uses
//! [`KubeGateway`](super::KubeGateway); tests use an in-memory fake.

use crate::k8s::objects::{ClusterObject, ResourceKind};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::rbac::v1::ClusterRole;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: ResourceKind, name: String },

    #[error("failed to {verb} {kind} '{name}': {error}")]
    Api {
        verb: &'static str,
        kind: ResourceKind,
        name: String,
        code: Option<u16>,
        error: kube::Error,
    },

    #[error("pod watch on '{selector}' failed: {message}")]
    Watch {
        selector: String,
        code: Option<u16>,
        message: String,
    },

    #[error("{0}")]
    Other(String),
}

impl GatewayError {
    /// Classify a kube error; 409 becomes [`GatewayError::AlreadyExists`]
    pub fn from_kube(verb: &'static str, kind: ResourceKind, name: &str, error: kube::Error) -> Self {
        let code = match &error {
            kube::Error::Api(response) => Some(response.code),
            _ => None,
        };
        match code {
            Some(409) => GatewayError::AlreadyExists {
                kind,
                name: name.to_string(),
            },
            _ => GatewayError::Api {
                verb,
                kind,
                name: name.to_string(),
                code,
                error,
            },
        }
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, GatewayError::AlreadyExists { .. })
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            GatewayError::Api {
                code: Some(401 | 403),
                ..
            } | GatewayError::Watch {
                code: Some(401 | 403),
                ..
            }
        )
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Cluster operations needed to deploy, inspect and remove a stack
#[async_trait]
pub trait ClusterGateway: Send + Sync {
    /// Namespace of the current kube context
    fn current_namespace(&self) -> String;

    async fn namespace_exists(&self, name: &str) -> GatewayResult<bool>;

    async fn create_namespace(&self, name: &str) -> GatewayResult<()>;

    /// Names of the API groups served by the cluster
    async fn api_groups(&self) -> GatewayResult<Vec<String>>;

    /// Address of the ingress-nginx controller service, if one is installed
    async fn ingress_controller_address(&self) -> GatewayResult<Option<String>>;

    /// Create one object; `namespace` is ignored for cluster-scoped kinds
    async fn create(&self, namespace: &str, object: ClusterObject) -> GatewayResult<()>;

    /// Create a ClusterRole unless it already exists.
    /// Returns whether this call created it.
    async fn create_cluster_role_if_absent(&self, role: ClusterRole) -> GatewayResult<bool>;

    /// Names of the objects of `kind` matching a label selector
    async fn list_names(
        &self,
        kind: ResourceKind,
        namespace: &str,
        selector: &str,
    ) -> GatewayResult<Vec<String>>;

    async fn delete(&self, kind: ResourceKind, namespace: &str, name: &str) -> GatewayResult<()>;

    /// Deployments matching a selector in one namespace, or in all of them
    async fn list_deployments(
        &self,
        namespace: Option<&str>,
        selector: &str,
    ) -> GatewayResult<Vec<Deployment>>;

    /// Watch pods matching a selector.
    ///
    /// Fails when the watch cannot be opened. Added and modified pods are
    /// then sent on the returned channel, which closes when the server ends
    /// the watch (after `timeout_secs`). An error from the server is sent as
    /// the last item before the channel closes.
    async fn watch_pods(
        &self,
        namespace: &str,
        selector: &str,
        timeout_secs: u32,
    ) -> GatewayResult<mpsc::Receiver<GatewayResult<Pod>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_display() {
        let err = GatewayError::AlreadyExists {
            kind: ResourceKind::ClusterRole,
            name: "eclipse-codewind".to_string(),
        };
        assert_eq!(err.to_string(), "ClusterRole 'eclipse-codewind' already exists");
        assert!(err.is_already_exists());
        assert!(!err.is_forbidden());
    }

    #[test]
    fn test_forbidden_watch_is_classified() {
        let err = GatewayError::Watch {
            selector: "app=codewind-pfe".to_string(),
            code: Some(403),
            message: "pods is forbidden".to_string(),
        };
        assert!(err.is_forbidden());
        assert_eq!(
            err.to_string(),
            "pod watch on 'app=codewind-pfe' failed: pods is forbidden"
        );
    }

    #[test]
    fn test_other_is_not_classified() {
        let err = GatewayError::Other("boom".to_string());
        assert!(!err.is_already_exists());
        assert!(!err.is_forbidden());
    }
}
