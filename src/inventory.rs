//! Existing deployment discovery

use crate::install::pfe::{AUTH_HOST_ENV, AUTH_REALM_ENV, VERSION_ENV};
use crate::k8s::ClusterGateway;
use crate::stack::{APP_LABEL, Member, WORKSPACE_LABEL};
use crate::utils::errors::{CodewindError, Stage};
use k8s_openapi::api::apps::v1::Deployment;
use serde::Serialize;

const INSTALL_TIME_FORMAT: &str = "%d-%b-%Y %H:%M:%S";

/// A stack found in the cluster, reconstructed from its application server Deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingDeployment {
    pub workspace_id: String,
    pub namespace: String,
    pub auth_url: String,
    pub realm: String,
    pub version: String,
    pub install_time: String,
}

impl ExistingDeployment {
    fn from_deployment(deployment: &Deployment) -> Self {
        let metadata = &deployment.metadata;
        let env = deployment
            .spec
            .as_ref()
            .and_then(|spec| spec.template.spec.as_ref())
            .and_then(|pod| pod.containers.first())
            .and_then(|container| container.env.as_ref());
        let var = |name: &str| {
            env.and_then(|vars| vars.iter().find(|v| v.name == name))
                .and_then(|v| v.value.clone())
                .unwrap_or_default()
        };

        Self {
            workspace_id: metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get(WORKSPACE_LABEL))
                .cloned()
                .unwrap_or_default(),
            namespace: metadata.namespace.clone().unwrap_or_default(),
            auth_url: var(AUTH_HOST_ENV),
            realm: var(AUTH_REALM_ENV),
            version: var(VERSION_ENV),
            install_time: metadata
                .creation_timestamp
                .as_ref()
                .map(|time| time.0.format(INSTALL_TIME_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }
}

/// Stacks in one namespace, or in every namespace when `namespace` is None
pub async fn list_deployments<G>(
    gateway: &G,
    namespace: Option<&str>,
) -> Result<Vec<ExistingDeployment>, CodewindError>
where
    G: ClusterGateway + ?Sized,
{
    let selector = format!("{}={}", APP_LABEL, Member::Pfe.prefix());
    let deployments = gateway
        .list_deployments(namespace, &selector)
        .await
        .map_err(|e| CodewindError::cluster(Stage::Inventory, "list Codewind deployments", e))?;

    tracing::debug!(count = deployments.len(), ?namespace, "found deployments");
    Ok(deployments
        .iter()
        .map(ExistingDeployment::from_deployment)
        .collect())
}
