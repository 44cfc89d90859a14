//! Namespace, platform and ingress domain resolution

use crate::k8s::ClusterGateway;
use crate::k8s::objects::OPENSHIFT_ROUTE_GROUP;
use crate::utils::errors::{CodewindError, Stage};

/// Where and on what kind of cluster a stack is deployed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub namespace: String,
    pub ingress_domain: String,
    pub on_openshift: bool,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The explicit namespace, else the namespace of the current kube context
pub fn resolve_namespace<G>(gateway: &G, explicit: Option<&str>) -> String
where
    G: ClusterGateway + ?Sized,
{
    non_empty(explicit)
        .map(str::to_string)
        .unwrap_or_else(|| gateway.current_namespace())
}

/// Create the namespace unless it already exists.
/// Returns whether it was created.
pub async fn ensure_namespace<G>(gateway: &G, namespace: &str) -> Result<bool, CodewindError>
where
    G: ClusterGateway + ?Sized,
{
    let exists = gateway
        .namespace_exists(namespace)
        .await
        .map_err(|e| CodewindError::namespace_failed(namespace, e))?;
    if exists {
        crate::log_info!("Using existing namespace {}", namespace);
        return Ok(false);
    }

    gateway
        .create_namespace(namespace)
        .await
        .map_err(|e| CodewindError::namespace_failed(namespace, e))?;
    crate::log_info!("Created namespace {}", namespace);
    Ok(true)
}

/// OpenShift is recognised by the route API group
pub async fn detect_openshift<G>(gateway: &G) -> Result<bool, CodewindError>
where
    G: ClusterGateway + ?Sized,
{
    let groups = gateway.api_groups().await.map_err(|e| {
        CodewindError::cluster(Stage::DetectPlatform, "Unable to list cluster API groups", e)
    })?;
    Ok(groups.iter().any(|g| g == OPENSHIFT_ROUTE_GROUP))
}

/// The explicit domain, else `<ip>.nip.io` for the ingress-nginx controller
pub async fn resolve_ingress_domain<G>(
    gateway: &G,
    explicit: Option<&str>,
    on_openshift: bool,
) -> Result<String, CodewindError>
where
    G: ClusterGateway + ?Sized,
{
    if let Some(domain) = non_empty(explicit) {
        return Ok(domain.to_string());
    }

    if !on_openshift {
        match gateway.ingress_controller_address().await {
            Ok(Some(address)) => {
                let domain = format!("{}.nip.io", address);
                crate::log_info!("Using ingress domain {}", domain);
                return Ok(domain);
            }
            Ok(None) => {}
            Err(e) => crate::log_warn!("Unable to look up the ingress controller: {}", e),
        }
    }

    Err(CodewindError::no_ingress_service())
}

/// Resolve the whole environment, creating the namespace if needed
pub async fn resolve<G>(
    gateway: &G,
    namespace: Option<&str>,
    ingress_domain: Option<&str>,
) -> Result<Environment, CodewindError>
where
    G: ClusterGateway + ?Sized,
{
    let namespace = resolve_namespace(gateway, namespace);
    ensure_namespace(gateway, &namespace).await?;
    let on_openshift = detect_openshift(gateway).await?;
    if on_openshift {
        crate::log_info!("OpenShift detected, exposing services through routes");
    }
    let ingress_domain = resolve_ingress_domain(gateway, ingress_domain, on_openshift).await?;

    Ok(Environment {
        namespace,
        ingress_domain,
        on_openshift,
    })
}
