//! Application server (PFE) deployment and its RBAC

use crate::install::create_object;
use crate::k8s::{ClusterGateway, ClusterObject};
use crate::resources::rbac::{
    cluster_role, role_binding, tekton_cluster_role, tekton_cluster_role_binding,
};
use crate::resources::storage::pvc;
use crate::resources::workload::{Workload, deployment, service};
use crate::stack::{DeployOptions, Instance, Member};
use crate::utils::errors::{CodewindError, Stage};

pub const WORKSPACE_DIR: &str = "/codewind-workspace";

/// Env var names the inventory reads back
pub const AUTH_HOST_ENV: &str = "CODEWIND_AUTH_HOST";
pub const AUTH_REALM_ENV: &str = "CODEWIND_AUTH_REALM";
pub const VERSION_ENV: &str = "CODEWIND_VERSION";

pub fn workload(instance: &Instance, options: &DeployOptions, keycloak_url: &str) -> Workload {
    let mut workload = Workload::default()
        .privileged()
        .env("IN_K8S", "true")
        .env("PORTAL_HTTPS", "true")
        .env("KUBE_NAMESPACE", instance.namespace())
        .env("TEKTON_PIPELINE", "tekton-pipelines")
        .env("SERVICE_ACCOUNT_NAME", instance.service_account(Member::Pfe))
        .env("CHE_WORKSPACE_ID", instance.workspace_id())
        .env("PVC_NAME", instance.pvc_name(Member::Pfe))
        .env("INGRESS_DOMAIN", instance.ingress_domain())
        .env("ON_OPENSHIFT", instance.on_openshift().to_string())
        .env("CODEWIND_PERFORMANCE_SERVICE", instance.name(Member::Performance))
        .env(AUTH_HOST_ENV, keycloak_url)
        .env(AUTH_REALM_ENV, options.realm.as_str())
        .env(VERSION_ENV, instance.version())
        .env("LOG_LEVEL", options.log_level.as_str())
        .pvc_volume("shared-workspace", &instance.pvc_name(Member::Pfe), WORKSPACE_DIR);

    if let Some(owner) = instance.owner() {
        workload = workload
            .env("OWNER_REF_NAME", owner.name.as_str())
            .env("OWNER_REF_UID", owner.uid.as_str());
    }
    workload
}

/// Create the shared ClusterRoles once per cluster and the per-workspace bindings
async fn create_rbac<G>(gateway: &G, instance: &Instance) -> Result<(), CodewindError>
where
    G: ClusterGateway + ?Sized,
{
    let stage = Stage::Deploy(Member::Pfe);

    for role in [cluster_role(instance), tekton_cluster_role(instance)] {
        let name = role.metadata.name.clone().unwrap_or_default();
        let created = gateway
            .create_cluster_role_if_absent(role)
            .await
            .map_err(|e| CodewindError::cluster(stage, format!("Failed to create ClusterRole '{}'", name), e))?;
        if created {
            crate::log_info!("Created ClusterRole {}", name);
        } else {
            crate::log_info!("ClusterRole {} already exists", name);
        }
    }

    create_object(gateway, instance, stage, ClusterObject::RoleBinding(role_binding(instance))).await?;
    create_object(
        gateway,
        instance,
        stage,
        ClusterObject::ClusterRoleBinding(tekton_cluster_role_binding(instance)),
    )
    .await
}

/// Create the PFE RBAC, PVC, Service and Deployment
pub async fn deploy<G>(
    gateway: &G,
    instance: &Instance,
    options: &DeployOptions,
    keycloak_url: &str,
) -> Result<(), CodewindError>
where
    G: ClusterGateway + ?Sized,
{
    let member = Member::Pfe;
    let stage = Stage::Deploy(member);

    create_rbac(gateway, instance).await?;

    let objects = [
        ClusterObject::PersistentVolumeClaim(pvc(instance, member, &options.pfe_pvc_size)),
        ClusterObject::Service(service(instance, member)),
        ClusterObject::Deployment(deployment(
            instance,
            member,
            workload(instance, options, keycloak_url),
        )),
    ];
    for object in objects {
        create_object(gateway, instance, stage, object).await?;
    }
    Ok(())
}
