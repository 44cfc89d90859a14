//! Removal engine
//!
//! Tears a stack down kind by kind using label selectors only, so it works on
//! partially deployed or partially removed stacks. A failing kind is recorded
//! in the report and never stops the remaining kinds. The namespace is left
//! in place.

pub mod status;

use crate::install::environment::detect_openshift;
use crate::k8s::{ClusterGateway, ResourceKind};
use crate::resources::Exposure;
use crate::stack::{Member, workspace_selector};

pub use status::{RemovalResult, RemovalStatus};

/// Outcome of one kind plus the error text when it failed
struct KindOutcome {
    status: RemovalStatus,
    error: Option<String>,
}

/// List everything of `kind` matching `selector` and delete it
async fn remove_kind<G>(
    gateway: &G,
    kind: ResourceKind,
    namespace: &str,
    selector: &str,
) -> KindOutcome
where
    G: ClusterGateway + ?Sized,
{
    let names = match gateway.list_names(kind, namespace, selector).await {
        Ok(names) => names,
        Err(e) => {
            crate::log_warn!("Unable to list {} matching {}: {}", kind, selector, e);
            return KindOutcome {
                status: RemovalStatus::RemovalFailed,
                error: Some(e.to_string()),
            };
        }
    };

    if names.is_empty() {
        tracing::debug!(%kind, selector, "nothing to remove");
        return KindOutcome {
            status: RemovalStatus::NotFound,
            error: None,
        };
    }

    let mut status = RemovalStatus::Found;
    tracing::debug!(%kind, selector, count = names.len(), "{}", status);

    let mut errors = Vec::new();
    for name in &names {
        match gateway.delete(kind, namespace, name).await {
            Ok(()) => crate::log_info!("Removed {} {}", kind, name),
            Err(e) => {
                crate::log_warn!("Failed to remove {} {}: {}", kind, name, e);
                errors.push(e.to_string());
            }
        }
    }

    status = if errors.is_empty() {
        RemovalStatus::Removed
    } else {
        RemovalStatus::RemovalFailed
    };
    KindOutcome {
        status,
        error: (!errors.is_empty()).then(|| errors.join("; ")),
    }
}

/// Record an outcome under `label` and return its status
fn record(result: &mut RemovalResult, label: &str, outcome: KindOutcome) -> RemovalStatus {
    if let Some(error) = outcome.error {
        result.errors.insert(label.to_string(), error);
    }
    outcome.status
}

/// Ingress on vanilla clusters, Route on OpenShift; None when detection fails
async fn exposure_kind<G>(gateway: &G) -> Option<ResourceKind>
where
    G: ClusterGateway + ?Sized,
{
    match detect_openshift(gateway).await {
        Ok(true) => Some(Exposure::Route.kind()),
        Ok(false) => Some(Exposure::Ingress.kind()),
        Err(e) => {
            crate::log_warn!("Unable to detect the platform, skipping ingress/route removal: {}", e);
            None
        }
    }
}

/// Remove every object of a full stack
pub async fn remove_stack<G>(gateway: &G, namespace: &str, workspace_id: &str) -> RemovalResult
where
    G: ClusterGateway + ?Sized,
{
    let mut result = RemovalResult::new(namespace, workspace_id);
    let workspace = workspace_selector(workspace_id);

    for member in Member::ALL {
        let outcome =
            remove_kind(gateway, ResourceKind::Deployment, namespace, &member.selector(workspace_id)).await;
        let status = record(&mut result, &format!("Deployment {}", label(member)), outcome);
        *result.deployment_mut(member) = status;
    }

    for member in Member::ALL {
        let outcome =
            remove_kind(gateway, ResourceKind::Service, namespace, &member.selector(workspace_id)).await;
        let status = record(&mut result, &format!("Service {}", label(member)), outcome);
        *result.service_mut(member) = status;
    }

    let outcome = remove_kind(
        gateway,
        ResourceKind::Secret,
        namespace,
        &Member::Keycloak.selector(workspace_id),
    )
    .await;
    result.secrets_keycloak = record(&mut result, "Secrets Keycloak", outcome);

    let outcome = remove_kind(
        gateway,
        ResourceKind::Secret,
        namespace,
        &Member::Gatekeeper.selector(workspace_id),
    )
    .await;
    result.secrets_gatekeeper = record(&mut result, "Secrets Gatekeeper", outcome);

    let outcome = remove_kind(
        gateway,
        ResourceKind::PersistentVolumeClaim,
        namespace,
        &Member::Pfe.selector(workspace_id),
    )
    .await;
    result.pvc_pfe = record(&mut result, "PVC PFE", outcome);

    let outcome = remove_kind(
        gateway,
        ResourceKind::PersistentVolumeClaim,
        namespace,
        &Member::Keycloak.selector(workspace_id),
    )
    .await;
    result.pvc_keycloak = record(&mut result, "PVC Keycloak", outcome);

    let outcome = remove_kind(gateway, ResourceKind::RoleBinding, namespace, &workspace).await;
    result.role_bindings = record(&mut result, "Role Bindings", outcome);

    let outcome = remove_kind(gateway, ResourceKind::ClusterRoleBinding, namespace, &workspace).await;
    result.tekton_cluster_role_bindings = record(&mut result, "Tekton Cluster Role Bindings", outcome);

    let outcome = remove_kind(gateway, ResourceKind::ServiceAccount, namespace, &workspace).await;
    result.service_accounts = record(&mut result, "Service Accounts", outcome);

    match exposure_kind(gateway).await {
        Some(kind) => {
            let outcome =
                remove_kind(gateway, kind, namespace, &Member::Keycloak.selector(workspace_id)).await;
            result.exposure_keycloak = record(&mut result, "Exposure Keycloak", outcome);
            let outcome =
                remove_kind(gateway, kind, namespace, &Member::Gatekeeper.selector(workspace_id)).await;
            result.exposure_gatekeeper = record(&mut result, "Exposure Gatekeeper", outcome);
        }
        None => {
            result.exposure_keycloak = RemovalStatus::Skipped;
            result.exposure_gatekeeper = RemovalStatus::Skipped;
        }
    }

    result.log();
    result
}

/// Remove the objects of a Keycloak-only deployment; other rows stay NotProcessed
pub async fn remove_keycloak<G>(gateway: &G, namespace: &str, workspace_id: &str) -> RemovalResult
where
    G: ClusterGateway + ?Sized,
{
    let mut result = RemovalResult::new(namespace, workspace_id);
    let selector = Member::Keycloak.selector(workspace_id);

    let outcome = remove_kind(gateway, ResourceKind::Deployment, namespace, &selector).await;
    result.deployment_keycloak = record(&mut result, "Deployment Keycloak", outcome);

    let outcome = remove_kind(gateway, ResourceKind::Service, namespace, &selector).await;
    result.service_keycloak = record(&mut result, "Service Keycloak", outcome);

    let outcome = remove_kind(gateway, ResourceKind::Secret, namespace, &selector).await;
    result.secrets_keycloak = record(&mut result, "Secrets Keycloak", outcome);

    let outcome = remove_kind(gateway, ResourceKind::PersistentVolumeClaim, namespace, &selector).await;
    result.pvc_keycloak = record(&mut result, "PVC Keycloak", outcome);

    let outcome = remove_kind(gateway, ResourceKind::ServiceAccount, namespace, &selector).await;
    result.service_accounts = record(&mut result, "Service Accounts", outcome);

    result.exposure_keycloak = match exposure_kind(gateway).await {
        Some(kind) => {
            let outcome = remove_kind(gateway, kind, namespace, &selector).await;
            record(&mut result, "Exposure Keycloak", outcome)
        }
        None => RemovalStatus::Skipped,
    };

    result.log();
    result
}

fn label(member: Member) -> &'static str {
    match member {
        Member::Pfe => "PFE",
        Member::Performance => "Performance",
        Member::Keycloak => "Keycloak",
        Member::Gatekeeper => "Gatekeeper",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::images::ImageSet;
    use crate::install::{DeployContext, deploy};
    use crate::k8s::ClusterObject;
    use crate::k8s::fake::FakeGateway;
    use crate::keycloak::client::{ClientRepresentation, MockIdentityAdmin, UserRepresentation};
    use crate::resources::workload::{Workload, deployment, service};
    use crate::stack::{DeployOptions, Instance};

    fn permissive_admin() -> MockIdentityAdmin {
        let mut admin = MockIdentityAdmin::new();
        admin.expect_login().returning(|_, _| Ok("t".to_string()));
        admin.expect_get_realm().returning(|_, _| Ok(None));
        admin.expect_create_realm().returning(|_, _| Ok(()));
        admin.expect_get_client().returning(|_, _, _| {
            Ok(Some(ClientRepresentation {
                id: Some("c".to_string()),
                client_id: "codewind".to_string(),
                ..Default::default()
            }))
        });
        admin.expect_update_client().returning(|_, _, _| Ok(()));
        admin.expect_create_role().returning(|_, _, _| Ok(()));
        admin.expect_get_user().returning(|_, _, _| {
            Ok(Some(UserRepresentation {
                id: Some("u".to_string()),
                username: "developer".to_string(),
                enabled: true,
            }))
        });
        admin.expect_grant_role().returning(|_, _, _, _| Ok(()));
        admin.expect_client_secret().returning(|_, _, _| Ok("s".to_string()));
        admin
    }

    async fn deployed(gateway: &FakeGateway) -> (String, String) {
        let options = DeployOptions {
            namespace: Some("codewind".to_string()),
            ingress_domain: Some("10.0.0.1.nip.io".to_string()),
            ..DeployOptions::default()
        };
        let result = deploy(gateway, |_| Ok(permissive_admin()), &options, &DeployContext::default())
            .await
            .unwrap();
        (result.namespace, result.workspace_id)
    }

    #[tokio::test]
    async fn test_full_removal_then_idempotent() {
        let gateway = FakeGateway::new();
        let (namespace, workspace) = deployed(&gateway).await;

        let first = remove_stack(&gateway, &namespace, &workspace).await;
        assert!(
            first.rows().iter().all(|(_, s)| *s == RemovalStatus::Removed),
            "{:?}",
            first.rows()
        );
        assert_eq!(gateway.object_count(), 0);
        // Shared cluster roles survive
        assert_eq!(gateway.cluster_role_names().len(), 2);
        assert!(gateway.has_namespace("codewind"));

        let second = remove_stack(&gateway, &namespace, &workspace).await;
        assert!(second.rows().iter().all(|(_, s)| *s == RemovalStatus::NotFound));
        assert!(!second.has_failures());
    }

    #[tokio::test]
    async fn test_failing_kind_does_not_stop_others() {
        let gateway = FakeGateway::new();
        let (namespace, workspace) = deployed(&gateway).await;
        gateway.fail_kind(ResourceKind::Secret);

        let result = remove_stack(&gateway, &namespace, &workspace).await;
        assert_eq!(result.secrets_keycloak, RemovalStatus::RemovalFailed);
        assert_eq!(result.secrets_gatekeeper, RemovalStatus::RemovalFailed);
        assert!(result.errors.contains_key("Secrets Keycloak"));
        assert_eq!(result.failures().len(), 2);

        for (label, status) in result.rows() {
            if !label.starts_with("Secrets") {
                assert_eq!(status, RemovalStatus::Removed, "{}", label);
            }
        }
        assert_eq!(gateway.objects(ResourceKind::Secret).len(), 5);
    }

    #[tokio::test]
    async fn test_partial_deploy_removal() {
        let gateway = FakeGateway::new();
        let instance = Instance::new("p4rt1al", "codewind", "x.nip.io", false, ImageSet::default(), None);
        gateway.insert(
            "codewind",
            ClusterObject::Deployment(deployment(&instance, Member::Pfe, Workload::default())),
        );
        gateway.insert("codewind", ClusterObject::Service(service(&instance, Member::Pfe)));

        let result = remove_stack(&gateway, "codewind", "p4rt1al").await;
        assert_eq!(result.deployment_pfe, RemovalStatus::Removed);
        assert_eq!(result.service_pfe, RemovalStatus::Removed);
        for (label, status) in result.rows() {
            if label != "Deployment PFE" && label != "Service PFE" {
                assert_eq!(status, RemovalStatus::NotFound, "{}", label);
            }
        }
    }

    #[tokio::test]
    async fn test_other_workspaces_untouched() {
        let gateway = FakeGateway::new();
        let keep = Instance::new("keep", "codewind", "x.nip.io", false, ImageSet::default(), None);
        gateway.insert("codewind", ClusterObject::Service(service(&keep, Member::Pfe)));

        let result = remove_stack(&gateway, "codewind", "gone").await;
        assert_eq!(result.service_pfe, RemovalStatus::NotFound);
        assert_eq!(gateway.object_count(), 1);
    }

    #[tokio::test]
    async fn test_remove_keycloak_only() {
        let gateway = FakeGateway::new();
        gateway.set_openshift(true);
        let options = DeployOptions {
            namespace: Some("codewind".to_string()),
            ingress_domain: Some("apps.example.com".to_string()),
            keycloak_only: true,
            ..DeployOptions::default()
        };
        let deployed = deploy(&gateway, |_| Ok(permissive_admin()), &options, &DeployContext::default())
            .await
            .unwrap();

        let result = remove_keycloak(&gateway, "codewind", &deployed.workspace_id).await;
        assert_eq!(result.deployment_keycloak, RemovalStatus::Removed);
        assert_eq!(result.secrets_keycloak, RemovalStatus::Removed);
        assert_eq!(result.pvc_keycloak, RemovalStatus::Removed);
        assert_eq!(result.service_accounts, RemovalStatus::Removed);
        assert_eq!(result.exposure_keycloak, RemovalStatus::Removed);
        assert_eq!(result.deployment_pfe, RemovalStatus::NotProcessed);
        assert_eq!(gateway.object_count(), 0);
    }
}
