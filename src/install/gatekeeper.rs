//! Gatekeeper deployment

use crate::install::{create_object, issue_certificate};
use crate::k8s::{ClusterGateway, ClusterObject};
use crate::resources::exposure::exposure;
use crate::resources::secrets::{
    CLIENT_ID_KEY, CLIENT_SECRET, CLIENT_SECRET_KEY, SESSION_KEY, SESSION_SECRET, client_secret,
    session_secret, tls_secret, tls_secret_name,
};
use crate::resources::workload::{Workload, deployment, service};
use crate::stack::{DeployOptions, Instance, Member};
use crate::utils::errors::{CodewindError, Stage};
use rand::distributions::{Alphanumeric, DistString};

const CERT_DIR: &str = "/etc/gatekeeper/tls";
const SESSION_SECRET_LEN: usize = 32;

pub fn workload(instance: &Instance, options: &DeployOptions, keycloak_url: &str) -> Workload {
    let client = instance.scoped(CLIENT_SECRET);
    let session = instance.scoped(SESSION_SECRET);
    Workload::default()
        .env("AUTH_URL", keycloak_url)
        .env("REALM", options.realm.as_str())
        .secret_env("CLIENT_ID", &client, CLIENT_ID_KEY)
        .secret_env("CLIENT_SECRET", &client, CLIENT_SECRET_KEY)
        .secret_env("SESSION_SECRET", &session, SESSION_KEY)
        .env("ACCESS_ROLE", instance.access_role())
        .env("WORKSPACE_ID", instance.workspace_id())
        .env(
            "WORKSPACE_SERVICE",
            format!("https://{}:{}", instance.name(Member::Pfe), Member::Pfe.port()),
        )
        .env("GATEKEEPER_HOST", instance.host(Member::Gatekeeper))
        .env("ENABLE_AUTH", "1")
        .env("PORTAL_HTTPS", "true")
        .secret_volume(
            "gatekeeper-tls",
            &tls_secret_name(instance, Member::Gatekeeper),
            CERT_DIR,
        )
}

/// Create the gatekeeper secrets, Service, Deployment and exposure
pub async fn deploy<G>(
    gateway: &G,
    instance: &Instance,
    options: &DeployOptions,
    keycloak_url: &str,
    oauth_client_secret: &str,
) -> Result<(), CodewindError>
where
    G: ClusterGateway + ?Sized,
{
    let member = Member::Gatekeeper;
    let stage = Stage::Deploy(member);
    let cert = issue_certificate(instance, member)?;
    let session = Alphanumeric.sample_string(&mut rand::thread_rng(), SESSION_SECRET_LEN);

    let objects = [
        ClusterObject::Secret(session_secret(instance, &session)),
        ClusterObject::Secret(client_secret(instance, &options.client_id, oauth_client_secret)),
        ClusterObject::Secret(tls_secret(instance, member, &cert)),
        ClusterObject::Service(service(instance, member)),
        ClusterObject::Deployment(deployment(
            instance,
            member,
            workload(instance, options, keycloak_url),
        )),
        exposure(instance, member, &cert),
    ];
    for object in objects {
        create_object(gateway, instance, stage, object).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::ResourceKind;
    use crate::k8s::fake::FakeGateway;
    use crate::resources::testing::instance;

    #[test]
    fn test_secrets_referenced_not_inlined() {
        let workload = workload(&instance(false), &DeployOptions::default(), "https://kc");
        let secret = workload.env.iter().find(|e| e.name == "CLIENT_SECRET").unwrap();
        assert!(secret.value.is_none());
        assert_eq!(workload.volumes.len(), 1);
    }

    #[tokio::test]
    async fn test_creates_three_secrets_then_workload() {
        let gateway = FakeGateway::new();
        deploy(&gateway, &instance(false), &DeployOptions::default(), "https://kc", "s")
            .await
            .unwrap();

        let kinds: Vec<ResourceKind> = gateway.created().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![
                ResourceKind::Secret,
                ResourceKind::Secret,
                ResourceKind::Secret,
                ResourceKind::Service,
                ResourceKind::Deployment,
                ResourceKind::Ingress,
            ]
        );
    }
}
