//! Keycloak deployment

use crate::install::{create_object, issue_certificate};
use crate::k8s::{ClusterGateway, ClusterObject};
use crate::resources::exposure::exposure;
use crate::resources::secrets::{
    KEYCLOAK_PASSWORD_KEY, KEYCLOAK_USER_KEY, KEYCLOAK_USER_SECRET, keycloak_user_secret,
    tls_secret,
};
use crate::resources::storage::pvc;
use crate::resources::workload::{Workload, deployment, service};
use crate::stack::{DeployOptions, Instance, Member};
use crate::utils::errors::{CodewindError, Stage};

const DATA_DIR: &str = "/opt/jboss/keycloak/standalone/data";

pub fn workload(instance: &Instance) -> Workload {
    let credentials = instance.scoped(KEYCLOAK_USER_SECRET);
    Workload::default()
        .secret_env("KEYCLOAK_USER", &credentials, KEYCLOAK_USER_KEY)
        .secret_env("KEYCLOAK_PASSWORD", &credentials, KEYCLOAK_PASSWORD_KEY)
        .env("PROXY_ADDRESS_FORWARDING", "true")
        .env("DB_VENDOR", "h2")
        .env("KEYCLOAK_HOSTNAME", instance.host(Member::Keycloak))
        .pvc_volume("keycloak-data", &instance.pvc_name(Member::Keycloak), DATA_DIR)
}

/// Create the Keycloak secrets, PVC, Service, Deployment and exposure
pub async fn deploy<G>(
    gateway: &G,
    instance: &Instance,
    options: &DeployOptions,
) -> Result<(), CodewindError>
where
    G: ClusterGateway + ?Sized,
{
    let member = Member::Keycloak;
    let stage = Stage::Deploy(member);
    let cert = issue_certificate(instance, member)?;

    let objects = [
        ClusterObject::Secret(keycloak_user_secret(
            instance,
            &options.keycloak_user,
            &options.keycloak_password,
        )),
        ClusterObject::Secret(tls_secret(instance, member, &cert)),
        ClusterObject::PersistentVolumeClaim(pvc(instance, member, &options.keycloak_pvc_size)),
        ClusterObject::Service(service(instance, member)),
        ClusterObject::Deployment(deployment(instance, member, workload(instance))),
        exposure(instance, member, &cert),
    ];
    for object in objects {
        create_object(gateway, instance, stage, object).await?;
    }
    Ok(())
}
