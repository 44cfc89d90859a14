//! Deployment orchestrator
//!
//! Stages run strictly in order, each depending on what the previous one
//! produced:
//!
//! resolve environment, ensure namespace, detect platform, build the
//! instance, create service accounts, deploy Keycloak and wait, bootstrap
//! the realm, then deploy and wait for PFE, performance and gatekeeper.
//!
//! The first failing stage ends the run with a stage-labelled
//! [`CodewindError`]. Objects created so far stay in the cluster; the removal
//! engine cleans them up by workspace ID.

pub mod environment;
pub mod gatekeeper;
pub mod keycloak;
pub mod performance;
pub mod pfe;

use crate::config::images::ImageSet;
use crate::config::settings::Readiness;
use crate::k8s::certs::{self, IssuedCertificate};
use crate::k8s::readiness::wait_until_ready;
use crate::k8s::{ClusterGateway, ClusterObject};
use crate::keycloak::{BootstrapError, BootstrapOutcome, BootstrapRequest, IdentityAdmin, bootstrap};
use crate::resources::rbac::service_account;
use crate::stack::{DeployOptions, DeploymentResult, Instance, Member, generate_workspace_id};
use crate::utils::errors::{CodewindError, Stage};
use crate::utils::progress::StageProgress;
use std::time::Duration;

/// Everything a deployment needs besides the caller's options
#[derive(Debug, Clone, Default)]
pub struct DeployContext {
    pub images: ImageSet,
    pub readiness: Readiness,
    pub show_progress: bool,
}

/// Create one object, labelling a failure with `stage`
pub(crate) async fn create_object<G>(
    gateway: &G,
    instance: &Instance,
    stage: Stage,
    object: ClusterObject,
) -> Result<(), CodewindError>
where
    G: ClusterGateway + ?Sized,
{
    let kind = object.kind();
    let name = object.name().to_string();
    gateway
        .create(instance.namespace(), object)
        .await
        .map_err(|e| CodewindError::cluster(stage, format!("Failed to create {} '{}'", kind, name), e))?;
    crate::log_info!("Created {} {}", kind, name);
    Ok(())
}

pub(crate) fn issue_certificate(
    instance: &Instance,
    member: Member,
) -> Result<IssuedCertificate, CodewindError> {
    let host = instance.host(member);
    let title = format!("Codewind {}", member.short());
    certs::issue(&host, &title).map_err(|e| {
        CodewindError::new(
            Stage::IssueCertificates,
            format!("Failed to issue a certificate for {}", host),
        )
        .with_source(e)
    })
}

/// Members this run deploys, in deployment order
fn members(options: &DeployOptions) -> Vec<Member> {
    if options.keycloak_only {
        vec![Member::Keycloak]
    } else if options.external_keycloak_url.is_some() {
        vec![Member::Pfe, Member::Performance, Member::Gatekeeper]
    } else {
        vec![Member::Keycloak, Member::Pfe, Member::Performance, Member::Gatekeeper]
    }
}

async fn run_stage<T, Fut>(
    label: &str,
    visible: bool,
    stage: Fut,
) -> Result<T, CodewindError>
where
    Fut: std::future::Future<Output = Result<T, CodewindError>>,
{
    let progress = StageProgress::new(label, visible);
    match stage.await {
        Ok(value) => {
            progress.finish_success(label);
            Ok(value)
        }
        Err(e) => {
            progress.finish_error(&format!("{} ({})", label, e.stage));
            Err(e)
        }
    }
}

/// Deploy a Codewind stack.
///
/// `connect` builds the identity admin client for the Keycloak URL once it is
/// known. `options` is only read; the OAuth client secret discovered during
/// the bootstrap is passed on to the gatekeeper stage as a value.
pub async fn deploy<G, A, F>(
    gateway: &G,
    connect: F,
    options: &DeployOptions,
    ctx: &DeployContext,
) -> Result<DeploymentResult, CodewindError>
where
    G: ClusterGateway + ?Sized,
    A: IdentityAdmin,
    F: FnOnce(&str) -> Result<A, BootstrapError>,
{
    let visible = ctx.show_progress;

    let env = run_stage(
        "Resolving environment",
        visible,
        environment::resolve(
            gateway,
            options.namespace.as_deref(),
            options.ingress_domain.as_deref(),
        ),
    )
    .await?;

    let instance = Instance::new(
        generate_workspace_id(),
        env.namespace,
        env.ingress_domain,
        env.on_openshift,
        ctx.images.clone(),
        options.owner.clone(),
    );
    crate::log_info!(
        "Deploying workspace {} to namespace {}",
        instance.workspace_id(),
        instance.namespace()
    );

    let members = members(options);
    run_stage("Creating service accounts", visible, async {
        for member in &members {
            create_object(
                gateway,
                &instance,
                Stage::CreateServiceAccounts,
                ClusterObject::ServiceAccount(service_account(&instance, *member)),
            )
            .await?;
        }
        Ok(())
    })
    .await?;

    let keycloak_url = match options.external_keycloak_url.as_deref() {
        Some(url) => {
            crate::log_info!("Using existing Keycloak at {}", url);
            url.trim_end_matches('/').to_string()
        }
        None => {
            run_stage(
                "Deploying Keycloak",
                visible,
                keycloak::deploy(gateway, &instance, options),
            )
            .await?;
            wait_for(gateway, &instance, Member::Keycloak, ctx).await?;
            instance.url(Member::Keycloak, options.keycloak_tls_secure)
        }
    };
    let gatekeeper_url = instance.url(Member::Gatekeeper, options.gatekeeper_tls_secure);

    let outcome = run_stage("Configuring Keycloak", visible, async {
        let admin = connect(&keycloak_url)?;
        let request = bootstrap_request(&instance, options, ctx, &gatekeeper_url);
        Ok::<BootstrapOutcome, CodewindError>(bootstrap(&admin, &request).await?)
    })
    .await?;

    if options.keycloak_only {
        crate::log_info!("Keycloak ready at {}", keycloak_url);
        return Ok(DeploymentResult {
            workspace_id: instance.workspace_id().to_string(),
            namespace: instance.namespace().to_string(),
            gatekeeper_url: String::new(),
            keycloak_url,
        });
    }

    let oauth_secret = outcome.client_secret.ok_or_else(|| {
        CodewindError::new(Stage::BootstrapIdentity, "Keycloak returned no client secret")
    })?;

    run_stage(
        "Deploying PFE",
        visible,
        pfe::deploy(gateway, &instance, options, &keycloak_url),
    )
    .await?;
    wait_for(gateway, &instance, Member::Pfe, ctx).await?;

    run_stage(
        "Deploying performance dashboard",
        visible,
        performance::deploy(gateway, &instance),
    )
    .await?;
    wait_for(gateway, &instance, Member::Performance, ctx).await?;

    run_stage(
        "Deploying gatekeeper",
        visible,
        gatekeeper::deploy(gateway, &instance, options, &keycloak_url, &oauth_secret),
    )
    .await?;
    wait_for(gateway, &instance, Member::Gatekeeper, ctx).await?;

    crate::log_info!("Codewind is available at {}", gatekeeper_url);
    Ok(DeploymentResult {
        workspace_id: instance.workspace_id().to_string(),
        namespace: instance.namespace().to_string(),
        gatekeeper_url,
        keycloak_url,
    })
}

async fn wait_for<G>(
    gateway: &G,
    instance: &Instance,
    member: Member,
    ctx: &DeployContext,
) -> Result<(), CodewindError>
where
    G: ClusterGateway + ?Sized,
{
    wait_until_ready(
        gateway,
        instance.namespace(),
        instance.workspace_id(),
        member,
        &ctx.readiness,
        ctx.show_progress,
    )
    .await
}

fn bootstrap_request(
    instance: &Instance,
    options: &DeployOptions,
    ctx: &DeployContext,
    gatekeeper_url: &str,
) -> BootstrapRequest {
    BootstrapRequest {
        admin_user: options.keycloak_user.clone(),
        admin_password: options.keycloak_password.clone(),
        realm: options.realm.clone(),
        client_id: options.client_id.clone(),
        developer_user: options.developer_user.clone(),
        developer_password: options.developer_password.clone(),
        gatekeeper_url: gatekeeper_url.to_string(),
        access_role: instance.access_role(),
        realm_only: options.keycloak_only,
        login_attempts: ctx.readiness.attempts,
        login_backoff: Duration::from_secs(ctx.readiness.backoff_secs),
    }
}
