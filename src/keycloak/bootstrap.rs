//! Get-or-create sequence establishing the realm, client, role and developer user

use crate::keycloak::client::{
    ClientRepresentation, IdentityAdmin, RealmRepresentation, UserRepresentation,
};
use crate::keycloak::{BootstrapError, BootstrapOp};
use std::time::Duration;

/// What to configure in Keycloak
#[derive(Debug, Clone)]
pub struct BootstrapRequest {
    pub admin_user: String,
    pub admin_password: String,
    pub realm: String,
    pub client_id: String,
    pub developer_user: String,
    pub developer_password: String,
    /// Public gatekeeper URL; `{url}/*` becomes a client redirect URI
    pub gatekeeper_url: String,
    /// Realm role granting access to this stack
    pub access_role: String,
    /// Stop once the realm exists
    pub realm_only: bool,
    /// Keycloak keeps refusing logins for a while after its pod is Running
    pub login_attempts: u32,
    pub login_backoff: Duration,
}

/// Result of a bootstrap; nothing else is written back to the caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BootstrapOutcome {
    /// None for a realm-only run
    pub client_secret: Option<String>,
}

fn fail(op: BootstrapOp) -> impl FnOnce(crate::keycloak::AdminError) -> BootstrapError {
    move |err| BootstrapError::from_admin(op, err)
}

async fn login<A>(admin: &A, request: &BootstrapRequest) -> Result<String, BootstrapError>
where
    A: IdentityAdmin + ?Sized,
{
    let attempts = request.login_attempts.max(1);
    let mut attempt = 1;
    loop {
        match admin.login(&request.admin_user, &request.admin_password).await {
            Ok(token) => return Ok(token),
            // Bad credentials will not improve with retries
            Err(err) if err.status() == Some(401) || attempt >= attempts => {
                return Err(BootstrapError::from_admin(BootstrapOp::Login, err));
            }
            Err(err) => {
                crate::log_info!(
                    "Keycloak login failed (attempt {}/{}): {}",
                    attempt,
                    attempts,
                    err
                );
                tokio::time::sleep(request.login_backoff).await;
                attempt += 1;
            }
        }
    }
}

/// Run the bootstrap sequence against `admin`.
///
/// Every step fetches first and creates only what is missing, except the
/// access role which is unique per workspace and always created. The first
/// failing step aborts the sequence.
pub async fn bootstrap<A>(
    admin: &A,
    request: &BootstrapRequest,
) -> Result<BootstrapOutcome, BootstrapError>
where
    A: IdentityAdmin + ?Sized,
{
    let token = login(admin, request).await?;
    let realm = request.realm.as_str();

    // Realm
    match admin.get_realm(&token, realm).await.map_err(fail(BootstrapOp::Realm))? {
        Some(_) => crate::log_info!("Realm '{}' already exists", realm),
        None => {
            let representation = RealmRepresentation {
                realm: realm.to_string(),
                enabled: true,
                display_name: Some("Codewind".to_string()),
            };
            admin
                .create_realm(&token, &representation)
                .await
                .map_err(fail(BootstrapOp::Realm))?;
            crate::log_info!("Created realm '{}'", realm);
        }
    }

    if request.realm_only {
        return Ok(BootstrapOutcome::default());
    }

    // Client
    let redirect = format!("{}/*", request.gatekeeper_url.trim_end_matches('/'));
    let client = match admin
        .get_client(&token, realm, &request.client_id)
        .await
        .map_err(fail(BootstrapOp::Client))?
    {
        Some(mut existing) => {
            crate::log_info!("Client '{}' already exists, adding redirect {}", request.client_id, redirect);
            if !existing.redirect_uris.contains(&redirect) {
                existing.redirect_uris.push(redirect);
            }
            admin
                .update_client(&token, realm, &existing)
                .await
                .map_err(fail(BootstrapOp::Client))?;
            existing
        }
        None => {
            let representation = ClientRepresentation {
                id: None,
                client_id: request.client_id.clone(),
                enabled: true,
                public_client: false,
                standard_flow_enabled: true,
                direct_access_grants_enabled: true,
                redirect_uris: vec![redirect],
            };
            admin
                .create_client(&token, realm, &representation)
                .await
                .map_err(fail(BootstrapOp::Client))?;
            crate::log_info!("Created client '{}'", request.client_id);
            admin
                .get_client(&token, realm, &request.client_id)
                .await
                .map_err(fail(BootstrapOp::Client))?
                .ok_or_else(|| {
                    BootstrapError::new(BootstrapOp::Client, "client missing after creation")
                })?
        }
    };

    // Access role
    admin
        .create_role(&token, realm, &request.access_role)
        .await
        .map_err(fail(BootstrapOp::Role))?;
    crate::log_info!("Created role '{}'", request.access_role);

    // Developer user
    let username = request.developer_user.as_str();
    let user = match admin
        .get_user(&token, realm, username)
        .await
        .map_err(fail(BootstrapOp::User))?
    {
        Some(existing) => {
            crate::log_info!("User '{}' already exists, keeping its password", username);
            existing
        }
        None => {
            let representation = UserRepresentation {
                id: None,
                username: username.to_string(),
                enabled: true,
            };
            admin
                .create_user(&token, realm, &representation)
                .await
                .map_err(fail(BootstrapOp::User))?;
            let created = admin
                .get_user(&token, realm, username)
                .await
                .map_err(fail(BootstrapOp::User))?
                .ok_or_else(|| BootstrapError::new(BootstrapOp::User, "user missing after creation"))?;
            let id = created
                .id
                .as_deref()
                .ok_or_else(|| BootstrapError::new(BootstrapOp::User, "created user has no id"))?;
            admin
                .set_password(&token, realm, id, &request.developer_password)
                .await
                .map_err(fail(BootstrapOp::User))?;
            crate::log_info!("Created user '{}'", username);
            created
        }
    };

    // Grant
    let user_id = user
        .id
        .as_deref()
        .ok_or_else(|| BootstrapError::new(BootstrapOp::Grant, format!("user '{}' has no id", username)))?;
    admin
        .grant_role(&token, realm, user_id, &request.access_role)
        .await
        .map_err(fail(BootstrapOp::Grant))?;

    // Client secret
    let client_uuid = client.id.as_deref().ok_or_else(|| {
        BootstrapError::new(BootstrapOp::ClientSecret, format!("client '{}' has no id", client.client_id))
    })?;
    let secret = admin
        .client_secret(&token, realm, client_uuid)
        .await
        .map_err(fail(BootstrapOp::ClientSecret))?;

    Ok(BootstrapOutcome {
        client_secret: Some(secret),
    })
}
