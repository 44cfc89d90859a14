//! Keycloak identity bootstrap

pub mod bootstrap;
pub mod client;

use std::fmt;
use thiserror::Error;

pub use bootstrap::{BootstrapOutcome, BootstrapRequest, bootstrap};
pub use client::{AdminError, IdentityAdmin, KeycloakClient};

/// Step of the bootstrap sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOp {
    Login,
    Realm,
    Client,
    Role,
    User,
    Grant,
    ClientSecret,
}

impl fmt::Display for BootstrapOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            BootstrapOp::Login => "keycloak_login",
            BootstrapOp::Realm => "keycloak_realm",
            BootstrapOp::Client => "keycloak_client",
            BootstrapOp::Role => "keycloak_role",
            BootstrapOp::User => "keycloak_user",
            BootstrapOp::Grant => "keycloak_grant",
            BootstrapOp::ClientSecret => "keycloak_client_secret",
        };
        f.write_str(tag)
    }
}

#[derive(Debug, Error)]
#[error("{op}: {desc}")]
pub struct BootstrapError {
    pub op: BootstrapOp,
    pub desc: String,
    /// HTTP status returned by Keycloak, when there was a response
    pub status: Option<u16>,
}

impl BootstrapError {
    pub fn new(op: BootstrapOp, desc: impl Into<String>) -> Self {
        Self {
            op,
            desc: desc.into(),
            status: None,
        }
    }

    pub fn from_admin(op: BootstrapOp, err: AdminError) -> Self {
        Self {
            op,
            status: err.status(),
            desc: err.to_string(),
        }
    }

    /// Something the user can try, when the failure suggests one
    pub fn hint(&self) -> Option<&'static str> {
        match (self.op, self.status) {
            (BootstrapOp::Login, Some(401)) => {
                Some("Check the Keycloak admin user and password (--keycloak-user, --keycloak-password)")
            }
            (BootstrapOp::Login, None) => {
                Some("Check the Keycloak URL is reachable from this machine and its ingress host resolves")
            }
            (_, Some(403)) => Some("The Keycloak admin user lacks permission on the master realm"),
            _ => None,
        }
    }
}
