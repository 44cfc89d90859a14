//! Secret generators

use crate::k8s::certs::IssuedCertificate;
use crate::resources::object_meta;
use crate::stack::{Instance, Member};
use k8s_openapi::api::core::v1::Secret;
use std::collections::BTreeMap;

pub const KEYCLOAK_USER_SECRET: &str = "secret-keycloak-user";
pub const KEYCLOAK_TLS_SECRET: &str = "secret-keycloak-tls";
pub const SESSION_SECRET: &str = "secret-codewind-session";
pub const CLIENT_SECRET: &str = "secret-codewind-client";
pub const GATEKEEPER_TLS_SECRET: &str = "secret-codewind-tls";

pub const KEYCLOAK_USER_KEY: &str = "keycloak-admin-user";
pub const KEYCLOAK_PASSWORD_KEY: &str = "keycloak-admin-password";
pub const SESSION_KEY: &str = "session_secret";
pub const CLIENT_ID_KEY: &str = "client_id";
pub const CLIENT_SECRET_KEY: &str = "client_secret";

const TLS_TYPE: &str = "kubernetes.io/tls";

/// Name of the TLS secret holding an exposed member's certificate
pub fn tls_secret_name(instance: &Instance, member: Member) -> String {
    match member {
        Member::Keycloak => instance.scoped(KEYCLOAK_TLS_SECRET),
        _ => instance.scoped(GATEKEEPER_TLS_SECRET),
    }
}

/// Opaque key/value secret named `{prefix}-{workspaceID}`
pub fn secret(
    instance: &Instance,
    member: Member,
    prefix: &str,
    data: BTreeMap<String, String>,
) -> Secret {
    Secret {
        metadata: object_meta(instance, member, instance.scoped(prefix)),
        type_: Some("Opaque".to_string()),
        string_data: Some(data),
        ..Default::default()
    }
}

pub fn tls_secret(instance: &Instance, member: Member, cert: &IssuedCertificate) -> Secret {
    Secret {
        metadata: object_meta(instance, member, tls_secret_name(instance, member)),
        type_: Some(TLS_TYPE.to_string()),
        string_data: Some(BTreeMap::from([
            ("tls.crt".to_string(), cert.cert_pem.clone()),
            ("tls.key".to_string(), cert.key_pem.clone()),
        ])),
        ..Default::default()
    }
}

/// Identity provider admin credentials
pub fn keycloak_user_secret(instance: &Instance, user: &str, password: &str) -> Secret {
    secret(
        instance,
        Member::Keycloak,
        KEYCLOAK_USER_SECRET,
        BTreeMap::from([
            (KEYCLOAK_USER_KEY.to_string(), user.to_string()),
            (KEYCLOAK_PASSWORD_KEY.to_string(), password.to_string()),
        ]),
    )
}

/// Gatekeeper cookie encryption secret
pub fn session_secret(instance: &Instance, session: &str) -> Secret {
    secret(
        instance,
        Member::Gatekeeper,
        SESSION_SECRET,
        BTreeMap::from([(SESSION_KEY.to_string(), session.to_string())]),
    )
}

/// OAuth client credentials the gatekeeper authenticates with
pub fn client_secret(instance: &Instance, client_id: &str, client_secret: &str) -> Secret {
    secret(
        instance,
        Member::Gatekeeper,
        CLIENT_SECRET,
        BTreeMap::from([
            (CLIENT_ID_KEY.to_string(), client_id.to_string()),
            (CLIENT_SECRET_KEY.to_string(), client_secret.to_string()),
        ]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::instance;
    use crate::stack::WORKSPACE_LABEL;

    fn cert() -> IssuedCertificate {
        IssuedCertificate {
            key_pem: "KEY".to_string(),
            cert_pem: "CERT".to_string(),
        }
    }

    #[test]
    fn test_secret_names_are_workspace_scoped() {
        let instance = instance(false);
        let cases = [
            (keycloak_user_secret(&instance, "admin", "pw"), "secret-keycloak-user-k3x9az"),
            (session_secret(&instance, "s"), "secret-codewind-session-k3x9az"),
            (client_secret(&instance, "codewind", "c"), "secret-codewind-client-k3x9az"),
            (tls_secret(&instance, Member::Keycloak, &cert()), "secret-keycloak-tls-k3x9az"),
            (tls_secret(&instance, Member::Gatekeeper, &cert()), "secret-codewind-tls-k3x9az"),
        ];
        for (secret, name) in cases {
            assert_eq!(secret.metadata.name.as_deref(), Some(name));
            assert_eq!(
                secret.metadata.labels.unwrap().get(WORKSPACE_LABEL).map(String::as_str),
                Some("k3x9az")
            );
        }
    }

    #[test]
    fn test_generic_secret_name() {
        let s = secret(&instance(false), Member::Pfe, "codewind-pfe", BTreeMap::new());
        assert_eq!(s.metadata.name.as_deref(), Some("codewind-pfe-k3x9az"));
    }

    #[test]
    fn test_tls_secret_contents() {
        let secret = tls_secret(&instance(false), Member::Keycloak, &cert());
        assert_eq!(secret.type_.as_deref(), Some("kubernetes.io/tls"));
        let data = secret.string_data.unwrap();
        assert_eq!(data.get("tls.crt").unwrap(), "CERT");
        assert_eq!(data.get("tls.key").unwrap(), "KEY");
    }

    #[test]
    fn test_secrets_labelled_with_owning_member() {
        let instance = instance(false);
        let user = keycloak_user_secret(&instance, "admin", "pw");
        assert_eq!(user.metadata.labels.unwrap().get("app").unwrap(), "codewind-keycloak");
        let client = client_secret(&instance, "codewind", "c");
        assert_eq!(client.metadata.labels.unwrap().get("app").unwrap(), "codewind-gatekeeper");
    }
}
