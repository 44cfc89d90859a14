//! Caller-supplied deployment options and the deployment result

use crate::config::settings::Settings;
use crate::stack::instance::OwnerRef;
use serde::{Deserialize, Serialize};

/// Options for deploying one stack
#[derive(Debug, Clone, PartialEq)]
pub struct DeployOptions {
    /// Target namespace; the current kube context namespace when unset
    pub namespace: Option<String>,
    /// Ingress domain suffix; discovered from the ingress controller when unset
    pub ingress_domain: Option<String>,
    pub keycloak_user: String,
    pub keycloak_password: String,
    pub developer_user: String,
    pub developer_password: String,
    pub realm: String,
    pub client_id: String,
    pub keycloak_tls_secure: bool,
    pub gatekeeper_tls_secure: bool,
    pub pfe_pvc_size: String,
    pub keycloak_pvc_size: String,
    pub log_level: String,
    /// Deploy and configure the identity provider only
    pub keycloak_only: bool,
    /// Use an already running identity provider instead of deploying one
    pub external_keycloak_url: Option<String>,
    pub owner: Option<OwnerRef>,
}

impl DeployOptions {
    /// Options seeded from the configuration file defaults
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = &settings.defaults;
        Self {
            namespace: defaults.namespace.clone(),
            ingress_domain: defaults.ingress_domain.clone(),
            keycloak_user: defaults.keycloak_user.clone(),
            keycloak_password: String::new(),
            developer_user: defaults.developer_user.clone(),
            developer_password: String::new(),
            realm: defaults.realm.clone(),
            client_id: defaults.client_id.clone(),
            keycloak_tls_secure: true,
            gatekeeper_tls_secure: true,
            pfe_pvc_size: defaults.pfe_pvc_size.clone(),
            keycloak_pvc_size: defaults.keycloak_pvc_size.clone(),
            log_level: defaults.log_level.clone(),
            keycloak_only: false,
            external_keycloak_url: None,
            owner: None,
        }
    }
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Public endpoints of a successfully deployed stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    pub workspace_id: String,
    pub namespace: String,
    /// Empty for a Keycloak-only deployment
    pub gatekeeper_url: String,
    pub keycloak_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_settings() {
        let options = DeployOptions::default();
        assert_eq!(options.realm, "codewind");
        assert_eq!(options.client_id, "codewind");
        assert!(options.gatekeeper_tls_secure);
        assert!(!options.keycloak_only);
        assert!(options.namespace.is_none());
    }

    #[test]
    fn test_result_json_shape() {
        let result = DeploymentResult {
            workspace_id: "k1x2".to_string(),
            namespace: "codewind".to_string(),
            gatekeeper_url: "https://gk".to_string(),
            keycloak_url: "https://kc".to_string(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["gatekeeperUrl"], "https://gk");
        assert_eq!(json["workspaceId"], "k1x2");
    }
}
