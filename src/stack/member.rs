//! Stack members and their fixed per-member constants

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label key carrying the workspace ID on every generated object
pub const WORKSPACE_LABEL: &str = "codewindWorkspace";

/// Label key carrying the member prefix on every generated object
pub const APP_LABEL: &str = "app";

/// One of the four services that make up a Codewind stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Member {
    /// Application server (Project File Engine)
    Pfe,
    /// Performance metrics service
    Performance,
    /// Identity provider
    Keycloak,
    /// Edge proxy guarding the application server
    Gatekeeper,
}

impl Member {
    pub const ALL: [Member; 4] = [
        Member::Pfe,
        Member::Performance,
        Member::Keycloak,
        Member::Gatekeeper,
    ];

    /// Name prefix shared by the member's Deployment, Service and labels
    pub fn prefix(&self) -> &'static str {
        match self {
            Member::Pfe => "codewind-pfe",
            Member::Performance => "codewind-performance",
            Member::Keycloak => "codewind-keycloak",
            Member::Gatekeeper => "codewind-gatekeeper",
        }
    }

    /// Short name used in port names and error tags
    pub fn short(&self) -> &'static str {
        match self {
            Member::Pfe => "pfe",
            Member::Performance => "performance",
            Member::Keycloak => "keycloak",
            Member::Gatekeeper => "gatekeeper",
        }
    }

    pub fn port(&self) -> i32 {
        match self {
            Member::Pfe => 9191,
            Member::Performance => 9095,
            Member::Keycloak => 8080,
            Member::Gatekeeper => 9096,
        }
    }

    /// Environment variable overriding the image name
    pub fn image_env(&self) -> &'static str {
        match self {
            Member::Pfe => "PFE_IMAGE",
            Member::Performance => "PERFORMANCE_IMAGE",
            Member::Keycloak => "KEYCLOAK_IMAGE",
            Member::Gatekeeper => "GATEKEEPER_IMAGE",
        }
    }

    /// Environment variable overriding the image tag
    pub fn tag_env(&self) -> &'static str {
        match self {
            Member::Pfe => "PFE_TAG",
            Member::Performance => "PERFORMANCE_TAG",
            Member::Keycloak => "KEYCLOAK_TAG",
            Member::Gatekeeper => "GATEKEEPER_TAG",
        }
    }

    pub fn default_image(&self) -> &'static str {
        match self {
            Member::Pfe => "eclipse/codewind-pfe-amd64",
            Member::Performance => "eclipse/codewind-performance-amd64",
            Member::Keycloak => "eclipse/codewind-keycloak-amd64",
            Member::Gatekeeper => "eclipse/codewind-gatekeeper-amd64",
        }
    }

    /// Label selector matching every object of this member in one workspace
    pub fn selector(&self, workspace_id: &str) -> String {
        format!(
            "{}={},{}={}",
            APP_LABEL,
            self.prefix(),
            WORKSPACE_LABEL,
            workspace_id
        )
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

/// Label selector matching every object of one workspace
pub fn workspace_selector(workspace_id: &str) -> String {
    format!("{}={}", WORKSPACE_LABEL, workspace_id)
}
