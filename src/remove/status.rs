//! Per-kind removal outcomes

use crate::stack::Member;
use colored::Colorize;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of removing one resource kind.
///
/// Reports carry both the label and the numeric code:
/// `{"status": "removed", "code": 3}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalStatus {
    #[default]
    NotProcessed,
    Found,
    NotFound,
    Removed,
    Skipped,
    RemovalFailed,
}

impl RemovalStatus {
    /// Numeric status code, stable for scripts parsing the JSON report
    pub fn code(&self) -> u8 {
        match self {
            RemovalStatus::NotProcessed => 0,
            RemovalStatus::Found => 1,
            RemovalStatus::NotFound => 2,
            RemovalStatus::Removed => 3,
            RemovalStatus::Skipped => 4,
            RemovalStatus::RemovalFailed => 5,
        }
    }

    /// Machine-readable label
    pub fn label(&self) -> &'static str {
        match self {
            RemovalStatus::NotProcessed => "not_processed",
            RemovalStatus::Found => "found",
            RemovalStatus::NotFound => "not_found",
            RemovalStatus::Removed => "removed",
            RemovalStatus::Skipped => "skipped",
            RemovalStatus::RemovalFailed => "removal_failed",
        }
    }

    fn colored(&self) -> colored::ColoredString {
        let text = self.to_string();
        match self {
            RemovalStatus::Removed => text.green(),
            RemovalStatus::RemovalFailed => text.red(),
            RemovalStatus::Skipped | RemovalStatus::Found => text.yellow(),
            RemovalStatus::NotFound | RemovalStatus::NotProcessed => text.dimmed(),
        }
    }
}

impl Serialize for RemovalStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RemovalStatus", 2)?;
        state.serialize_field("status", self.label())?;
        state.serialize_field("code", &self.code())?;
        state.end()
    }
}

impl fmt::Display for RemovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RemovalStatus::NotProcessed => "not processed",
            RemovalStatus::Found => "found",
            RemovalStatus::NotFound => "not found",
            RemovalStatus::Removed => "removed",
            RemovalStatus::Skipped => "skipped",
            RemovalStatus::RemovalFailed => "removal failed",
        };
        f.write_str(text)
    }
}

/// Per-kind status report of one removal run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalResult {
    pub workspace_id: String,
    pub namespace: String,

    pub deployment_pfe: RemovalStatus,
    pub deployment_performance: RemovalStatus,
    pub deployment_keycloak: RemovalStatus,
    pub deployment_gatekeeper: RemovalStatus,

    pub service_pfe: RemovalStatus,
    pub service_performance: RemovalStatus,
    pub service_keycloak: RemovalStatus,
    pub service_gatekeeper: RemovalStatus,

    pub secrets_keycloak: RemovalStatus,
    pub secrets_gatekeeper: RemovalStatus,

    pub pvc_pfe: RemovalStatus,
    pub pvc_keycloak: RemovalStatus,

    pub service_accounts: RemovalStatus,
    pub role_bindings: RemovalStatus,
    pub tekton_cluster_role_bindings: RemovalStatus,

    pub exposure_keycloak: RemovalStatus,
    pub exposure_gatekeeper: RemovalStatus,

    /// Error text of each failed row, keyed by row label
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

impl RemovalResult {
    pub fn new(namespace: &str, workspace_id: &str) -> Self {
        Self {
            workspace_id: workspace_id.to_string(),
            namespace: namespace.to_string(),
            ..Default::default()
        }
    }

    pub fn deployment_mut(&mut self, member: Member) -> &mut RemovalStatus {
        match member {
            Member::Pfe => &mut self.deployment_pfe,
            Member::Performance => &mut self.deployment_performance,
            Member::Keycloak => &mut self.deployment_keycloak,
            Member::Gatekeeper => &mut self.deployment_gatekeeper,
        }
    }

    pub fn service_mut(&mut self, member: Member) -> &mut RemovalStatus {
        match member {
            Member::Pfe => &mut self.service_pfe,
            Member::Performance => &mut self.service_performance,
            Member::Keycloak => &mut self.service_keycloak,
            Member::Gatekeeper => &mut self.service_gatekeeper,
        }
    }

    /// Labelled statuses in report order
    pub fn rows(&self) -> Vec<(&'static str, RemovalStatus)> {
        vec![
            ("Deployment PFE", self.deployment_pfe),
            ("Deployment Performance", self.deployment_performance),
            ("Deployment Keycloak", self.deployment_keycloak),
            ("Deployment Gatekeeper", self.deployment_gatekeeper),
            ("Service PFE", self.service_pfe),
            ("Service Performance", self.service_performance),
            ("Service Keycloak", self.service_keycloak),
            ("Service Gatekeeper", self.service_gatekeeper),
            ("Secrets Keycloak", self.secrets_keycloak),
            ("Secrets Gatekeeper", self.secrets_gatekeeper),
            ("PVC PFE", self.pvc_pfe),
            ("PVC Keycloak", self.pvc_keycloak),
            ("Service Accounts", self.service_accounts),
            ("Role Bindings", self.role_bindings),
            ("Tekton Cluster Role Bindings", self.tekton_cluster_role_bindings),
            ("Exposure Keycloak", self.exposure_keycloak),
            ("Exposure Gatekeeper", self.exposure_gatekeeper),
        ]
    }

    /// Rows that failed, with their error text
    pub fn failures(&self) -> Vec<(&'static str, String)> {
        self.rows()
            .into_iter()
            .filter(|(_, status)| *status == RemovalStatus::RemovalFailed)
            .map(|(label, _)| (label, self.errors.get(label).cloned().unwrap_or_default()))
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.rows()
            .iter()
            .any(|(_, status)| *status == RemovalStatus::RemovalFailed)
    }

    /// Human readable report, one row per kind
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Removal of workspace {} in namespace {}\n",
            self.workspace_id, self.namespace
        );
        for (label, status) in self.rows() {
            out.push_str(&format!("  {:<30} {}\n", label, status.colored()));
        }
        for (label, error) in self.failures() {
            out.push_str(&format!("  {} {}: {}\n", "✗".red(), label, error));
        }
        out
    }

    /// Log the report row by row
    pub fn log(&self) {
        crate::log_info!(
            "Removal of workspace {} in namespace {}",
            self.workspace_id,
            self.namespace
        );
        for (label, status) in self.rows() {
            crate::log_info!("  {:<30} {}", label, status);
        }
        for (label, error) in self.failures() {
            crate::log_warn!("{} removal failed: {}", label, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(RemovalStatus::NotProcessed.code(), 0);
        assert_eq!(RemovalStatus::RemovalFailed.code(), 5);
        assert_eq!(RemovalStatus::default(), RemovalStatus::NotProcessed);
        assert_eq!(RemovalStatus::NotFound.to_string(), "not found");
    }

    #[test]
    fn test_rows_cover_every_field() {
        let result = RemovalResult::new("ns", "abc");
        assert_eq!(result.rows().len(), 17);
        assert!(
            result
                .rows()
                .iter()
                .all(|(_, s)| *s == RemovalStatus::NotProcessed)
        );
    }

    #[test]
    fn test_failures_carry_error_text() {
        let mut result = RemovalResult::new("ns", "abc");
        result.secrets_keycloak = RemovalStatus::RemovalFailed;
        result
            .errors
            .insert("Secrets Keycloak".to_string(), "forbidden".to_string());

        assert!(result.has_failures());
        assert_eq!(
            result.failures(),
            vec![("Secrets Keycloak", "forbidden".to_string())]
        );
        assert!(result.summary().contains("forbidden"));
    }

    #[test]
    fn test_json_shape() {
        let mut result = RemovalResult::new("ns", "abc");
        result.deployment_pfe = RemovalStatus::Removed;
        result.exposure_keycloak = RemovalStatus::Skipped;
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["deploymentPfe"], serde_json::json!({"status": "removed", "code": 3}));
        assert_eq!(json["exposureKeycloak"]["code"], 4);
        assert_eq!(json["pvcPfe"], serde_json::json!({"status": "not_processed", "code": 0}));
        assert_eq!(json["workspaceId"], "abc");
        assert!(json.get("errors").is_none());
    }
}
