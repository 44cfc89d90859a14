//! Command implementations for the codewind-remote CLI

pub mod config;
pub mod deploy;
pub mod list;
pub mod remove;

use anyhow::{Context, Result};
use serde::Serialize;

/// How command results are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

/// Serialize a result for the machine-readable formats; None for text
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<Option<String>> {
    match format {
        OutputFormat::Text => Ok(None),
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map(Some)
            .context("Failed to serialize result as JSON"),
        OutputFormat::Yaml => serde_yaml::to_string(value)
            .map(Some)
            .context("Failed to serialize result as YAML"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::DeploymentResult;

    fn result() -> DeploymentResult {
        DeploymentResult {
            workspace_id: "abc".to_string(),
            namespace: "cw".to_string(),
            gatekeeper_url: "https://gk".to_string(),
            keycloak_url: "https://kc".to_string(),
        }
    }

    #[test]
    fn test_text_renders_nothing() {
        assert!(render(&result(), OutputFormat::Text).unwrap().is_none());
    }

    #[test]
    fn test_json_and_yaml() {
        let json = render(&result(), OutputFormat::Json).unwrap().unwrap();
        assert!(json.contains("\"gatekeeperUrl\": \"https://gk\""));

        let yaml = render(&result(), OutputFormat::Yaml).unwrap().unwrap();
        assert!(yaml.contains("workspaceId: abc"));
    }
}
