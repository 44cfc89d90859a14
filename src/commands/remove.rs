//! Remove command implementation

use crate::commands::{OutputFormat, render};
use crate::k8s::ClusterGateway;
use crate::remove::{remove_keycloak, remove_stack};
use crate::utils::errors::{CodewindError, Stage};
use crate::utils::prompt;
use anyhow::Result;

/// Options for removing one stack
pub struct RemoveOptions {
    pub namespace: Option<String>,
    pub workspace_id: String,
    /// Remove only what a Keycloak-only deployment created
    pub keycloak_only: bool,
    /// Ask before deleting anything
    pub confirm: bool,
}

/// Handle remove command
pub async fn run<G>(gateway: &G, options: RemoveOptions, format: OutputFormat) -> Result<()>
where
    G: ClusterGateway + ?Sized,
{
    let namespace = options
        .namespace
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| gateway.current_namespace());

    if options.confirm {
        let question = format!(
            "Remove Codewind workspace {} from namespace {}?",
            options.workspace_id, namespace
        );
        if !prompt::confirm(&question)? {
            crate::log_info!("Removal cancelled");
            return Ok(());
        }
    }

    let result = if options.keycloak_only {
        remove_keycloak(gateway, &namespace, &options.workspace_id).await
    } else {
        remove_stack(gateway, &namespace, &options.workspace_id).await
    };

    match render(&result, format)? {
        Some(out) => println!("{}", out),
        None => print!("{}", result.summary()),
    }

    if result.has_failures() {
        let failed: Vec<&str> = result.failures().into_iter().map(|(label, _)| label).collect();
        return Err(CodewindError::new(
            Stage::Removal,
            format!("Some resources could not be removed: {}", failed.join(", ")),
        )
        .suggest("Re-run the removal once the cause is fixed; it is safe to repeat")
        .into());
    }
    Ok(())
}
