//! Deploy command implementation

use crate::commands::{OutputFormat, render};
use crate::install::{DeployContext, deploy};
use crate::k8s::ClusterGateway;
use crate::keycloak::{BootstrapError, BootstrapOp, KeycloakClient};
use crate::stack::{DeployOptions, DeploymentResult};
use crate::utils::prompt;
use anyhow::Result;
use colored::Colorize;

/// Fill in passwords that were not given on the command line
pub fn prompt_for_missing(options: &mut DeployOptions) -> Result<()> {
    if options.keycloak_password.is_empty() {
        options.keycloak_password =
            prompt::password(&format!("Keycloak admin password for '{}'", options.keycloak_user))?;
    }
    if options.developer_password.is_empty() && !options.keycloak_only {
        options.developer_password =
            prompt::password(&format!("Password for developer '{}'", options.developer_user))?;
    }
    Ok(())
}

/// Handle deploy command
pub async fn run<G>(
    gateway: &G,
    options: &DeployOptions,
    ctx: &DeployContext,
    format: OutputFormat,
) -> Result<()>
where
    G: ClusterGateway + ?Sized,
{
    crate::log_info!("Deploying Codewind with images:");
    for (member, image) in ctx.images.list() {
        crate::log_info!("  {:<12} {}", member.to_string(), image);
    }

    // Exposed endpoints use self-signed certificates
    let connect = |url: &str| {
        KeycloakClient::new(url, true).map_err(|e| BootstrapError::from_admin(BootstrapOp::Login, e))
    };
    let result = deploy(gateway, connect, options, ctx).await?;

    match render(&result, format)? {
        Some(out) => println!("{}", out),
        None => print_summary(&result),
    }
    Ok(())
}

fn print_summary(result: &DeploymentResult) {
    println!();
    println!("{}", "Codewind deployed".green().bold());
    println!("  Workspace:  {}", result.workspace_id);
    println!("  Namespace:  {}", result.namespace);
    println!("  Keycloak:   {}", result.keycloak_url);
    if !result.gatekeeper_url.is_empty() {
        println!("  Gatekeeper: {}", result.gatekeeper_url);
        println!();
        println!("Connect your IDE to {}", result.gatekeeper_url.cyan());
    }
}
