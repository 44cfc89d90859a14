//! List command implementation

use crate::commands::{OutputFormat, render};
use crate::inventory::{ExistingDeployment, list_deployments};
use crate::k8s::ClusterGateway;
use anyhow::Result;
use colored::Colorize;

/// Handle list command. `all_namespaces` wins over `namespace`.
pub async fn run<G>(
    gateway: &G,
    namespace: Option<String>,
    all_namespaces: bool,
    format: OutputFormat,
) -> Result<()>
where
    G: ClusterGateway + ?Sized,
{
    let namespace = if all_namespaces {
        None
    } else {
        Some(
            namespace
                .filter(|ns| !ns.is_empty())
                .unwrap_or_else(|| gateway.current_namespace()),
        )
    };

    let deployments = list_deployments(gateway, namespace.as_deref()).await?;
    match render(&deployments, format)? {
        Some(out) => println!("{}", out),
        None if deployments.is_empty() => println!("No Codewind deployments found"),
        None => print!("{}", table(&deployments)),
    }
    Ok(())
}

fn table(deployments: &[ExistingDeployment]) -> String {
    let mut out = format!(
        "{:<12} {:<20} {:<10} {:<12} {:<22} {}\n",
        "WORKSPACE", "NAMESPACE", "VERSION", "REALM", "INSTALLED", "AUTH URL"
    )
    .bold()
    .to_string();
    for d in deployments {
        out.push_str(&format!(
            "{:<12} {:<20} {:<10} {:<12} {:<22} {}\n",
            d.workspace_id, d.namespace, d.version, d.realm, d.install_time, d.auth_url
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_one_row_per_deployment() {
        colored::control::set_override(false);
        let deployments = vec![ExistingDeployment {
            workspace_id: "abc".to_string(),
            namespace: "cw".to_string(),
            auth_url: "https://kc".to_string(),
            realm: "codewind".to_string(),
            version: "0.9.0".to_string(),
            install_time: "04-Mar-2020 10:20:30".to_string(),
        }];
        let out = table(&deployments);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("WORKSPACE"));
        assert!(lines[1].contains("04-Mar-2020 10:20:30"));
    }
}
