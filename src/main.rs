//! codewind-remote CLI - deploy, inspect and remove remote Codewind stacks

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use codewind_remote::commands::{self, OutputFormat, remove::RemoveOptions};
use codewind_remote::config::images::ImageSet;
use codewind_remote::config::settings::Settings;
use codewind_remote::k8s::KubeGateway;
use codewind_remote::stack::DeployOptions;
use codewind_remote::utils::logger;
use codewind_remote::{CodewindError, DeployContext};
use colored::Colorize;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "codewind-remote")]
#[command(author, version, about = "Deploy and manage remote Codewind stacks", long_about = None)]
struct Cli {
    /// Verbose output (can be used multiple times: -v, -vv, -vvv)
    /// -v: INFO, -vv: DEBUG, -vvv: TRACE
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to kubeconfig file
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Shorthand for --output json; errors are also reported as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a Codewind stack
    Deploy {
        /// Target namespace (default: current context namespace)
        #[arg(short, long, env = "CODEWIND_NAMESPACE")]
        namespace: Option<String>,

        /// Ingress domain, e.g. apps.mycluster.example.com (discovered on Kubernetes when omitted)
        #[arg(long)]
        ingress: Option<String>,

        /// Keycloak admin user
        #[arg(long)]
        kadminuser: Option<String>,

        /// Keycloak admin password (prompted when omitted)
        #[arg(long, env = "CODEWIND_KEYCLOAK_ADMIN_PASSWORD", hide_env_values = true)]
        kadminpass: Option<String>,

        /// Developer user created in the realm
        #[arg(long)]
        kdevuser: Option<String>,

        /// Developer password (prompted when omitted)
        #[arg(long, env = "CODEWIND_DEVELOPER_PASSWORD", hide_env_values = true)]
        kdevpass: Option<String>,

        /// Keycloak realm
        #[arg(long)]
        krealm: Option<String>,

        /// Keycloak OAuth client ID
        #[arg(long)]
        kclient: Option<String>,

        /// Deploy and configure Keycloak only
        #[arg(long, conflicts_with = "kurl")]
        konly: bool,

        /// Use an existing Keycloak instead of deploying one
        #[arg(long)]
        kurl: Option<String>,

        /// Size of the workspace volume
        #[arg(long)]
        pfe_pvc_size: Option<String>,

        /// Size of the Keycloak data volume
        #[arg(long)]
        keycloak_pvc_size: Option<String>,

        /// Log level of the application server
        #[arg(long)]
        log_level: Option<String>,
    },

    /// Remove a Codewind stack
    Remove {
        /// Workspace ID of the stack
        #[arg(short, long)]
        workspace: String,

        /// Namespace of the stack (default: current context namespace)
        #[arg(short, long, env = "CODEWIND_NAMESPACE")]
        namespace: Option<String>,

        /// Remove a Keycloak-only deployment
        #[arg(long)]
        konly: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List deployed Codewind stacks
    List {
        /// Namespace to search (default: current context namespace)
        #[arg(short, long, env = "CODEWIND_NAMESPACE")]
        namespace: Option<String>,

        /// Search every namespace
        #[arg(short = 'A', long)]
        all_namespaces: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write an example configuration file
    Init {
        /// Write .codewind-remote.toml in the current directory
        #[arg(long)]
        local: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show where configuration files are looked up
    Path,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    let settings = Settings::load();
    if !settings.colors.enabled {
        colored::control::set_override(false);
    }

    let json = cli.json || cli.output == OutputFormat::Json;
    if let Err(err) = run(cli, settings).await {
        report(&err, json);
        std::process::exit(1);
    }
}

fn report(err: &anyhow::Error, json: bool) {
    match (err.downcast_ref::<CodewindError>(), json) {
        (Some(e), true) => println!("{}", e.to_json()),
        (Some(e), false) => e.display(),
        (None, true) => println!(
            "{}",
            serde_json::json!({ "error": "cli", "error_description": format!("{:#}", err) })
        ),
        (None, false) => eprintln!("{} {:#}", "Error:".red().bold(), err),
    }
}

async fn run(cli: Cli, settings: Settings) -> Result<()> {
    let format = if cli.json { OutputFormat::Json } else { cli.output };

    match cli.command {
        Commands::Deploy {
            namespace,
            ingress,
            kadminuser,
            kadminpass,
            kdevuser,
            kdevpass,
            krealm,
            kclient,
            konly,
            kurl,
            pfe_pvc_size,
            keycloak_pvc_size,
            log_level,
        } => {
            let mut options = DeployOptions::from_settings(&settings);
            options.namespace = namespace.or(options.namespace);
            options.ingress_domain = ingress.or(options.ingress_domain);
            options.keycloak_user = kadminuser.unwrap_or(options.keycloak_user);
            options.keycloak_password = kadminpass.unwrap_or_default();
            options.developer_user = kdevuser.unwrap_or(options.developer_user);
            options.developer_password = kdevpass.unwrap_or_default();
            options.realm = krealm.unwrap_or(options.realm);
            options.client_id = kclient.unwrap_or(options.client_id);
            options.keycloak_only = konly;
            options.external_keycloak_url = kurl;
            options.pfe_pvc_size = pfe_pvc_size.unwrap_or(options.pfe_pvc_size);
            options.keycloak_pvc_size = keycloak_pvc_size.unwrap_or(options.keycloak_pvc_size);
            options.log_level = log_level.unwrap_or(options.log_level);
            commands::deploy::prompt_for_missing(&mut options)?;

            let ctx = DeployContext {
                images: ImageSet::from_env(),
                readiness: settings.readiness.clone(),
                // Spinners would interleave with machine-readable output
                show_progress: settings.behavior.show_progress && format == OutputFormat::Text,
            };
            let gateway = KubeGateway::connect(cli.kubeconfig.as_deref()).await?;
            commands::deploy::run(&gateway, &options, &ctx, format).await
        }
        Commands::Remove {
            workspace,
            namespace,
            konly,
            yes,
        } => {
            let gateway = KubeGateway::connect(cli.kubeconfig.as_deref()).await?;
            let options = RemoveOptions {
                namespace: namespace.or(settings.defaults.namespace.clone()),
                workspace_id: workspace,
                keycloak_only: konly,
                confirm: !yes && settings.behavior.confirm_destructive,
            };
            commands::remove::run(&gateway, options, format).await
        }
        Commands::List {
            namespace,
            all_namespaces,
        } => {
            let gateway = KubeGateway::connect(cli.kubeconfig.as_deref()).await?;
            let namespace = namespace.or(settings.defaults.namespace.clone());
            commands::list::run(&gateway, namespace, all_namespaces, format).await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::config::show(),
            ConfigCommands::Init { local, force } => commands::config::init(local, force),
            ConfigCommands::Path => commands::config::path(),
        },
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "codewind-remote", &mut io::stdout());
            Ok(())
        }
        Commands::Version => {
            println!("codewind-remote {}", env!("CARGO_PKG_VERSION"));
            println!("Deploy and manage remote Codewind stacks");
            Ok(())
        }
    }
}
