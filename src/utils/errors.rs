//! Stage-labelled errors with actionable suggestions

use crate::k8s::GatewayError;
use crate::keycloak::BootstrapError;
use crate::stack::Member;
use colored::Colorize;
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// The operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolveEnvironment,
    EnsureNamespace,
    DetectPlatform,
    CreateServiceAccounts,
    IssueCertificates,
    Deploy(Member),
    WaitReady(Member),
    BootstrapIdentity,
    Inventory,
    Removal,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::ResolveEnvironment => f.write_str("resolve_environment"),
            Stage::EnsureNamespace => f.write_str("ensure_namespace"),
            Stage::DetectPlatform => f.write_str("detect_platform"),
            Stage::CreateServiceAccounts => f.write_str("create_service_accounts"),
            Stage::IssueCertificates => f.write_str("issue_certificates"),
            Stage::Deploy(member) => write!(f, "deploy_{}", member.short()),
            Stage::WaitReady(member) => write!(f, "wait_ready_{}", member.short()),
            Stage::BootstrapIdentity => f.write_str("bootstrap_identity"),
            Stage::Inventory => f.write_str("inventory"),
            Stage::Removal => f.write_str("removal"),
        }
    }
}

/// Error carrying the failed stage, a description and suggestions for the user
#[derive(Error, Debug)]
#[error("{stage}: {message}")]
pub struct CodewindError {
    pub stage: Stage,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    pub suggestions: Vec<String>,
}

impl CodewindError {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            source: None,
            suggestions: Vec::new(),
        }
    }

    /// Attach the underlying error
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Add a suggestion to the error
    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Message including the chain of underlying errors
    pub fn description(&self) -> String {
        let mut desc = self.message.clone();
        let mut source = self.source.as_deref().map(|e| e as &(dyn std::error::Error + 'static));
        while let Some(err) = source {
            desc.push_str(": ");
            desc.push_str(&err.to_string());
            source = err.source();
        }
        desc
    }

    /// Display the error with suggestions
    pub fn display(&self) {
        eprintln!("{} [{}] {}", "Error:".red().bold(), self.stage, self.description());

        if !self.suggestions.is_empty() {
            eprintln!();
            eprintln!("{}", "Suggestions:".yellow().bold());
            for suggestion in &self.suggestions {
                eprintln!("  {} {}", "→".blue(), suggestion);
            }
        }
    }

    /// JSON rendering for machine consumers
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": self.stage.to_string(),
            "error_description": self.description(),
        })
    }

    // Common error patterns

    /// No ingress domain was given and none could be discovered
    pub fn no_ingress_service() -> Self {
        Self::new(
            Stage::ResolveEnvironment,
            "No ingress domain was given and no ingress-nginx service was found in the cluster",
        )
        .suggest("Pass the domain explicitly, e.g. --ingress-domain <ip>.nip.io")
        .suggest("Or install the ingress-nginx controller in the cluster")
    }

    pub fn namespace_failed(namespace: &str, source: GatewayError) -> Self {
        let suggest_permissions = source.is_forbidden();
        let err = Self::new(
            Stage::EnsureNamespace,
            format!("Unable to find or create namespace '{}'", namespace),
        )
        .with_source(source)
        .suggest("Check the namespace name is a valid DNS label");
        if suggest_permissions {
            err.suggest("Verify you may create namespaces, or create it beforehand")
        } else {
            err
        }
    }

    /// A cluster call inside a stage failed
    pub fn cluster(stage: Stage, what: impl Into<String>, source: GatewayError) -> Self {
        let hint = if source.is_forbidden() {
            Some("Verify you have sufficient cluster permissions (cluster-admin may be required)")
        } else if source.is_already_exists() {
            Some("A previous deployment left resources behind; remove it with: codewind-remote remove --workspace <id>")
        } else {
            None
        };
        let err = Self::new(stage, what).with_source(source);
        match hint {
            Some(h) => err.suggest(h),
            None => err,
        }
    }

    pub fn not_ready(member: Member, namespace: &str, attempts: u32) -> Self {
        Self::new(
            Stage::WaitReady(member),
            format!(
                "{} did not reach Running after {} watch attempts",
                member.prefix(),
                attempts
            ),
        )
        .suggest(format!("Check pod status: kubectl get pods -n {}", namespace))
        .suggest(format!(
            "View logs: kubectl logs -n {} -l app={}",
            namespace,
            member.prefix()
        ))
        .suggest("Raise readiness.attempts in the configuration file")
    }
}

impl From<BootstrapError> for CodewindError {
    fn from(err: BootstrapError) -> Self {
        let hint = err.hint();
        let err = Self::new(Stage::BootstrapIdentity, "Identity provider configuration failed")
            .with_source(err);
        match hint {
            Some(h) => err.suggest(h),
            None => err,
        }
    }
}
