//! Configuration file support for codewind-remote

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the project-local configuration file
pub const LOCAL_CONFIG_FILE: &str = ".codewind-remote.toml";

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub colors: Colors,

    #[serde(default)]
    pub behavior: Behavior,

    #[serde(default)]
    pub readiness: Readiness,
}

/// Default values for deployment options
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Defaults {
    /// Target namespace. The current kube context namespace is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Ingress domain. Discovered from the ingress controller when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_domain: Option<String>,

    #[serde(default = "default_keycloak_user")]
    pub keycloak_user: String,

    #[serde(default = "default_developer_user")]
    pub developer_user: String,

    #[serde(default = "default_realm")]
    pub realm: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default = "default_pfe_pvc_size")]
    pub pfe_pvc_size: String,

    #[serde(default = "default_keycloak_pvc_size")]
    pub keycloak_pvc_size: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Color and theme settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Colors {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Behavior settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Behavior {
    #[serde(default = "default_true")]
    pub confirm_destructive: bool,

    #[serde(default = "default_true")]
    pub show_progress: bool,
}

/// Readiness wait bounds
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Readiness {
    /// Number of pod watches opened per member before giving up
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Server-side timeout of each pod watch
    #[serde(default = "default_watch_timeout_secs")]
    pub watch_timeout_secs: u32,

    /// Delay before re-opening a watch, multiplied by the attempt number
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

// Default value functions
fn default_keycloak_user() -> String {
    "admin".to_string()
}

fn default_developer_user() -> String {
    "developer".to_string()
}

fn default_realm() -> String {
    "codewind".to_string()
}

fn default_client_id() -> String {
    "codewind".to_string()
}

fn default_pfe_pvc_size() -> String {
    "10Gi".to_string()
}

fn default_keycloak_pvc_size() -> String {
    "1Gi".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_attempts() -> u32 {
    10
}

fn default_watch_timeout_secs() -> u32 {
    240
}

fn default_backoff_secs() -> u64 {
    5
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            namespace: None,
            ingress_domain: None,
            keycloak_user: default_keycloak_user(),
            developer_user: default_developer_user(),
            realm: default_realm(),
            client_id: default_client_id(),
            pfe_pvc_size: default_pfe_pvc_size(),
            keycloak_pvc_size: default_keycloak_pvc_size(),
            log_level: default_log_level(),
        }
    }
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            confirm_destructive: default_true(),
            show_progress: default_true(),
        }
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            watch_timeout_secs: default_watch_timeout_secs(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

impl Settings {
    /// Load settings from file or return defaults
    pub fn load() -> Self {
        match Self::find_config_file() {
            Some(path) => Self::load_from_file(&path).unwrap_or_else(|e| {
                crate::log_warn!("Ignoring config file {}: {:#}", path.display(), e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    /// Find config file in standard locations
    /// Priority:
    /// 1. .codewind-remote.toml in current directory
    /// 2. ~/.config/codewind-remote/config.toml (XDG config directory)
    pub fn find_config_file() -> Option<PathBuf> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        Self::user_config_path().filter(|p| p.exists())
    }

    /// Location of the per-user config file, whether or not it exists
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("codewind-remote").join("config.toml"))
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize settings")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Generate example config file content
    pub fn example_config() -> Result<String> {
        let header = "# codewind-remote configuration file\n\
                      # Place this file at ~/.config/codewind-remote/config.toml or .codewind-remote.toml in your project\n\n";
        let body = toml::to_string_pretty(&Settings::default())
            .context("Failed to serialize default settings")?;
        Ok(format!("{}{}", header, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.defaults.realm, "codewind");
        assert_eq!(settings.defaults.pfe_pvc_size, "10Gi");
        assert!(settings.colors.enabled);
        assert!(settings.behavior.confirm_destructive);
        assert_eq!(settings.readiness.attempts, 10);
    }

    #[test]
    fn test_settings_deserialization() {
        let toml_str = r#"
[defaults]
namespace = "cw"
ingress_domain = "apps.example.com"
realm = "team"

[behavior]
confirm_destructive = false

[readiness]
attempts = 3
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.defaults.namespace.as_deref(), Some("cw"));
        assert_eq!(settings.defaults.realm, "team");
        assert_eq!(settings.defaults.client_id, "codewind");
        assert!(!settings.behavior.confirm_destructive);
        assert_eq!(settings.readiness.attempts, 3);
        assert_eq!(settings.readiness.watch_timeout_secs, 240);
    }

    #[test]
    fn test_load_from_file() {
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(b"[defaults]\nlog_level = \"debug\"\n").unwrap();

        let settings = Settings::load_from_file(temp.path()).unwrap();
        assert_eq!(settings.defaults.log_level, "debug");
    }

    #[test]
    fn test_load_from_invalid_file() {
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(b"[defaults\n").unwrap();

        assert!(Settings::load_from_file(temp.path()).is_err());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.defaults.namespace = Some("saved".to_string());
        settings.save(&path).unwrap();

        let loaded = Settings::load_from_file(&path).unwrap();
        assert_eq!(loaded.defaults.namespace.as_deref(), Some("saved"));
    }

    #[test]
    fn test_example_config() {
        let example = Settings::example_config().unwrap();
        assert!(example.contains("codewind-remote configuration"));
        assert!(example.contains("[defaults]"));
        assert!(example.contains("[readiness]"));
    }
}
