//! Configuration settings management
//!
//! This module handles loading configuration from multiple sources
//! and resolving per-environment settings.

use crate::error::{Result, VaultenvError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Name of the environment that resolves no secrets unless configured otherwise
pub const LOCAL_ENVIRONMENT: &str = "local";

/// Which backend resolves secret references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    KeyVault,
    None,
}

impl FromStr for ProviderKind {
    type Err = VaultenvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "keyvault" => Ok(Self::KeyVault),
            "none" => Ok(Self::None),
            other => Err(VaultenvError::config(format!(
                "Unknown secret provider '{}' (expected 'keyvault' or 'none')",
                other
            ))),
        }
    }
}

/// Per-environment overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub vault: Option<String>,
    pub provider: Option<ProviderKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    pub default_vault: String,
    pub auth_method: String,
    pub tenant_id: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub max_retries: usize,
    pub resolve_timeout_secs: u64,
    pub environments: HashMap<String, EnvironmentConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            default_vault: String::new(),
            auth_method: "default".to_string(),
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            max_retries: 3,
            resolve_timeout_secs: 30,
            environments: HashMap::new(),
        }
    }
}

/// Settings resolved for one named environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSettings {
    pub name: String,
    pub provider: ProviderKind,
    pub vault: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        match self.auth_method.to_lowercase().as_str() {
            "default" | "defaultazurecredential" | "clientsecret" => {}
            other => {
                return Err(VaultenvError::config(format!(
                    "Unsupported auth_method '{}'",
                    other
                )))
            }
        }

        if self.resolve_timeout_secs == 0 {
            return Err(VaultenvError::config("resolve_timeout_secs must be greater than zero"));
        }

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        // Use XDG Base Directory specification on Linux and macOS
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            use std::env;
            let config_dir = if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
                PathBuf::from(xdg_config_home)
            } else {
                let home_dir = env::var("HOME")
                    .map_err(|_| VaultenvError::config("HOME environment variable not set"))?;
                PathBuf::from(home_dir).join(".config")
            };
            Ok(config_dir.join("vaultenv").join("vaultenv.toml"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            let config_dir = dirs::config_dir()
                .ok_or_else(|| VaultenvError::config("Unable to determine config directory"))?;
            Ok(config_dir.join("vaultenv").join("vaultenv.toml"))
        }
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    /// Resolve provider and vault for a named environment
    /// Priority: environment section > top-level default
    pub fn environment(&self, name: &str) -> EnvironmentSettings {
        let section = self.environments.get(name);

        let default_provider = if name == LOCAL_ENVIRONMENT {
            ProviderKind::None
        } else {
            ProviderKind::KeyVault
        };
        let provider = section
            .and_then(|s| s.provider)
            .unwrap_or(default_provider);

        let vault = section
            .and_then(|s| s.vault.clone())
            .or_else(|| Some(self.default_vault.clone()))
            .filter(|v| !v.is_empty());

        EnvironmentSettings {
            name: name.to_string(),
            provider,
            vault,
        }
    }

    /// Settings handed to the authentication provider factory
    pub fn auth_settings(&self) -> HashMap<String, String> {
        let mut settings = HashMap::new();
        settings.insert("tenant_id".to_string(), self.tenant_id.clone());
        settings.insert("client_id".to_string(), self.client_id.clone());
        settings.insert("client_secret".to_string(), self.client_secret.clone());
        settings
    }
}

/// Load configuration from multiple sources with priority order:
/// 1. Command-line flags (handled by clap)
/// 2. Environment variables
/// 3. Configuration file
/// 4. Default values
pub async fn load_config() -> Result<Config> {
    let config_path = Config::get_config_path()?;
    let mut config = if config_path.exists() {
        load_from_file(&config_path).await?
    } else {
        Config::default()
    };

    load_from_env(&mut config);
    config.validate()?;

    Ok(config)
}

pub async fn load_from_file(path: &Path) -> Result<Config> {
    debug!("Reading configuration from {}", path.display());
    let contents = tokio::fs::read_to_string(path).await?;

    // Try to parse as TOML first, then JSON as fallback
    if let Ok(config) = toml::from_str::<Config>(&contents) {
        return Ok(config);
    }

    let config = serde_json::from_str::<Config>(&contents)?;
    Ok(config)
}

fn load_from_env(config: &mut Config) {
    if let Ok(value) = std::env::var("VAULTENV_DEBUG") {
        config.debug = value.to_lowercase() == "true" || value == "1";
    }

    if let Ok(value) = std::env::var("VAULTENV_DEFAULT_VAULT") {
        config.default_vault = value;
    }

    if let Ok(value) = std::env::var("VAULTENV_AUTH_METHOD") {
        config.auth_method = value;
    }

    if let Ok(value) = std::env::var("AZURE_TENANT_ID") {
        config.tenant_id = value;
    }

    if let Ok(value) = std::env::var("AZURE_CLIENT_ID") {
        config.client_id = value;
    }

    if let Ok(value) = std::env::var("AZURE_CLIENT_SECRET") {
        config.client_secret = value;
    }

    if let Ok(value) = std::env::var("VAULTENV_MAX_RETRIES") {
        if let Ok(retries) = value.parse::<usize>() {
            config.max_retries = retries;
        }
    }

    if let Ok(value) = std::env::var("VAULTENV_TIMEOUT_SECS") {
        if let Ok(seconds) = value.parse::<u64>() {
            config.resolve_timeout_secs = seconds;
        }
    }
}
