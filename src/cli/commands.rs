//! CLI commands and argument parsing
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, subcommands, and their arguments.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::auth::AuthProviderFactory;
use crate::config::{Config, EnvironmentSettings, ProviderKind};
use crate::env::{EnvParser, EnvSnapshot};
use crate::error::{Result, VaultenvError};
use crate::injector::{with_override, with_secret_provider, Injector, InjectorOption};
use crate::loader::{FileLoader, Loader};
use crate::provider::{KeyVaultProvider, RetryingProvider, SecretProvider};
use crate::utils::network::NetworkConfig;
use crate::utils::retry::RetryOptions;

#[derive(Parser)]
#[command(name = "vaultenv")]
#[command(about = "Load .env files with Azure Key Vault secrets into the environment")]
#[command(version, author)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve an env file and run a command with it, or print the result
    Inject {
        /// Environment name (selects vault and provider from the config)
        #[arg(short, long, default_value = "local", env = "VAULTENV_ENV")]
        env: String,
        /// Path to the env file
        file: PathBuf,
        /// Vault for bare secret names (overrides the environment's vault)
        #[arg(long)]
        vault: Option<String>,
        /// Give up resolving secrets after this many seconds
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,
        /// Override a value after loading, in KEY=value format
        #[arg(short = 's', long = "set", value_parser = parse_key_val::<String, String>)]
        overrides: Vec<(String, String)>,
        /// Command to run with the injected environment
        #[arg(last = true)]
        command: Vec<String>,
    },
    /// Parse an env file and list its keys without resolving secrets
    Check {
        /// Path to the env file
        file: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
}

impl Cli {
    pub async fn execute(self, config: Config) -> Result<ExitCode> {
        match self.command {
            Commands::Inject {
                env,
                file,
                vault,
                timeout,
                overrides,
                command,
            } => {
                let mut settings = config.environment(&env);
                if vault.is_some() {
                    settings.vault = vault;
                }
                let deadline = timeout
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| config.resolve_timeout());
                execute_inject(&config, &settings, &file, deadline, overrides, command).await
            }
            Commands::Check { file, format } => {
                execute_check(&file, format)?;
                Ok(ExitCode::SUCCESS)
            }
            Commands::Config { command } => {
                execute_config_command(command, &config)?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

/// Build the secret provider configured for an environment
pub fn build_secret_provider(
    config: &Config,
    settings: &EnvironmentSettings,
) -> Result<Box<dyn SecretProvider>> {
    let auth_provider =
        AuthProviderFactory::create_provider(&config.auth_method, &config.auth_settings())?;
    let network_config = NetworkConfig::default().with_request_timeout(config.resolve_timeout());
    let keyvault = KeyVaultProvider::new(auth_provider, settings.vault.clone(), &network_config)?;

    if config.max_retries == 0 {
        return Ok(Box::new(keyvault));
    }

    let options = RetryOptions {
        max_retries: config.max_retries,
        ..RetryOptions::default()
    };
    Ok(Box::new(RetryingProvider::new(keyvault, options)))
}

async fn execute_inject(
    config: &Config,
    settings: &EnvironmentSettings,
    file: &Path,
    deadline: Duration,
    overrides: Vec<(String, String)>,
    command: Vec<String>,
) -> Result<ExitCode> {
    info!("Injecting {} for environment '{}'", file.display(), settings.name);

    let mut options: Vec<InjectorOption> = Vec::new();
    if settings.provider == ProviderKind::KeyVault {
        options.push(with_secret_provider(build_secret_provider(config, settings)));
    }
    for (key, value) in overrides {
        options.push(with_override(key, value));
    }

    let injector = Injector::new(&FileLoader::new(file), options)?;

    let cancel = CancellationToken::new();
    let watchdog = spawn_watchdog(cancel.clone(), deadline);

    let outcome = if command.is_empty() {
        injector.resolve(&cancel).await.map(|mut entries| {
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, value) in &entries {
                println!("{}", format_entry(key, value));
            }
        })
    } else {
        injector.inject(&cancel).await.map(|_| ())
    };

    watchdog.abort();
    let closed = injector.close().await;
    outcome?;
    closed?;

    match command.split_first() {
        Some((program, args)) => run_command(program, args).await,
        None => Ok(ExitCode::SUCCESS),
    }
}

/// Cancel `cancel` on Ctrl-C or when `deadline` passes
fn spawn_watchdog(cancel: CancellationToken, deadline: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => warn!("Interrupted, cancelling secret resolution"),
            _ = tokio::time::sleep(deadline) => {
                warn!("Secret resolution exceeded {}s, cancelling", deadline.as_secs())
            }
        }
        cancel.cancel();
    })
}

async fn run_command(program: &str, args: &[String]) -> Result<ExitCode> {
    info!("Running {}", program);
    let status = tokio::process::Command::new(program)
        .args(args)
        .status()
        .await
        .map_err(|e| VaultenvError::invalid_argument(format!("Failed to run '{}': {}", program, e)))?;

    let code = status.code().unwrap_or(1);
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}

/// Render an entry in the same `KEY=VALUE` dialect the parser reads
pub fn format_entry(key: &str, value: &str) -> String {
    if value.contains('\n') {
        format!("{}=\"{}\"", key, value)
    } else {
        format!("{}={}", key, value)
    }
}

fn execute_check(file: &Path, format: OutputFormat) -> Result<()> {
    let parser = EnvParser::new()?;
    let snapshot = FileLoader::new(file).load(&parser)?;
    println!("{}", render_check(&snapshot, format)?);
    Ok(())
}

fn render_check(snapshot: &EnvSnapshot, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let mut plain: Vec<&String> = snapshot.plain().keys().collect();
            plain.sort();
            let secrets: std::collections::BTreeMap<&String, &String> =
                snapshot.secrets().iter().collect();
            let report = serde_json::json!({
                "plain": plain,
                "secrets": secrets,
            });
            Ok(serde_json::to_string_pretty(&report)?)
        }
        OutputFormat::Text => {
            let lines: Vec<String> = snapshot
                .keys()
                .into_iter()
                .map(|key| match snapshot.get_secret(key) {
                    Some(reference) => format!("{:<32} secret  {}", key, reference),
                    None => format!("{:<32} plain", key),
                })
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

fn execute_config_command(command: ConfigCommands, config: &Config) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let contents = toml::to_string_pretty(config)
                .map_err(|e| VaultenvError::serialization(e.to_string()))?;
            println!("{}", contents);
        }
        ConfigCommands::Path => {
            let config_path = Config::get_config_path()?;
            println!("{}", config_path.display());
        }
    }
    Ok(())
}

fn parse_key_val<T, U>(
    s: &str,
) -> std::result::Result<(T, U), Box<dyn std::error::Error + Send + Sync + 'static>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    U: std::str::FromStr,
    U::Err: std::error::Error + Send + Sync + 'static,
{
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{s}`"))?;
    Ok((s[..pos].parse()?, s[pos + 1..].parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_inject_arguments() {
        let cli = Cli::parse_from([
            "vaultenv", "inject", "-e", "prod", "app.env", "--set", "PORT=8080", "--", "server",
            "--verbose",
        ]);
        match cli.command {
            Commands::Inject {
                env,
                file,
                overrides,
                command,
                ..
            } => {
                assert_eq!(env, "prod");
                assert_eq!(file, PathBuf::from("app.env"));
                assert_eq!(overrides, vec![("PORT".to_string(), "8080".to_string())]);
                assert_eq!(command, vec!["server".to_string(), "--verbose".to_string()]);
            }
            _ => panic!("expected inject"),
        }
    }

    #[test]
    fn test_format_entry_round_trips_through_parser() {
        let parser = EnvParser::new().unwrap();
        let rendered = format!(
            "{}\n{}",
            format_entry("SINGLE", "value"),
            format_entry("MULTI", "line1\nline2")
        );
        let snapshot = parser.parse_str(&rendered).unwrap();
        assert_eq!(snapshot.get_plain("SINGLE"), Some("value"));
        assert_eq!(snapshot.get_plain("MULTI"), Some("line1\nline2"));
    }

    #[test]
    fn test_render_check_hides_plain_values() {
        let parser = EnvParser::new().unwrap();
        let snapshot = parser.parse_str("PLAIN=hunter2\nSECRET=!{vault/db}").unwrap();

        let text = render_check(&snapshot, OutputFormat::Text).unwrap();
        assert!(text.contains("vault/db"));
        assert!(!text.contains("hunter2"));

        let json: serde_json::Value =
            serde_json::from_str(&render_check(&snapshot, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["plain"][0], "PLAIN");
        assert_eq!(json["secrets"]["SECRET"], "vault/db");
    }
}
