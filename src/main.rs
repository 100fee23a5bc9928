//! vaultenv - environment files with Azure Key Vault secrets
//!
//! Command-line entry point: loads configuration, parses arguments and
//! dispatches to the selected command.

use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vaultenv::cli::Cli;
use vaultenv::config;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.debug);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    info!("Starting vaultenv");

    let mut config = config::load_config()
        .await
        .context("failed to load configuration")?;
    config.debug |= cli.debug;

    let code = cli.execute(config).await?;
    Ok(code)
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "vaultenv=debug" } else { "vaultenv=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
