use clap::Parser;
use colored::*;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use error_common::{log_error, Result};
use hub_sync::{HubConfig, SyncEngine};
use logger_redacted::{init_tracing, LogFormat, LoggerConfig};
use ops_cli::{commands, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_error("voucher-hub", &e);
            eprintln!("{} {}", "error:".bright_red(), e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(args: Cli) -> Result<()> {
    let logger = LoggerConfig {
        format: if args.json_logs { LogFormat::Json } else { LogFormat::Pretty },
        ..LoggerConfig::default()
    }
    .verbose(args.verbose);
    init_tracing(&logger)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting voucher-hub");

    let config = HubConfig::load(args.config.as_deref())?;
    let engine = Arc::new(SyncEngine::from_config(&config).await?);

    info!(remote = %engine.remote_status(), "Sync engine ready");

    commands::run(engine, &config, args.command).await
}

