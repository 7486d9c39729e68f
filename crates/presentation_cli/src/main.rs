//! Weather collector
//!
//! Fetches current conditions for the configured locations on a schedule
//! and publishes them to an AMQP queue.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use application::CycleOutcome;
use clap::{Parser, Subcommand};
use infrastructure::{AppConfig, CollectorRuntime, ConfigError, LoggingConfig, init_logging};
use tokio::signal;
use tracing::{error, info, warn};

/// Weather collector
#[derive(Parser)]
#[command(name = "weather-collector")]
#[command(author, version, about = "Scheduled weather collection into a durable queue", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./collector.toml when present)
    #[arg(short, long, env = "COLLECTOR_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Verbosity level, overrides logging.filter
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect on schedule until SIGINT or SIGTERM
    Run,

    /// Collect once for every location, then exit
    ///
    /// Exits with status 0 only if every reading was published.
    Once,

    /// Validate the configuration and print it with secrets masked
    CheckConfig,
}

/// Log filter for a verbosity count, `None` keeps the configured one
const fn log_filter_from_verbosity(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if matches!(cli.command, Commands::CheckConfig) {
        return Ok(check_config(&config));
    }

    let logging = LoggingConfig {
        filter: log_filter_from_verbosity(cli.verbose)
            .map_or_else(|| config.logging.filter.clone(), str::to_string),
        format: config.logging.format,
    };
    init_logging(&logging)?;

    let runtime = match CollectorRuntime::from_config(&config) {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Ok(ExitCode::FAILURE);
        },
    };
    info!(config = %config.redacted_summary(), "Configuration loaded");

    match cli.command {
        Commands::Run => {
            runtime.start()?;
            shutdown_signal().await;
            runtime.stop().await;
            Ok(ExitCode::SUCCESS)
        },
        Commands::Once => {
            let outcomes = runtime.run_once().await;
            runtime.stop().await;

            let health = runtime.health();
            println!("{}", serde_json::to_string_pretty(&health)?);

            if outcomes.iter().all(CycleOutcome::is_published) {
                Ok(ExitCode::SUCCESS)
            } else {
                warn!(
                    failed = outcomes.iter().filter(|o| !o.is_published()).count(),
                    "Not every location was published"
                );
                Ok(ExitCode::FAILURE)
            }
        },
        Commands::CheckConfig => Ok(check_config(&config)),
    }
}

fn check_config(config: &AppConfig) -> ExitCode {
    match config.validate() {
        Ok(()) => {
            println!("{}", config.redacted_summary());
            println!("✅ Configuration is valid");
            ExitCode::SUCCESS
        },
        Err(ConfigError::Invalid(problems)) => {
            eprintln!("❌ Configuration is invalid:");
            for problem in problems {
                eprintln!("  - {problem}");
            }
            ExitCode::FAILURE
        },
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        },
    }
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
