use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use logwire_core::config::HarnessConfig;
use logwire_core::error::HarnessError;
use logwire_environment::{BollardRuntime, ContainerRuntime, HttpStubRegistry};
use logwire_harness::cli::HarnessCli;
use logwire_harness::logging::init_tracing;
use logwire_harness::signal::wait_for_shutdown_signal;
use logwire_harness::{AwsConnector, HarnessController};

/// A stage failed fatally.
const EXIT_FATAL: u8 = 1;
/// Configuration could not be loaded or validated.
const EXIT_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = HarnessCli::parse();

    let config = match load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("logwire: {e:#}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return ExitCode::SUCCESS;
    }

    if let Err(e) = init_tracing(&config.general) {
        eprintln!("logwire: {e:#}");
        return ExitCode::from(EXIT_CONFIG);
    }

    tracing::info!(config = %cli.config.display(), "logwire starting");
    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "logwire failed");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn load_config(cli: &HarnessCli) -> Result<HarnessConfig> {
    let mut config = HarnessConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;

    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }
    if cli.follow {
        config.observer.follow = true;
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    Ok(config)
}

async fn run(config: HarnessConfig) -> Result<()> {
    let runtime = Arc::new(BollardRuntime::connect_local()?);
    runtime.ping().await?;
    let registry = Arc::new(HttpStubRegistry::new()?);
    let controller = HarnessController::new(config, runtime, registry, AwsConnector);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(signal) => {
                tracing::info!(signal, "shutdown signal received");
                signal_cancel.cancel();
            }
            Err(e) => tracing::error!(error = %e, "signal handling unavailable"),
        }
    });

    match controller.run(cancel).await {
        Ok(report) => {
            println!("{report}");
            Ok(())
        }
        Err(HarnessError::Cancelled) => {
            tracing::info!("run interrupted, resources released");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
