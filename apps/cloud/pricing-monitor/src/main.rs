//! Pricing Monitor
//!
//! Periodically fetches on-demand VM pricing from AWS and GCP and exports it
//! as Prometheus metrics. Can also run a single pass and print the results.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use domain_pricing::PricePoint;
use eyre::{Result, WrapErr};
use serde::Serialize;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

mod config;
mod providers;
mod scheduler;
mod server;
mod sink;

use config::Config;
use providers::ProviderRegistry;
use scheduler::{FetchScheduler, PassSummary};
use sink::{FailureCount, MemorySink, PrometheusSink};

#[derive(Parser)]
#[command(name = "pricing-monitor")]
#[command(about = "Export on-demand AWS and GCP VM pricing as Prometheus metrics")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Default)]
enum Commands {
    /// Serve /metrics and refresh pricing every poll interval
    #[default]
    Run,

    /// Run a single pass and print the results as JSON
    Collect,
}

/// Output of `collect`
#[derive(Serialize)]
struct CollectReport {
    summary: PassSummary,
    prices: Vec<PricePoint>,
    failures: Vec<FailureCount>,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();

    let environment = Environment::from_env();
    init_tracing(&environment);

    let config = Config::from_env().wrap_err("Invalid pricing monitor configuration")?;
    info!(
        aws_regions = ?config.aws.regions,
        gcp_regions = ?config.gcp.regions,
        poll_interval = ?config.poll_interval,
        "Configuration loaded"
    );

    let registry = ProviderRegistry::from_config(&config)
        .await
        .wrap_err("Failed to initialize pricing providers")?;

    match cli.command.unwrap_or_default() {
        Commands::Run => run(config, registry).await,
        Commands::Collect => collect(config, registry).await,
    }
}

async fn run(config: Config, registry: ProviderRegistry) -> Result<()> {
    observability::init_metrics().wrap_err("Failed to install Prometheus recorder")?;

    let listener = server::bind(&config.metrics.address()).await?;

    // Set up a shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn shutdown signal handler
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!("Error waiting for shutdown signal: {}", e);
        }
        let _ = shutdown_tx.send(true);
    });

    let server = tokio::spawn(server::serve(listener, shutdown_rx.clone()));

    let scheduler = FetchScheduler::new(
        registry,
        config.targets(),
        Arc::new(PrometheusSink),
        config.poll_interval,
        config.fetch_timeout,
    );
    scheduler.run(shutdown_rx).await;

    server.await.wrap_err("Metrics server task failed")??;

    info!("Pricing monitor stopped");
    Ok(())
}

async fn collect(config: Config, registry: ProviderRegistry) -> Result<()> {
    let sink = Arc::new(MemorySink::new());
    let scheduler = FetchScheduler::new(
        registry,
        config.targets(),
        sink.clone(),
        config.poll_interval,
        config.fetch_timeout,
    );

    info!(targets = scheduler.targets().len(), "Starting one-time pricing pass");

    // Keep the sender alive so the pass is never cancelled.
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let summary = scheduler.run_pass(&shutdown_rx).await;

    let report = CollectReport {
        summary,
        prices: sink.prices(),
        failures: sink.failures(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .wrap_err("Failed to install Ctrl+C handler")
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .wrap_err("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<(), eyre::Report>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            info!("Received Ctrl+C, initiating shutdown...");
        },
        result = terminate => {
            result?;
            info!("Received SIGTERM, initiating shutdown...");
        },
    }

    Ok(())
}
