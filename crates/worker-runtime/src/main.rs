//! `tippr-worker` entry point.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::{Ipv4Addr, SocketAddr};
use tippr_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;
use worker_runtime::cli::Args;
use worker_runtime::{RuntimeConfig, WorkerRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = RuntimeConfig::load(args.config.as_deref()).context("loading configuration")?;
    args.apply(&mut config);
    config.validate().context("validating configuration")?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let telemetry_config = TelemetryConfig::from_env();
    let metrics_addr = args.metrics_addr.or_else(|| {
        (telemetry_config.metrics_port > 0)
            .then(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, telemetry_config.metrics_port)))
    });
    let _telemetry = init_telemetry(telemetry_config).context("initializing telemetry")?;

    let runtime = WorkerRuntime::new(config)?;
    runtime.start().await?;
    if let Some(addr) = metrics_addr {
        runtime.serve_metrics(addr).await?;
    }

    info!("Worker is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
