//! Cricket auction service entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use auction_runtime::{AuctionRuntime, RuntimeConfig};
use auction_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("failed to initialize telemetry")?;

    let config = RuntimeConfig::from_env().context("invalid configuration")?;
    if let Err(e) = config.validate_for_production() {
        warn!("{e}");
    }
    config
        .gateway
        .validate()
        .context("invalid gateway configuration")?;

    let runtime = Arc::new(AuctionRuntime::new(config)?);
    let loaded = runtime.load_auctions()?;
    info!(auctions = loaded, "Auctions loaded");

    {
        let runtime = runtime.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Ctrl+C received, shutting down"),
                Err(e) => error!(error = %e, "Cannot listen for Ctrl+C, shutting down"),
            }
            runtime.shutdown();
        });
    }

    runtime.run().await?;
    info!("Auction service stopped");
    Ok(())
}
