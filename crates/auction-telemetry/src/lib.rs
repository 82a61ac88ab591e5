//! # Auction Telemetry
//!
//! Observability for the cricket auction services.
//!
//! ## Components
//!
//! - **Logs**: `tracing` with an `EnvFilter`, pretty or JSON console output
//! - **Traces**: optional OpenTelemetry OTLP export
//! - **Metrics**: Prometheus registry, scraped from `GET /metrics`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auction_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // Application code; the guard flushes traces on drop.
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | unset | OTLP collector; export disabled when unset |
//! | `OTEL_SERVICE_NAME` | `cricket-auction` | Service name in traces |
//! | `CA_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `CA_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |

mod config;
mod logging;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, ACTIVE_AUCTIONS,
    BIDS_ACCEPTED, BIDS_REJECTED, COMMANDS, COMMAND_DURATION, EVENTS_PUBLISHED, LIVE_CONNECTIONS,
    PLAYERS_SOLD, PLAYERS_UNSOLD, SALE_PRICE, SETTLEMENT_SHORTFALLS, STALE_TIMERS,
    SUBSCRIBER_LAGS, TRADES_CLOSED,
};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging, optional trace export and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
/// When dropped, it flushes pending traces. Must be called inside a Tokio
/// runtime when OTLP export is enabled.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Initialize metrics first (synchronous)
    let metrics = register_metrics()?;

    let tracing = tracing_setup::init_tracing(&config)?;

    tracing::debug!(metrics = metrics.registered(), "Prometheus metrics registered");

    Ok(TelemetryGuard {
        _tracing: tracing,
        _metrics: metrics,
    })
}

/// Guard that keeps telemetry active. Drop to flush and shutdown.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
