//! Prometheus metrics for the auction services.
//!
//! All metrics follow the naming convention: `ca_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts,
    Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // BIDDING
    // =========================================================================

    pub static ref BIDS_ACCEPTED: Counter = Counter::new(
        "ca_bidding_bids_accepted_total",
        "Total number of accepted bids"
    ).expect("metric creation failed");

    /// Rejected bids by error kind
    pub static ref BIDS_REJECTED: CounterVec = CounterVec::new(
        Opts::new("ca_bidding_bids_rejected_total", "Rejected bids by reason"),
        &["reason"]
    ).expect("metric creation failed");

    pub static ref PLAYERS_SOLD: Counter = Counter::new(
        "ca_bidding_players_sold_total",
        "Total number of players sold"
    ).expect("metric creation failed");

    pub static ref PLAYERS_UNSOLD: Counter = Counter::new(
        "ca_bidding_players_unsold_total",
        "Total number of players that went unsold"
    ).expect("metric creation failed");

    /// Final sale price distribution
    pub static ref SALE_PRICE: Histogram = Histogram::with_opts(
        HistogramOpts::new("ca_bidding_sale_price_units", "Final sale prices")
            .buckets(exponential_buckets(50.0, 2.0, 14).unwrap_or_default())
    ).expect("metric creation failed");

    /// Timer callbacks discarded because the state had moved on
    pub static ref STALE_TIMERS: Counter = Counter::new(
        "ca_bidding_stale_timers_total",
        "Timer firings ignored by the version check"
    ).expect("metric creation failed");

    // =========================================================================
    // TRADES
    // =========================================================================

    /// Trades reaching a terminal status, by status
    pub static ref TRADES_CLOSED: CounterVec = CounterVec::new(
        Opts::new("ca_trade_closed_total", "Trades reaching a terminal status"),
        &["status"]
    ).expect("metric creation failed");

    pub static ref SETTLEMENT_SHORTFALLS: Counter = Counter::new(
        "ca_trade_settlement_shortfalls_total",
        "Executions whose settlement was capped at the payer's purse"
    ).expect("metric creation failed");

    // =========================================================================
    // RUNTIME
    // =========================================================================

    /// Commands by name and result (ok / error kind)
    pub static ref COMMANDS: CounterVec = CounterVec::new(
        Opts::new("ca_runtime_commands_total", "Commands processed"),
        &["command", "result"]
    ).expect("metric creation failed");

    pub static ref COMMAND_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ca_runtime_command_duration_seconds",
            "Time spent applying a command, including the ledger commit"
        ).buckets(exponential_buckets(0.0001, 2.0, 14).unwrap_or_default())
    ).expect("metric creation failed");

    pub static ref ACTIVE_AUCTIONS: Gauge = Gauge::new(
        "ca_runtime_active_auctions",
        "Auctions with a running actor"
    ).expect("metric creation failed");

    pub static ref EVENTS_PUBLISHED: Counter = Counter::new(
        "ca_runtime_events_published_total",
        "Events published to the bus"
    ).expect("metric creation failed");

    // =========================================================================
    // GATEWAY
    // =========================================================================

    /// Open WebSocket connections by role
    pub static ref LIVE_CONNECTIONS: GaugeVec = GaugeVec::new(
        Opts::new("ca_gateway_live_connections", "Open live connections"),
        &["role"]
    ).expect("metric creation failed");

    pub static ref SUBSCRIBER_LAGS: Counter = Counter::new(
        "ca_gateway_subscriber_lags_total",
        "Connections resynchronized after falling behind"
    ).expect("metric creation failed");
}

/// Handle proving the metrics were registered.
pub struct MetricsHandle {
    registered: usize,
}

impl MetricsHandle {
    pub fn registered(&self) -> usize {
        self.registered
    }
}

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Bidding
        Box::new(BIDS_ACCEPTED.clone()),
        Box::new(BIDS_REJECTED.clone()),
        Box::new(PLAYERS_SOLD.clone()),
        Box::new(PLAYERS_UNSOLD.clone()),
        Box::new(SALE_PRICE.clone()),
        Box::new(STALE_TIMERS.clone()),
        // Trades
        Box::new(TRADES_CLOSED.clone()),
        Box::new(SETTLEMENT_SHORTFALLS.clone()),
        // Runtime
        Box::new(COMMANDS.clone()),
        Box::new(COMMAND_DURATION.clone()),
        Box::new(ACTIVE_AUCTIONS.clone()),
        Box::new(EVENTS_PUBLISHED.clone()),
        // Gateway
        Box::new(LIVE_CONNECTIONS.clone()),
        Box::new(SUBSCRIBER_LAGS.clone()),
    ];

    let registered = metrics.len();
    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle { registered })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::HistogramTimer::new(&$histogram)
    };
}
