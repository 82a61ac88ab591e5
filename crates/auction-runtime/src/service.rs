//! HTTP surface of the runtime.
//!
//! | Route | Method | Description |
//! |-------|--------|-------------|
//! | `/health` | GET | Liveness and running auction count |
//! | `/metrics` | GET | Prometheus text exposition |
//! | `/auctions/:auction_id/live` | GET (upgrade) | Live gateway |

use crate::registry::AuctionRegistry;
use anyhow::Context;
use auction_telemetry::encode_metrics;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use ca_04_live_gateway::{live_router, CredentialResolver, GatewayConfig, GatewayState};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

#[derive(Clone)]
struct StatusState {
    registry: Arc<AuctionRegistry>,
    gateway: GatewayState,
    started_at: DateTime<Utc>,
}

/// Health, metrics and live routes over `registry`.
pub fn build_router(
    registry: Arc<AuctionRegistry>,
    credentials: Arc<dyn CredentialResolver>,
    gateway: GatewayConfig,
) -> Router {
    let gateway = GatewayState::new(registry.clone(), credentials, gateway);
    let status = StatusState {
        registry,
        gateway: gateway.clone(),
        started_at: Utc::now(),
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .with_state(status)
        .merge(live_router(gateway))
        .layer(CorsLayer::permissive())
}

async fn health_check(State(state): State<StatusState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "auction-runtime",
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at.to_rfc3339(),
        "auctions": state.registry.len(),
        "live_connections": state.gateway.connections.len(),
    }))
}

async fn metrics() -> Response {
    match encode_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Serve `router` on `addr` until `shutdown` flips.
pub async fn serve(
    addr: &str,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Auction service listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
        .context("HTTP server failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use auction_telemetry::register_metrics;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use ca_01_ledger::test_utils::seed;
    use ca_01_ledger::InMemoryLedgerStore;
    use ca_04_live_gateway::StaticCredentials;
    use shared_bus::InMemoryEventBus;
    use tower::ServiceExt;

    fn router() -> Router {
        let registry = Arc::new(AuctionRegistry::new(
            Arc::new(InMemoryEventBus::with_capacity(16)),
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(ManualClock::new(0)),
        ));
        registry.load_seed(seed()).unwrap();
        build_router(
            registry,
            Arc::new(StaticCredentials::new(Some("admin".into()))),
            GatewayConfig::default(),
        )
    }

    async fn get(uri: &str) -> (StatusCode, String) {
        let response = router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_auctions() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["auctions"], 1);
    }

    #[tokio::test]
    async fn test_metrics_exposed() {
        register_metrics().unwrap();
        auction_telemetry::PLAYERS_SOLD.inc();
        let (status, body) = get("/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("ca_bidding_players_sold_total"));
    }

    #[tokio::test]
    async fn test_live_route_mounted() {
        let (status, _) = get(&format!("/auctions/{}/live", seed().id)).await;
        assert_eq!(status, StatusCode::UPGRADE_REQUIRED);
    }
}
