//! HTTP routes of the live gateway.
//!
//! | Route | Method | Description |
//! |-------|--------|-------------|
//! | `/auctions/:auction_id/live?token=...` | GET (upgrade) | Live connection |
//!
//! The handshake resolves the token before upgrading: a missing token joins
//! as a spectator, an unknown token is refused with 401 and an unknown
//! auction with 404.

use crate::connections::ConnectionManager;
use crate::domain::{GatewayConfig, GatewayError, Session};
use crate::ports::{AuctionDirectory, Credential, CredentialResolver};
use crate::ws::LiveConnection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use shared_types::AuctionId;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Shared handler state.
#[derive(Clone)]
pub struct GatewayState {
    pub directory: Arc<dyn AuctionDirectory>,
    pub credentials: Arc<dyn CredentialResolver>,
    pub connections: Arc<ConnectionManager>,
    pub config: GatewayConfig,
}

impl GatewayState {
    pub fn new(
        directory: Arc<dyn AuctionDirectory>,
        credentials: Arc<dyn CredentialResolver>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            directory,
            credentials,
            connections: Arc::new(ConnectionManager::new()),
            config,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LiveQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Router serving live connections; merge it into the service router.
pub fn live_router(state: GatewayState) -> Router {
    Router::new()
        .route("/auctions/:auction_id/live", get(live_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn live_handler(
    State(state): State<GatewayState>,
    Path(auction_id): Path<String>,
    Query(query): Query<LiveQuery>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    match upgrade(state, AuctionId::from(auction_id.as_str()), query, ws) {
        Ok(response) => response,
        Err(err) => {
            debug!(%auction_id, kind = err.kind(), "Live handshake refused");
            err.into_response()
        }
    }
}

fn upgrade(
    state: GatewayState,
    auction_id: AuctionId,
    query: LiveQuery,
    ws: Option<WebSocketUpgrade>,
) -> Result<Response, GatewayError> {
    let credential = match query.token.as_deref().filter(|t| !t.is_empty()) {
        None => Credential::spectator(),
        Some(token) => state
            .credentials
            .resolve(&auction_id, token)
            .ok_or_else(|| GatewayError::InvalidCredential {
                auction_id: auction_id.to_string(),
            })?,
    };

    // Subscribe before the first snapshot so nothing falls between them.
    let subscription = state.directory.subscribe(&auction_id)?;
    let ws = ws.ok_or(GatewayError::UpgradeRequired)?;

    let session = Session::new(auction_id, credential, &state.config);
    let connection = LiveConnection::new(
        session,
        state.directory,
        state.connections,
        state.config.clone(),
    );

    Ok(ws
        .max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| connection.run(socket, subscription))
        .into_response())
}
