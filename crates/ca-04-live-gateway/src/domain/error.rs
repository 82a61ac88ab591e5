//! Gateway error types.
//!
//! Every error that reaches a client is reported with a stable `kind`
//! string. Auction rule violations keep their taxonomy name; the remaining
//! kinds belong to the gateway itself.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared_types::AuctionError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Token did not resolve to an admin or a team of this auction
    #[error("invalid credential for auction {auction_id}")]
    InvalidCredential { auction_id: String },

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("rate limit exceeded")]
    RateLimited,

    /// Live endpoint reached without a WebSocket upgrade
    #[error("websocket upgrade required")]
    UpgradeRequired,

    /// The auction's actor stopped accepting commands
    #[error("auction unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Auction(#[from] AuctionError),
}

impl GatewayError {
    /// Stable kind reported on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredential { .. } => "InvalidCredential",
            Self::MalformedMessage(_) => "MalformedMessage",
            Self::MessageTooLarge { .. } => "MessageTooLarge",
            Self::RateLimited => "RateLimited",
            Self::UpgradeRequired => "UpgradeRequired",
            Self::Unavailable(_) => "Unavailable",
            Self::Auction(err) => err.kind().as_str(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredential { .. } => StatusCode::UNAUTHORIZED,
            Self::MalformedMessage(_) => StatusCode::BAD_REQUEST,
            Self::MessageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::UpgradeRequired => StatusCode::UPGRADE_REQUIRED,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Auction(AuctionError::AuctionNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Auction(_) => StatusCode::CONFLICT,
        }
    }
}

/// Handshake failures are answered over plain HTTP before any upgrade.
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (self.status(), axum::Json(body)).into_response()
    }
}
