//! # Ledger Store Errors

use shared_types::AuctionError;
use thiserror::Error;

/// Errors raised by a [`LedgerStore`](crate::ports::outbound::LedgerStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The commit could not be made durable; nothing was written.
    #[error("Commit failed for auction {auction_id}: {reason}")]
    CommitFailed { auction_id: String, reason: String },

    #[error("Ledger not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<LedgerError> for AuctionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(id) => AuctionError::AuctionNotFound(id),
            other => AuctionError::Persistence(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err.to_string())
    }
}
