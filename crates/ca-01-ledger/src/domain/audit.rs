//! # Audit Trail
//!
//! One immutable record per ledger-mutating action. Undo and redo append
//! compensating records pointing at the record they revert; nothing is ever
//! rewritten.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{Actor, AuctionId, TimestampMs};
use std::fmt;

/// Kind of ledger-mutating action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    StatusChanged,
    RoundStarted,
    PlayerSold,
    PlayerUnsold,
    ForceSold,
    ForceUnsold,
    PlayerDisqualified,
    PlayerReinstated,
    Undo,
    Redo,
    TradeExecuted,
    TradeCancelled,
    TradeExpired,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatusChanged => "status_changed",
            Self::RoundStarted => "round_started",
            Self::PlayerSold => "player_sold",
            Self::PlayerUnsold => "player_unsold",
            Self::ForceSold => "force_sold",
            Self::ForceUnsold => "force_unsold",
            Self::PlayerDisqualified => "player_disqualified",
            Self::PlayerReinstated => "player_reinstated",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::TradeExecuted => "trade_executed",
            Self::TradeCancelled => "trade_cancelled",
            Self::TradeExpired => "trade_expired",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Per-auction sequence, starting at 1.
    pub id: u64,
    pub auction_id: AuctionId,
    pub actor: Actor,
    pub at: TimestampMs,
    pub action: AuditAction,
    /// State of the touched entities before the action.
    pub before: Value,
    /// State of the touched entities after the action.
    pub after: Value,
    /// Record this one reverts (undo) or re-applies (redo).
    pub compensates: Option<u64>,
}

/// Audit query by auction and, optionally, action type.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub auction_id: Option<AuctionId>,
    pub action: Option<AuditAction>,
}

impl AuditQuery {
    pub fn auction(auction_id: AuctionId) -> Self {
        Self {
            auction_id: Some(auction_id),
            action: None,
        }
    }

    pub fn with_action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn matches(&self, record: &AuditRecord) -> bool {
        self.auction_id
            .as_ref()
            .map_or(true, |id| id == &record.auction_id)
            && self.action.map_or(true, |action| action == record.action)
    }
}
