//! # Error Types
//!
//! The auction error taxonomy. Every rejected command carries exactly one
//! [`AuctionError`]; the wire uses its stable [`ErrorKind`].

use crate::entities::{AuctionStatus, BiddingPhase, PlayerStatus, TradeStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors returned to the client that issued a command.
///
/// Validation failures are never partially applied and never broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    /// Proposed amount is not `current + increment(current)`.
    #[error("Invalid bid amount: expected {expected}, got {proposed}")]
    InvalidBidAmount { expected: u64, proposed: u64 },

    #[error("Bidding not open: phase is {phase}")]
    BiddingNotOpen { phase: BiddingPhase },

    #[error("Team {team_id} already holds the highest bid")]
    AlreadyHighestBidder { team_id: String },

    /// Bid exceeds what the team may spend while still filling its squad.
    #[error("Insufficient purse: team {team_id} may bid at most {max_permissible}, needs {required}")]
    InsufficientPurse {
        team_id: String,
        required: u64,
        max_permissible: u64,
    },

    #[error("Squad full: team {team_id} already has {max_squad_size} players")]
    SquadFull { team_id: String, max_squad_size: u32 },

    #[error("Unauthorized role: {role} may not {command}")]
    UnauthorizedRole { role: String, command: String },

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidPhaseTransition { from: String, to: String },

    #[error("Trade limit reached: team {team_id} has {executed} executed trades (max {max})")]
    TradeLimitReached {
        team_id: String,
        executed: u32,
        max: u32,
    },

    #[error("Player {player_id} is not owned by team {team_id}")]
    PlayerNotOwned { player_id: String, team_id: String },

    #[error("Player {player_id} is locked in open trade {trade_id}")]
    PlayerLockedInOtherTrade { player_id: String, trade_id: String },

    #[error("Auction not in trade window: status is {status}")]
    AuctionNotInTradeWindow { status: AuctionStatus },

    /// Re-validation at execution time failed.
    #[error("Stale trade state for {trade_id}: {reason}")]
    StaleTradeState { trade_id: String, reason: String },

    #[error("Auction not found: {0}")]
    AuctionNotFound(String),

    #[error("Team not found: {0}")]
    TeamNotFound(String),

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Trade not found: {0}")]
    TradeNotFound(String),

    #[error("Player {player_id} not available: status is {status}")]
    PlayerNotAvailable {
        player_id: String,
        status: PlayerStatus,
    },

    #[error("Player pool exhausted after round {round}")]
    PoolExhausted { round: u32 },

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    /// The entities an undo/redo would restore changed since the action.
    #[error("Cannot {operation}: {reason}")]
    UndoConflict { operation: String, reason: String },

    #[error("Auction is finalized")]
    AuctionFinalized,

    #[error("Invalid trade: {0}")]
    InvalidTrade(String),

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Ledger mutation could not be made durable; state is unchanged.
    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl AuctionError {
    /// Stable kind used on the wire.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBidAmount { .. } => ErrorKind::InvalidBidAmount,
            Self::BiddingNotOpen { .. } => ErrorKind::BiddingNotOpen,
            Self::AlreadyHighestBidder { .. } => ErrorKind::AlreadyHighestBidder,
            Self::InsufficientPurse { .. } => ErrorKind::InsufficientPurse,
            Self::SquadFull { .. } => ErrorKind::SquadFull,
            Self::UnauthorizedRole { .. } => ErrorKind::UnauthorizedRole,
            Self::InvalidPhaseTransition { .. } => ErrorKind::InvalidPhaseTransition,
            Self::TradeLimitReached { .. } => ErrorKind::TradeLimitReached,
            Self::PlayerNotOwned { .. } => ErrorKind::PlayerNotOwned,
            Self::PlayerLockedInOtherTrade { .. } => ErrorKind::PlayerLockedInOtherTrade,
            Self::AuctionNotInTradeWindow { .. } => ErrorKind::AuctionNotInTradeWindow,
            Self::StaleTradeState { .. } => ErrorKind::StaleTradeState,
            Self::AuctionNotFound(_) => ErrorKind::AuctionNotFound,
            Self::TeamNotFound(_) => ErrorKind::TeamNotFound,
            Self::PlayerNotFound(_) => ErrorKind::PlayerNotFound,
            Self::TradeNotFound(_) => ErrorKind::TradeNotFound,
            Self::PlayerNotAvailable { .. } => ErrorKind::PlayerNotAvailable,
            Self::PoolExhausted { .. } => ErrorKind::PoolExhausted,
            Self::NothingToUndo => ErrorKind::NothingToUndo,
            Self::NothingToRedo => ErrorKind::NothingToRedo,
            Self::UndoConflict { .. } => ErrorKind::UndoConflict,
            Self::AuctionFinalized => ErrorKind::AuctionFinalized,
            Self::InvalidTrade(_) => ErrorKind::InvalidTrade,
            Self::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }

    pub fn invalid_transition(from: impl fmt::Display, to: impl fmt::Display) -> Self {
        Self::InvalidPhaseTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn stale(trade_id: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::StaleTradeState {
            trade_id: trade_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Trade status that cannot take the requested step.
    pub fn trade_transition(from: TradeStatus, to: TradeStatus) -> Self {
        Self::invalid_transition(from, to)
    }
}

/// Wire-level error kind, serialized with the taxonomy names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidBidAmount,
    BiddingNotOpen,
    AlreadyHighestBidder,
    InsufficientPurse,
    SquadFull,
    UnauthorizedRole,
    InvalidPhaseTransition,
    TradeLimitReached,
    PlayerNotOwned,
    PlayerLockedInOtherTrade,
    AuctionNotInTradeWindow,
    StaleTradeState,
    InsufficientSettlementPurse,
    AuctionNotFound,
    TeamNotFound,
    PlayerNotFound,
    TradeNotFound,
    PlayerNotAvailable,
    PoolExhausted,
    NothingToUndo,
    NothingToRedo,
    UndoConflict,
    AuctionFinalized,
    InvalidTrade,
    InvalidConfig,
    Persistence,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidBidAmount => "InvalidBidAmount",
            Self::BiddingNotOpen => "BiddingNotOpen",
            Self::AlreadyHighestBidder => "AlreadyHighestBidder",
            Self::InsufficientPurse => "InsufficientPurse",
            Self::SquadFull => "SquadFull",
            Self::UnauthorizedRole => "UnauthorizedRole",
            Self::InvalidPhaseTransition => "InvalidPhaseTransition",
            Self::TradeLimitReached => "TradeLimitReached",
            Self::PlayerNotOwned => "PlayerNotOwned",
            Self::PlayerLockedInOtherTrade => "PlayerLockedInOtherTrade",
            Self::AuctionNotInTradeWindow => "AuctionNotInTradeWindow",
            Self::StaleTradeState => "StaleTradeState",
            Self::InsufficientSettlementPurse => "InsufficientSettlementPurse",
            Self::AuctionNotFound => "AuctionNotFound",
            Self::TeamNotFound => "TeamNotFound",
            Self::PlayerNotFound => "PlayerNotFound",
            Self::TradeNotFound => "TradeNotFound",
            Self::PlayerNotAvailable => "PlayerNotAvailable",
            Self::PoolExhausted => "PoolExhausted",
            Self::NothingToUndo => "NothingToUndo",
            Self::NothingToRedo => "NothingToRedo",
            Self::UndoConflict => "UndoConflict",
            Self::AuctionFinalized => "AuctionFinalized",
            Self::InvalidTrade => "InvalidTrade",
            Self::InvalidConfig => "InvalidConfig",
            Self::Persistence => "Persistence",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal condition returned alongside a successful command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: ErrorKind,
    pub message: String,
}

impl Warning {
    /// Settlement could not be paid in full; the transfer was capped.
    pub fn insufficient_settlement_purse(
        team_id: impl fmt::Display,
        required: u64,
        available: u64,
    ) -> Self {
        Self {
            kind: ErrorKind::InsufficientSettlementPurse,
            message: format!(
                "team {team_id} owes {required} in settlement but has {available}; transfer capped at {available}"
            ),
        }
    }
}
