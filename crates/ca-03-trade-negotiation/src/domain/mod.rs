//! Domain layer: trade invariants, settlement arithmetic and the shapes
//! the workflow consumes and produces.

pub mod invariants;
pub mod settlement;

pub use invariants::{
    invariant_not_locked, invariant_squads_fit, invariant_still_owned, invariant_trade_cap,
    invariant_trade_window, invariant_well_formed, owned_players,
};
pub use settlement::{compute_settlement, SettlementTransfer};

use serde::{Deserialize, Serialize};
use shared_bus::OutboundEvent;
use shared_types::{PlayerId, TeamId, TradeId, Warning};

/// A swap as requested by a team or an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeProposal {
    pub initiator: TeamId,
    pub counterparty: TeamId,
    /// Players the initiator gives up.
    pub offered: Vec<PlayerId>,
    /// Players the initiator wants from the counterparty.
    pub requested: Vec<PlayerId>,
    pub message: Option<String>,
}

/// Events and warnings produced by one trade operation.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeOutcome {
    pub trade_id: Option<TradeId>,
    pub events: Vec<OutboundEvent>,
    pub warnings: Vec<Warning>,
}

impl TradeOutcome {
    pub(crate) fn for_trade(trade_id: TradeId, events: Vec<OutboundEvent>) -> Self {
        Self {
            trade_id: Some(trade_id),
            events,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn empty() -> Self {
        Self {
            trade_id: None,
            events: Vec::new(),
            warnings: Vec::new(),
        }
    }
}
