//! # Auction Snapshot
//!
//! Full state sent on connect, on explicit request and after a client falls
//! behind. A snapshot plus the subsequent event stream is all a client needs.

use crate::commands::Role;
use crate::entities::{
    Amount, AuctionConfig, AuctionId, AuctionStatus, BiddingView, Player, PlayerStatus,
    RosterEntry, TeamId, TimestampMs, Trade, TradeStatus,
};
use serde::{Deserialize, Serialize};

/// Public view of one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub id: TeamId,
    pub name: String,
    pub short_code: String,
    pub purse_value: Amount,
    pub purse_remaining: Amount,
    pub squad_size: u32,
    pub roster: Vec<RosterEntry>,
    pub executed_trades: u32,
}

/// Fields only the team itself (and admins) may see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamPrivateView {
    pub team_id: TeamId,
    pub purse_remaining: Amount,
    pub squad_size: u32,
    /// Slots left before the squad is full.
    pub slots_remaining: u32,
    /// Highest bid the team can place and still afford a full minimum squad.
    pub max_permissible_bid: Amount,
    pub can_bid: bool,
    pub executed_trades: u32,
    pub trades_remaining: u32,
}

/// Per-status counts of the player pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCounts {
    pub pool: u32,
    pub in_bidding: u32,
    pub sold: u32,
    pub unsold: u32,
    pub disqualified: u32,
    pub ineligible: u32,
    pub retained: u32,
}

impl PoolCounts {
    pub fn tally<'a>(players: impl IntoIterator<Item = &'a Player>) -> Self {
        let mut counts = Self::default();
        for player in players {
            let slot = match player.status {
                PlayerStatus::Pool => &mut counts.pool,
                PlayerStatus::InBidding => &mut counts.in_bidding,
                PlayerStatus::Sold => &mut counts.sold,
                PlayerStatus::Unsold => &mut counts.unsold,
                PlayerStatus::Disqualified => &mut counts.disqualified,
                PlayerStatus::Ineligible => &mut counts.ineligible,
                PlayerStatus::Retained => &mut counts.retained,
            };
            *slot += 1;
        }
        counts
    }
}

/// Player-pool summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSummary {
    pub counts: PoolCounts,
    pub players: Vec<Player>,
}

/// Complete state of one auction as seen by one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionSnapshot {
    pub auction_id: AuctionId,
    pub name: String,
    pub status: AuctionStatus,
    pub current_round: u32,
    pub trade_window_expires_at: Option<TimestampMs>,
    pub config: AuctionConfig,
    pub bidding: BiddingView,
    /// Player currently on the block.
    pub current_player: Option<Player>,
    pub teams: Vec<TeamSummary>,
    pub pool: PoolSummary,
    pub trades: Vec<Trade>,
    /// Present only for team connections.
    pub private: Option<TeamPrivateView>,
    /// Sequence of the last event folded into this snapshot.
    pub sequence: u64,
}

impl AuctionSnapshot {
    /// Narrow a full snapshot to what `role` may see.
    ///
    /// Admins see every trade; teams see executed trades plus their own;
    /// spectators see executed trades only.
    pub fn for_viewer(mut self, role: Role, team: Option<&TeamId>) -> Self {
        match role {
            Role::Admin => {
                self.private = None;
            }
            Role::Team => {
                self.trades.retain(|trade| {
                    trade.status == TradeStatus::Executed
                        || team.map_or(false, |team_id| trade.involves(team_id))
                });
            }
            Role::Spectator => {
                self.private = None;
                self.trades
                    .retain(|trade| trade.status == TradeStatus::Executed);
            }
        }
        self
    }
}
