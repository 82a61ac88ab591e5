//! # Core Domain Entities
//!
//! Defines the auction entities shared by every subsystem.
//!
//! ## Clusters
//!
//! - **Identity**: `AuctionId`, `TeamId`, `PlayerId`, `TradeId`
//! - **Auction**: `Auction`, `AuctionStatus`, `AuctionConfig`, `IncrementTier`
//! - **Roster**: `Team`, `RosterEntry`, `Player`, `PlayerStatus`
//! - **Bidding**: `BiddingPhase`, `Bid`, `BiddingView`
//! - **Trades**: `Trade`, `TradeSide`, `TradeStatus`, `SettlementDirection`
//!
//! All currency values are integers in the smallest denomination unit.

use crate::errors::AuctionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Currency amount in the smallest denomination unit.
pub type Amount = u64;

/// Milliseconds since the Unix epoch.
pub type TimestampMs = u64;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from anything string-like.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of an auction.
    AuctionId
);
string_id!(
    /// Identifier of a team within an auction.
    TeamId
);
string_id!(
    /// Identifier of a player within an auction's pool.
    PlayerId
);

/// Identifier of a trade proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(pub Uuid);

impl TradeId {
    /// Generate a fresh trade id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// CLUSTER B: AUCTION
// =============================================================================

/// Lifecycle status of an auction.
///
/// Status moves forward only, except for `Paused -> Live`:
///
/// ```text
/// setup -> live <-> paused -> trade_window -> completed -> finalized
///            \________________________________/^
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatus {
    /// Auction is being configured; pool and teams are loaded.
    #[default]
    Setup,
    /// Live bidding in progress.
    Live,
    /// Live bidding suspended; timers frozen.
    Paused,
    /// Post-auction window during which trades may be proposed.
    TradeWindow,
    /// Bidding and trading are over; awaiting finalization.
    Completed,
    /// Terminal: no further mutation of players, teams or trades.
    Finalized,
}

impl AuctionStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Setup => 0,
            Self::Live | Self::Paused => 1,
            Self::TradeWindow => 2,
            Self::Completed => 3,
            Self::Finalized => 4,
        }
    }

    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: AuctionStatus) -> bool {
        match (self, next) {
            (Self::Setup, Self::Live) => true,
            (Self::Live, Self::Paused) | (Self::Paused, Self::Live) => true,
            (Self::Live | Self::Paused, Self::TradeWindow) => true,
            (Self::Live | Self::Paused | Self::TradeWindow, Self::Completed) => true,
            (Self::Completed, Self::Finalized) => true,
            _ => false,
        }
    }

    /// True when `next` does not move the auction backwards in its lifecycle.
    pub fn is_forward(&self, next: AuctionStatus) -> bool {
        next.rank() >= self.rank()
    }

    /// Whether any player, team or trade mutation is still allowed.
    pub fn is_mutable(&self) -> bool {
        !matches!(self, Self::Finalized)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Live => "live",
            Self::Paused => "paused",
            Self::TradeWindow => "trade_window",
            Self::Completed => "completed",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bid-increment band: bids whose *current* amount falls in
/// `[from, until)` must increase by `step`. `until = None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncrementTier {
    /// Inclusive lower bound of the band.
    pub from: Amount,
    /// Exclusive upper bound of the band.
    pub until: Option<Amount>,
    /// Increment applied to a current bid inside the band.
    pub step: Amount,
}

impl IncrementTier {
    /// Whether `amount` lies inside this half-open band.
    pub fn contains(&self, amount: Amount) -> bool {
        amount >= self.from && self.until.map_or(true, |until| amount < until)
    }
}

/// Closed auction configuration. Unknown fields are rejected at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AuctionConfig {
    /// Minimum opening bid used when a player carries no own base price,
    /// and the per-slot reserve when computing a team's maximum bid.
    pub base_price: Amount,
    /// Purse each team starts with.
    pub purse_value: Amount,
    /// Squad size every team must be able to reach.
    pub min_squad_size: u32,
    /// Hard cap on squad size.
    pub max_squad_size: u32,
    /// Number of rounds unsold players may be re-offered in.
    pub max_rounds: u32,
    /// Optional bound on how often one player is put up for bidding.
    pub max_offers_per_player: Option<u32>,
    /// Countdown once bidding opens.
    pub timer_duration_secs: u64,
    /// Countdown after each accepted bid.
    pub bid_reset_timer_secs: u64,
    /// Duration of the "going once" phase.
    pub going_once_timer_secs: u64,
    /// Duration of the "going twice" phase.
    pub going_twice_timer_secs: u64,
    /// Delay between reveal and open bidding; zero means admin opens manually.
    pub reveal_delay_secs: u64,
    /// When set, sold/unsold outcomes advance to `waiting` after this delay.
    pub auto_advance_delay_secs: Option<u64>,
    /// Ordered, contiguous increment bands starting at zero.
    pub increment_tiers: Vec<IncrementTier>,
    /// Cap on executed trades per team.
    pub max_trades_per_team: u32,
    /// Whether trade value differences move purse money.
    pub purse_settlement_enabled: bool,
    /// Depth of the admin undo stack.
    pub undo_depth: usize,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            base_price: 100,
            purse_value: 10_000,
            min_squad_size: 11,
            max_squad_size: 15,
            max_rounds: 2,
            max_offers_per_player: None,
            timer_duration_secs: 30,
            bid_reset_timer_secs: 15,
            going_once_timer_secs: 5,
            going_twice_timer_secs: 5,
            reveal_delay_secs: 5,
            auto_advance_delay_secs: None,
            increment_tiers: vec![
                IncrementTier {
                    from: 0,
                    until: Some(1_000),
                    step: 50,
                },
                IncrementTier {
                    from: 1_000,
                    until: Some(5_000),
                    step: 100,
                },
                IncrementTier {
                    from: 5_000,
                    until: None,
                    step: 250,
                },
            ],
            max_trades_per_team: 2,
            purse_settlement_enabled: true,
            undo_depth: 3,
        }
    }
}

impl AuctionConfig {
    /// Increment required on top of `current`, selected by the band that
    /// contains the current amount.
    pub fn increment_for(&self, current: Amount) -> Option<Amount> {
        self.increment_tiers
            .iter()
            .find(|tier| tier.contains(current))
            .map(|tier| tier.step)
    }

    /// The only acceptable next bid given the standing bid (if any) and the
    /// player's opening price.
    pub fn next_valid_bid(&self, current: Option<Amount>, opening: Amount) -> Option<Amount> {
        match current {
            None => Some(opening),
            Some(current) => self
                .increment_for(current)
                .and_then(|step| current.checked_add(step)),
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), AuctionError> {
        let invalid = |reason: &str| AuctionError::InvalidConfig {
            reason: reason.to_string(),
        };

        if self.base_price == 0 {
            return Err(invalid("base_price cannot be 0"));
        }
        if self.max_squad_size == 0 || self.min_squad_size > self.max_squad_size {
            return Err(invalid("squad bounds must satisfy 0 < min <= max"));
        }
        if self.purse_value < self.base_price.saturating_mul(u64::from(self.min_squad_size)) {
            return Err(invalid("purse_value cannot fill the minimum squad at base price"));
        }
        if self.max_rounds == 0 {
            return Err(invalid("max_rounds cannot be 0"));
        }
        if self.max_offers_per_player == Some(0) {
            return Err(invalid("max_offers_per_player cannot be 0"));
        }
        if self.timer_duration_secs == 0
            || self.bid_reset_timer_secs == 0
            || self.going_once_timer_secs == 0
            || self.going_twice_timer_secs == 0
        {
            return Err(invalid("bidding timers cannot be 0"));
        }
        if self.undo_depth == 0 {
            return Err(invalid("undo_depth cannot be 0"));
        }
        self.validate_tiers()
    }

    fn validate_tiers(&self) -> Result<(), AuctionError> {
        let invalid = |reason: String| AuctionError::InvalidConfig { reason };

        let Some(first) = self.increment_tiers.first() else {
            return Err(invalid("increment_tiers cannot be empty".into()));
        };
        if first.from != 0 {
            return Err(invalid("increment_tiers must start at 0".into()));
        }

        let mut expected_from = 0;
        let last = self.increment_tiers.len() - 1;
        for (index, tier) in self.increment_tiers.iter().enumerate() {
            if tier.step == 0 {
                return Err(invalid(format!("tier {index} has a zero step")));
            }
            if tier.from != expected_from {
                return Err(invalid(format!(
                    "tier {index} starts at {} but previous band ended at {expected_from}",
                    tier.from
                )));
            }
            match tier.until {
                Some(until) if until <= tier.from => {
                    return Err(invalid(format!("tier {index} is empty")));
                }
                Some(until) => expected_from = until,
                None if index != last => {
                    return Err(invalid(format!("tier {index} is unbounded but not last")));
                }
                None => {}
            }
        }
        Ok(())
    }
}

/// Top-level auction aggregate header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub id: AuctionId,
    pub name: String,
    pub status: AuctionStatus,
    pub config: AuctionConfig,
    /// Round currently being offered (starts at 1).
    pub current_round: u32,
    pub trade_window_expires_at: Option<TimestampMs>,
}

// =============================================================================
// CLUSTER C: ROSTER
// =============================================================================

/// A player held by a team and the price paid for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub price: Amount,
}

/// A bidding team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub short_code: String,
    pub purse_value: Amount,
    pub purse_remaining: Amount,
    /// Owned players in acquisition order.
    pub roster: Vec<RosterEntry>,
    /// Net purse effect of trades not matched by roster value changes
    /// (unsettled or capped settlements). Keeps
    /// `purse_remaining = purse_value - roster_value + trade_adjustment`.
    #[serde(default)]
    pub trade_adjustment: i64,
}

impl Team {
    /// Number of players currently owned.
    pub fn squad_size(&self) -> u32 {
        u32::try_from(self.roster.len()).unwrap_or(u32::MAX)
    }

    /// Sum of purchase prices of owned players.
    pub fn roster_value(&self) -> Amount {
        self.roster.iter().map(|entry| entry.price).sum()
    }

    pub fn owns(&self, player_id: &PlayerId) -> bool {
        self.roster.iter().any(|entry| &entry.player_id == player_id)
    }

    /// Whether the purse matches the roster and recorded trade adjustments.
    pub fn purse_balances(&self) -> bool {
        let expected = i128::from(self.purse_value) - i128::from(self.roster_value())
            + i128::from(self.trade_adjustment);
        expected == i128::from(self.purse_remaining)
    }
}

/// Playing role of a cricketer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerRole {
    Batter,
    Bowler,
    AllRounder,
    WicketKeeper,
}

/// Lifecycle status of a player in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    /// Waiting to be offered.
    #[default]
    Pool,
    /// Currently up for bidding.
    InBidding,
    Sold,
    /// Offered without bids; may return to the pool in a later round.
    Unsold,
    Disqualified,
    Ineligible,
    /// Kept by a team before the auction.
    Retained,
}

impl PlayerStatus {
    /// Whether the player can be put up for bidding right now.
    pub fn is_selectable(&self) -> bool {
        matches!(self, Self::Pool)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pool => "pool",
            Self::InBidding => "in_bidding",
            Self::Sold => "sold",
            Self::Unsold => "unsold",
            Self::Disqualified => "disqualified",
            Self::Ineligible => "ineligible",
            Self::Retained => "retained",
        }
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A player in an auction's pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub role: PlayerRole,
    /// Opening bid for this player.
    pub base_price: Amount,
    pub status: PlayerStatus,
    pub team_id: Option<TeamId>,
    pub purchase_price: Option<Amount>,
    /// How many times the player has been put up for bidding.
    #[serde(default)]
    pub times_offered: u32,
}

// =============================================================================
// CLUSTER D: BIDDING
// =============================================================================

/// Phase of the per-auction bidding state machine.
///
/// ```text
/// waiting -> revealed -> open <-> going_once <-> going_twice -> sold
///                          \__________ no bids __________/ -> unsold
/// sold | unsold -> waiting
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BiddingPhase {
    #[default]
    Waiting,
    Revealed,
    Open,
    GoingOnce,
    GoingTwice,
    Sold,
    Unsold,
}

impl BiddingPhase {
    /// Phases in which a bid may be accepted.
    pub fn accepts_bids(&self) -> bool {
        matches!(self, Self::Open | Self::GoingOnce | Self::GoingTwice)
    }

    /// Phases with no player on the block.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Waiting | Self::Sold | Self::Unsold)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Revealed => "revealed",
            Self::Open => "open",
            Self::GoingOnce => "going_once",
            Self::GoingTwice => "going_twice",
            Self::Sold => "sold",
            Self::Unsold => "unsold",
        }
    }
}

impl fmt::Display for BiddingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub team_id: TeamId,
    pub amount: Amount,
    pub placed_at: TimestampMs,
}

/// Read-only view of the bidding state, mirrored to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BiddingView {
    pub phase: BiddingPhase,
    pub player_id: Option<PlayerId>,
    pub current_bid: Option<Amount>,
    pub highest_bidder: Option<TeamId>,
    /// Bids of the active round, oldest first.
    pub bids: Vec<Bid>,
    pub timer_expires_at: Option<TimestampMs>,
    /// Remaining timer while the auction is paused.
    pub paused_remaining_ms: Option<u64>,
}

// =============================================================================
// CLUSTER E: TRADES
// =============================================================================

/// Trade workflow status.
///
/// ```text
/// pending_counterparty --accept--> both_agreed --approve--> executed
///        |  reject / withdraw / cancel / expire      | reject / cancel / expire
///        v                                           v
///     rejected | withdrawn | cancelled | expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    PendingCounterparty,
    BothAgreed,
    Executed,
    Rejected,
    Withdrawn,
    Cancelled,
    Expired,
}

impl TradeStatus {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: TradeStatus) -> bool {
        match (self, next) {
            (Self::PendingCounterparty, Self::BothAgreed) => true,
            (Self::PendingCounterparty, Self::Rejected) => true,
            (Self::PendingCounterparty, Self::Withdrawn) => true,
            (Self::PendingCounterparty, Self::Cancelled) => true,
            (Self::PendingCounterparty, Self::Expired) => true,
            (Self::BothAgreed, Self::Executed) => true,
            (Self::BothAgreed, Self::Rejected) => true,
            (Self::BothAgreed, Self::Cancelled) => true,
            (Self::BothAgreed, Self::Expired) => true,
            _ => false,
        }
    }

    /// Open trades lock the players they offer.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::PendingCounterparty | Self::BothAgreed)
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingCounterparty => "pending_counterparty",
            Self::BothAgreed => "both_agreed",
            Self::Executed => "executed",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side pays the settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementDirection {
    InitiatorPays,
    CounterpartyPays,
}

/// Who rejected a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectedBy {
    Counterparty,
    Admin,
}

/// Who created a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeOrigin {
    Team,
    Admin,
}

/// A player put into a trade, valued at its sale price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferedPlayer {
    pub player_id: PlayerId,
    pub price: Amount,
}

/// One side of a bilateral trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeSide {
    pub team_id: TeamId,
    pub players: Vec<OfferedPlayer>,
    pub total_value: Amount,
}

impl TradeSide {
    pub fn new(team_id: TeamId, players: Vec<OfferedPlayer>) -> Self {
        let total_value = players.iter().map(|p| p.price).sum();
        Self {
            team_id,
            players,
            total_value,
        }
    }

    pub fn offers(&self, player_id: &PlayerId) -> bool {
        self.players.iter().any(|p| &p.player_id == player_id)
    }
}

/// A bilateral player-swap proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub auction_id: AuctionId,
    pub initiator: TradeSide,
    pub counterparty: TradeSide,
    /// `|initiator.total_value - counterparty.total_value|`
    pub settlement_amount: Amount,
    pub settlement_direction: SettlementDirection,
    pub status: TradeStatus,
    pub origin: TradeOrigin,
    pub initiator_message: Option<String>,
    pub counterparty_message: Option<String>,
    pub admin_note: Option<String>,
    pub rejection_reason: Option<String>,
    pub rejected_by: Option<RejectedBy>,
    pub cancellation_reason: Option<String>,
    pub created_at: TimestampMs,
    pub updated_at: TimestampMs,
    pub executed_at: Option<TimestampMs>,
}

impl Trade {
    /// Both teams taking part in the trade.
    pub fn parties(&self) -> [&TeamId; 2] {
        [&self.initiator.team_id, &self.counterparty.team_id]
    }

    pub fn involves(&self, team_id: &TeamId) -> bool {
        &self.initiator.team_id == team_id || &self.counterparty.team_id == team_id
    }

    /// Team that pays the settlement and team that receives it.
    pub fn payer_and_payee(&self) -> (&TeamId, &TeamId) {
        match self.settlement_direction {
            SettlementDirection::InitiatorPays => {
                (&self.initiator.team_id, &self.counterparty.team_id)
            }
            SettlementDirection::CounterpartyPays => {
                (&self.counterparty.team_id, &self.initiator.team_id)
            }
        }
    }
}
