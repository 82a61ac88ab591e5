//! # Auction Events
//!
//! Every state change an auction broadcasts. Each event carries enough data
//! to be applied as a pure delta against the last known state; only the
//! initial snapshot is required to interpret any of them.

use serde::{Deserialize, Serialize};
use shared_types::{
    Amount, Audience, AuctionId, AuctionSnapshot, AuctionStatus, Bid, BiddingPhase, BiddingView,
    EventEnvelope, Player, PlayerId, PlayerStatus, TeamId, TeamPrivateView, TeamSummary,
    TimestampMs, Trade, Warning,
};

/// An auction event as it travels on the bus.
pub type AuctionEventEnvelope = EventEnvelope<AuctionEvent>;

/// All events an auction can emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AuctionEvent {
    // =========================================================================
    // SNAPSHOT
    // =========================================================================
    /// Full state, sent on connect, on request and after lag.
    StateSnapshot(Box<AuctionSnapshot>),

    // =========================================================================
    // AUCTION STATUS
    // =========================================================================
    StatusChanged {
        from: AuctionStatus,
        to: AuctionStatus,
        trade_window_expires_at: Option<TimestampMs>,
        /// Bidding state after the change; pause and resume move timers.
        bidding: BiddingView,
    },

    RoundStarted {
        round: u32,
        /// Unsold players returned to the pool for this round.
        returned_players: Vec<PlayerId>,
    },

    // =========================================================================
    // LIVE BIDDING
    // =========================================================================
    /// A player was put on the block with no bid.
    PlayerRevealed {
        player: Player,
        round: u32,
        /// When bidding opens automatically; `None` waits for the admin.
        opens_at: Option<TimestampMs>,
    },

    BiddingOpened {
        player_id: PlayerId,
        opening_bid: Amount,
        timer_expires_at: TimestampMs,
    },

    /// Append `bid` to the history and make it the current bid.
    BidPlaced {
        player_id: PlayerId,
        bid: Bid,
        phase: BiddingPhase,
        next_valid_bid: Option<Amount>,
        timer_expires_at: TimestampMs,
    },

    TimerPhaseChanged {
        player_id: Option<PlayerId>,
        phase: BiddingPhase,
        timer_expires_at: Option<TimestampMs>,
    },

    /// Player sold; carries the buying team's new purse and squad size.
    PlayerSold {
        player_id: PlayerId,
        team_id: TeamId,
        price: Amount,
        purse_remaining: Amount,
        squad_size: u32,
    },

    PlayerUnsold {
        player_id: PlayerId,
        times_offered: u32,
    },

    /// Revealed player returned to the pool without bidding.
    PlayerSkipped {
        player_id: PlayerId,
    },

    // =========================================================================
    // ADMIN
    // =========================================================================
    /// Player moved by an admin outside the bidding flow.
    PlayerStatusChanged {
        player_id: PlayerId,
        from: PlayerStatus,
        to: PlayerStatus,
    },

    /// Ledger corrected by force outcome, undo or redo. Carries the full
    /// post-correction state of every touched player and team.
    LedgerCorrected {
        action: String,
        players: Vec<Player>,
        teams: Vec<TeamSummary>,
        bidding: BiddingView,
    },

    /// Non-authoritative message for a UI toast.
    AdminAnnouncement {
        message: String,
    },

    /// Fields only one team may see.
    TeamPrivateUpdate(TeamPrivateView),

    // =========================================================================
    // TRADES
    // =========================================================================
    TradeProposed(Trade),
    TradeAccepted(Trade),
    TradeRejected(Trade),
    TradeWithdrawn(Trade),
    TradeCancelled(Trade),
    TradeExpired(Trade),
    TradeExecuted {
        trade: Trade,
        /// Both teams after the swap and settlement.
        teams: Vec<TeamSummary>,
        announcement: String,
    },
}

impl AuctionEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::StateSnapshot(_) => EventTopic::Snapshot,
            Self::StatusChanged { .. } | Self::RoundStarted { .. } => EventTopic::Status,
            Self::PlayerRevealed { .. }
            | Self::BiddingOpened { .. }
            | Self::BidPlaced { .. }
            | Self::TimerPhaseChanged { .. }
            | Self::PlayerSold { .. }
            | Self::PlayerUnsold { .. }
            | Self::PlayerSkipped { .. } => EventTopic::Bidding,
            Self::PlayerStatusChanged { .. } | Self::LedgerCorrected { .. } => EventTopic::Override,
            Self::AdminAnnouncement { .. } => EventTopic::Announcement,
            Self::TeamPrivateUpdate(_) => EventTopic::Private,
            Self::TradeProposed(_)
            | Self::TradeAccepted(_)
            | Self::TradeRejected(_)
            | Self::TradeWithdrawn(_)
            | Self::TradeCancelled(_)
            | Self::TradeExpired(_)
            | Self::TradeExecuted { .. } => EventTopic::Trade,
        }
    }

    /// Wire name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::StateSnapshot(_) => "state_snapshot",
            Self::StatusChanged { .. } => "status_changed",
            Self::RoundStarted { .. } => "round_started",
            Self::PlayerRevealed { .. } => "player_revealed",
            Self::BiddingOpened { .. } => "bidding_opened",
            Self::BidPlaced { .. } => "bid_placed",
            Self::TimerPhaseChanged { .. } => "timer_phase_changed",
            Self::PlayerSold { .. } => "player_sold",
            Self::PlayerUnsold { .. } => "player_unsold",
            Self::PlayerSkipped { .. } => "player_skipped",
            Self::PlayerStatusChanged { .. } => "player_status_changed",
            Self::LedgerCorrected { .. } => "ledger_corrected",
            Self::AdminAnnouncement { .. } => "admin_announcement",
            Self::TeamPrivateUpdate(_) => "team_private_update",
            Self::TradeProposed(_) => "trade_proposed",
            Self::TradeAccepted(_) => "trade_accepted",
            Self::TradeRejected(_) => "trade_rejected",
            Self::TradeWithdrawn(_) => "trade_withdrawn",
            Self::TradeCancelled(_) => "trade_cancelled",
            Self::TradeExpired(_) => "trade_expired",
            Self::TradeExecuted { .. } => "trade_executed",
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Snapshot,
    /// Auction status and rounds.
    Status,
    /// Live bidding flow.
    Bidding,
    /// Admin corrections.
    Override,
    Announcement,
    /// Team-private updates.
    Private,
    Trade,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Auction to follow. `None` means every auction on the bus.
    pub auction_id: Option<AuctionId>,
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for one auction.
    #[must_use]
    pub fn auction(auction_id: AuctionId) -> Self {
        Self {
            auction_id: Some(auction_id),
            topics: Vec::new(),
        }
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            auction_id: None,
            topics,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, envelope: &AuctionEventEnvelope) -> bool {
        let auction_match = self
            .auction_id
            .as_ref()
            .map_or(true, |id| id == &envelope.auction_id);

        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&envelope.payload.topic());

        auction_match && topic_match
    }
}

/// An event and the audience allowed to see it, as produced by a state
/// machine before the runtime assigns it a sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEvent {
    pub audience: Audience,
    pub event: AuctionEvent,
}

impl OutboundEvent {
    #[must_use]
    pub fn public(event: AuctionEvent) -> Self {
        Self {
            audience: Audience::Public,
            event,
        }
    }

    #[must_use]
    pub fn team(team_id: TeamId, event: AuctionEvent) -> Self {
        Self {
            audience: Audience::Team(team_id),
            event,
        }
    }

    #[must_use]
    pub fn parties(team_ids: Vec<TeamId>, event: AuctionEvent) -> Self {
        Self {
            audience: Audience::Parties(team_ids),
            event,
        }
    }

    #[must_use]
    pub fn admin(event: AuctionEvent) -> Self {
        Self {
            audience: Audience::Admin,
            event,
        }
    }

    /// Wrap in an envelope at `sequence`.
    #[must_use]
    pub fn seal(
        self,
        auction_id: AuctionId,
        sequence: u64,
        emitted_at: TimestampMs,
    ) -> AuctionEventEnvelope {
        EventEnvelope::new(auction_id, sequence, emitted_at, self.audience, self.event)
    }
}

/// Reply to a successfully applied command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandReceipt {
    /// Events emitted by the command, in application order.
    pub events: Vec<AuctionEventEnvelope>,
    /// Non-fatal conditions, such as a capped trade settlement.
    pub warnings: Vec<Warning>,
}
