//! # `EventEnvelope`
//!
//! Wrapper for every event leaving an auction.
//!
//! - **Versioning**: all envelopes carry a `version` for forward compatibility.
//! - **Ordering**: `sequence` is strictly increasing per auction, so a client
//!   that sees a gap knows to request a fresh snapshot.
//! - **Audience**: decides which connected roles may see the payload.

use crate::commands::Role;
use crate::entities::{AuctionId, TeamId, TimestampMs};
use serde::{Deserialize, Serialize};

/// Current envelope protocol version.
pub const ENVELOPE_VERSION: u16 = 1;

/// Who may receive an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "teams", rename_all = "snake_case")]
pub enum Audience {
    /// Every connected client, spectators included.
    Public,
    /// Private to one team; admins see these too.
    Team(TeamId),
    /// The teams party to an open trade, plus admins.
    Parties(Vec<TeamId>),
    /// Admin consoles only.
    Admin,
}

impl Audience {
    /// Whether a client connected as `role` (bound to `team`, if any) sees
    /// events with this audience.
    pub fn visible_to(&self, role: Role, team: Option<&TeamId>) -> bool {
        match (self, role) {
            (Self::Public, _) => true,
            (_, Role::Admin) => true,
            (Self::Team(target), Role::Team) => team == Some(target),
            (Self::Parties(parties), Role::Team) => team.map_or(false, |t| parties.contains(t)),
            _ => false,
        }
    }
}

/// An ordered, audience-scoped event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    /// Protocol version.
    pub version: u16,
    /// Auction that produced the event.
    pub auction_id: AuctionId,
    /// Position in the auction's application order.
    pub sequence: u64,
    /// Milliseconds since epoch at which the state change was committed.
    pub emitted_at: TimestampMs,
    pub audience: Audience,
    pub payload: T,
}

impl<T> EventEnvelope<T> {
    pub fn new(
        auction_id: AuctionId,
        sequence: u64,
        emitted_at: TimestampMs,
        audience: Audience,
        payload: T,
    ) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            auction_id,
            sequence,
            emitted_at,
            audience,
            payload,
        }
    }

    pub fn is_public(&self) -> bool {
        self.audience == Audience::Public
    }
}
