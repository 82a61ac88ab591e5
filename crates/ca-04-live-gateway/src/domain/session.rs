//! Per-connection session state.
//!
//! A session knows who is connected and which events it has already been
//! given. It decides, without I/O, what a connection may send and see:
//!
//! - inbound frames are size-checked, rate-limited and decoded;
//! - commands are authorized for the connection's role before they reach
//!   the auction;
//! - outbound envelopes are dropped unless the audience includes this
//!   viewer, and dropped again if a snapshot already covered them.

use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::domain::messages::{ClientMessage, ServerMessage};
use crate::ports::Credential;
use shared_bus::{AuctionEventEnvelope, CommandReceipt};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use shared_types::{Actor, AuctionCommand, AuctionId, AuctionSnapshot, Role, TeamId};
use std::num::NonZeroU32;
use uuid::Uuid;

/// Token bucket refilled at `rate_limit` messages per second, bursting up
/// to the same amount.
fn message_limiter(rate_limit: u32) -> DefaultDirectRateLimiter {
    let per_second = NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(per_second))
}

pub struct Session {
    connection_id: Uuid,
    auction_id: AuctionId,
    credential: Credential,
    /// Highest sequence already delivered or covered by a snapshot.
    last_sequence: u64,
    max_message_size: usize,
    limiter: DefaultDirectRateLimiter,
}

impl Session {
    pub fn new(
        auction_id: AuctionId,
        credential: Credential,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            auction_id,
            credential,
            last_sequence: 0,
            max_message_size: config.max_message_size,
            limiter: message_limiter(config.rate_limit),
        }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn auction_id(&self) -> &AuctionId {
        &self.auction_id
    }

    pub fn role(&self) -> Role {
        self.credential.role
    }

    pub fn team_id(&self) -> Option<&TeamId> {
        self.credential.team_id.as_ref()
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn welcome(&self) -> ServerMessage {
        ServerMessage::Welcome {
            connection_id: self.connection_id,
            role: self.role(),
            team_id: self.credential.team_id.clone(),
        }
    }

    /// Size-check, rate-limit and decode one inbound frame.
    pub fn decode(&mut self, text: &str) -> Result<ClientMessage, GatewayError> {
        if text.len() > self.max_message_size {
            return Err(GatewayError::MessageTooLarge {
                size: text.len(),
                max: self.max_message_size,
            });
        }
        if self.limiter.check().is_err() {
            return Err(GatewayError::RateLimited);
        }
        serde_json::from_str(text).map_err(|e| GatewayError::MalformedMessage(e.to_string()))
    }

    /// Actor the command would be applied as.
    pub fn authorize(&self, command: &AuctionCommand) -> Result<Actor, GatewayError> {
        Ok(self.role().authorize(command, self.team_id())?)
    }

    /// Acknowledge a command, counting only the events this viewer may see.
    pub fn ack(&self, request_id: Option<String>, mut receipt: CommandReceipt) -> ServerMessage {
        receipt
            .events
            .retain(|envelope| envelope.audience.visible_to(self.role(), self.team_id()));
        ServerMessage::ack(request_id, receipt)
    }

    /// Frame a snapshot for this viewer and skip every event it covers.
    pub fn accept_snapshot(&mut self, snapshot: AuctionSnapshot) -> ServerMessage {
        self.last_sequence = snapshot.sequence;
        ServerMessage::snapshot(snapshot, self.role(), self.team_id())
    }

    /// Frame an envelope if this viewer may see it and has not yet.
    pub fn project(&mut self, envelope: AuctionEventEnvelope) -> Option<ServerMessage> {
        if envelope.auction_id != self.auction_id || envelope.sequence <= self.last_sequence {
            return None;
        }
        self.last_sequence = envelope.sequence;
        envelope
            .audience
            .visible_to(self.role(), self.team_id())
            .then(|| ServerMessage::Event(envelope))
    }
}
