//! Outbound ports for the live gateway.
//!
//! The gateway owns no auction state. It resolves credentials through a
//! [`CredentialResolver`] and reaches auctions through an
//! [`AuctionDirectory`], which the runtime implements over its actors.

use async_trait::async_trait;
use shared_bus::{CommandReceipt, Subscription};
use shared_types::{
    Actor, AuctionCommand, AuctionError, AuctionId, AuctionSnapshot, Role, TeamId,
};

/// Identity a connection resolved to at handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub role: Role,
    /// Set for team connections only.
    pub team_id: Option<TeamId>,
}

impl Credential {
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            team_id: None,
        }
    }

    pub fn team(team_id: TeamId) -> Self {
        Self {
            role: Role::Team,
            team_id: Some(team_id),
        }
    }

    pub fn spectator() -> Self {
        Self {
            role: Role::Spectator,
            team_id: None,
        }
    }
}

/// Maps a connection token to a role for one auction.
pub trait CredentialResolver: Send + Sync {
    /// `None` when the token grants nothing for this auction.
    fn resolve(&self, auction_id: &AuctionId, token: &str) -> Option<Credential>;
}

/// Access to running auctions.
#[async_trait]
pub trait AuctionDirectory: Send + Sync {
    /// Apply `command` as `actor`, in the auction's application order.
    async fn submit(
        &self,
        auction_id: &AuctionId,
        actor: Actor,
        command: AuctionCommand,
    ) -> Result<CommandReceipt, AuctionError>;

    /// Current state narrowed to one viewer.
    async fn snapshot(
        &self,
        auction_id: &AuctionId,
        role: Role,
        team_id: Option<TeamId>,
    ) -> Result<AuctionSnapshot, AuctionError>;

    /// Event stream of one auction, starting after the latest event.
    fn subscribe(&self, auction_id: &AuctionId) -> Result<Subscription, AuctionError>;
}
