//! # Command Surface
//!
//! Role-scoped commands accepted from connected clients, and the
//! authorization matrix that maps a connection's [`Role`] to the [`Actor`]
//! recorded against every applied command.
//!
//! | Command group | Admin | Team | Spectator |
//! |---------------|-------|------|-----------|
//! | Status, selection, overrides, undo/redo | yes | no | no |
//! | `place_bid`, `propose_trade` | on behalf of a named team | own team | no |
//! | `accept_trade`, `reject_trade`, `withdraw_trade` | yes | if party | no |
//! | Trade approval, admin trades, cancel, announce | yes | no | no |

use crate::entities::{Amount, PlayerId, TeamId, TradeId};
use crate::errors::AuctionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A command addressed to one auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AuctionCommand {
    // Auction status
    StartAuction,
    PauseAuction,
    ResumeAuction,
    OpenTradeWindow {
        duration_secs: u64,
    },
    CompleteAuction,
    FinalizeAuction,

    // Live bidding
    SelectNextPlayer {
        #[serde(default)]
        player_id: Option<PlayerId>,
    },
    OpenBidding,
    PlaceBid {
        amount: Amount,
        /// Required when an admin bids on a team's behalf.
        #[serde(default)]
        team_id: Option<TeamId>,
    },
    SkipPlayer,
    AdvanceToNext,

    // Admin overrides
    ForceOutcome {
        player_id: PlayerId,
        /// `None` forces the player unsold.
        #[serde(default)]
        team_id: Option<TeamId>,
        /// Defaults to the standing bid, then the player's base price.
        #[serde(default)]
        price: Option<Amount>,
    },
    DisqualifyPlayer {
        player_id: PlayerId,
    },
    ReinstatePlayer {
        player_id: PlayerId,
    },
    UndoLast,
    RedoLast,

    // Trades
    ProposeTrade {
        counterparty: TeamId,
        offered: Vec<PlayerId>,
        requested: Vec<PlayerId>,
        #[serde(default)]
        message: Option<String>,
        /// Required when an admin proposes on a team's behalf.
        #[serde(default)]
        team_id: Option<TeamId>,
    },
    AcceptTrade {
        trade_id: TradeId,
        #[serde(default)]
        message: Option<String>,
    },
    RejectTrade {
        trade_id: TradeId,
        #[serde(default)]
        reason: Option<String>,
    },
    WithdrawTrade {
        trade_id: TradeId,
    },
    ApproveAndExecuteTrade {
        trade_id: TradeId,
        #[serde(default)]
        note: Option<String>,
    },
    AdminInitiateTrade {
        initiator: TeamId,
        counterparty: TeamId,
        offered: Vec<PlayerId>,
        requested: Vec<PlayerId>,
        #[serde(default)]
        note: Option<String>,
    },
    CancelTrade {
        trade_id: TradeId,
        #[serde(default)]
        reason: Option<String>,
    },

    /// Non-authoritative message shown to every client.
    Announce {
        message: String,
    },
}

/// Authorization class of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permission {
    AdminOnly,
    /// Team acts as itself; admin must name the team.
    TeamOrAdminOnBehalf,
    /// Team acts as itself; admin acts as admin.
    PartyOrAdmin,
}

impl AuctionCommand {
    /// Stable command name used in logs, metrics and audit records.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartAuction => "start_auction",
            Self::PauseAuction => "pause_auction",
            Self::ResumeAuction => "resume_auction",
            Self::OpenTradeWindow { .. } => "open_trade_window",
            Self::CompleteAuction => "complete_auction",
            Self::FinalizeAuction => "finalize_auction",
            Self::SelectNextPlayer { .. } => "select_next_player",
            Self::OpenBidding => "open_bidding",
            Self::PlaceBid { .. } => "place_bid",
            Self::SkipPlayer => "skip_player",
            Self::AdvanceToNext => "advance_to_next",
            Self::ForceOutcome { .. } => "force_outcome",
            Self::DisqualifyPlayer { .. } => "disqualify_player",
            Self::ReinstatePlayer { .. } => "reinstate_player",
            Self::UndoLast => "undo_last",
            Self::RedoLast => "redo_last",
            Self::ProposeTrade { .. } => "propose_trade",
            Self::AcceptTrade { .. } => "accept_trade",
            Self::RejectTrade { .. } => "reject_trade",
            Self::WithdrawTrade { .. } => "withdraw_trade",
            Self::ApproveAndExecuteTrade { .. } => "approve_and_execute_trade",
            Self::AdminInitiateTrade { .. } => "admin_initiate_trade",
            Self::CancelTrade { .. } => "cancel_trade",
            Self::Announce { .. } => "announce",
        }
    }

    fn permission(&self) -> Permission {
        match self {
            Self::PlaceBid { .. } | Self::ProposeTrade { .. } => Permission::TeamOrAdminOnBehalf,
            Self::AcceptTrade { .. } | Self::RejectTrade { .. } | Self::WithdrawTrade { .. } => {
                Permission::PartyOrAdmin
            }
            _ => Permission::AdminOnly,
        }
    }

    /// Team named explicitly in the command body, if any.
    fn named_team(&self) -> Option<&TeamId> {
        match self {
            Self::PlaceBid { team_id, .. } | Self::ProposeTrade { team_id, .. } => team_id.as_ref(),
            _ => None,
        }
    }

    /// Team on whose behalf a bid or proposal is made.
    pub fn acting_team(&self, actor: &Actor) -> Option<TeamId> {
        match actor {
            Actor::Team(team_id) => Some(team_id.clone()),
            Actor::Admin | Actor::System => self.named_team().cloned(),
        }
    }
}

/// Role a connection resolved to at handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Team,
    Spectator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Team => "team",
            Self::Spectator => "spectator",
        }
    }

    /// Check whether this role may issue `command`, and resolve the actor
    /// recorded against it. `team` is the team a team connection is bound to.
    pub fn authorize(
        &self,
        command: &AuctionCommand,
        team: Option<&TeamId>,
    ) -> Result<Actor, AuctionError> {
        let deny = || AuctionError::UnauthorizedRole {
            role: self.as_str().to_string(),
            command: command.name().to_string(),
        };

        match (self, command.permission()) {
            (Role::Spectator, _) => Err(deny()),
            (Role::Admin, Permission::TeamOrAdminOnBehalf) => {
                if command.named_team().is_some() {
                    Ok(Actor::Admin)
                } else {
                    Err(deny())
                }
            }
            (Role::Admin, _) => Ok(Actor::Admin),
            (Role::Team, Permission::AdminOnly) => Err(deny()),
            (Role::Team, _) => {
                let Some(own) = team else {
                    return Err(deny());
                };
                match command.named_team() {
                    Some(named) if named != own => Err(deny()),
                    _ => Ok(Actor::Team(own.clone())),
                }
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Principal recorded against an applied command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "team_id", rename_all = "snake_case")]
pub enum Actor {
    Admin,
    Team(TeamId),
    /// Timers, sweeps and automatic advances.
    System,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    pub fn team(&self) -> Option<&TeamId> {
        match self {
            Self::Team(team_id) => Some(team_id),
            _ => None,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Team(team_id) => write!(f, "team:{team_id}"),
            Self::System => f.write_str("system"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bid(team_id: Option<&str>) -> AuctionCommand {
        AuctionCommand::PlaceBid {
            amount: 100,
            team_id: team_id.map(TeamId::from),
        }
    }

    #[test]
    fn test_spectator_is_read_only() {
        let err = Role::Spectator.authorize(&bid(None), None).unwrap_err();
        assert!(matches!(err, AuctionError::UnauthorizedRole { .. }));
        assert!(Role::Spectator
            .authorize(&AuctionCommand::StartAuction, None)
            .is_err());
    }

    #[test]
    fn test_team_cannot_run_admin_commands() {
        let team = TeamId::from("a");
        assert!(Role::Team
            .authorize(&AuctionCommand::UndoLast, Some(&team))
            .is_err());
        assert!(Role::Team
            .authorize(&AuctionCommand::SelectNextPlayer { player_id: None }, Some(&team))
            .is_err());
    }

    #[test]
    fn test_team_bids_as_itself() {
        let team = TeamId::from("a");
        let actor = Role::Team.authorize(&bid(None), Some(&team)).unwrap();
        assert_eq!(actor, Actor::Team(team.clone()));
        assert!(Role::Team.authorize(&bid(Some("b")), Some(&team)).is_err());
        assert!(Role::Team.authorize(&bid(Some("a")), Some(&team)).is_ok());
    }

    #[test]
    fn test_admin_bids_on_behalf_of_named_team() {
        assert!(Role::Admin.authorize(&bid(None), None).is_err());
        let command = bid(Some("b"));
        let actor = Role::Admin.authorize(&command, None).unwrap();
        assert_eq!(actor, Actor::Admin);
        assert_eq!(command.acting_team(&actor), Some(TeamId::from("b")));
    }

    #[test]
    fn test_command_wire_format() {
        let json = r#"{"command":"place_bid","amount":100}"#;
        let command: AuctionCommand = serde_json::from_str(json).unwrap();
        assert_eq!(command, bid(None));

        let json = r#"{"command":"select_next_player"}"#;
        let command: AuctionCommand = serde_json::from_str(json).unwrap();
        assert_eq!(command, AuctionCommand::SelectNextPlayer { player_id: None });
    }
}
