//! Wire messages exchanged over a live connection.
//!
//! ```text
//! client ──{"type":"command","request_id":"7","command":{"command":"place_bid","amount":150}}──▶
//!        ◀──{"type":"event", ...envelope}──  (every connection that may see it)
//!        ◀──{"type":"ack","request_id":"7","last_sequence":42,"warnings":[]}──
//! ```
//!
//! Events produced by a command reach the issuer through the same ordered
//! stream as every other client; the ack only confirms the command applied.

use serde::{Deserialize, Serialize};
use shared_bus::{AuctionEvent, AuctionEventEnvelope, CommandReceipt};
use shared_types::{
    AuctionCommand, AuctionSnapshot, Audience, EventEnvelope, Role, TeamId, Warning,
};
use uuid::Uuid;

/// Message sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Command {
        #[serde(default)]
        request_id: Option<String>,
        command: AuctionCommand,
    },
    /// Ask for a fresh snapshot, after a sequence gap for example.
    RequestSnapshot {
        #[serde(default)]
        request_id: Option<String>,
    },
    Ping {
        #[serde(default)]
        request_id: Option<String>,
    },
}

/// Message sent to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First frame after the upgrade.
    Welcome {
        connection_id: Uuid,
        role: Role,
        team_id: Option<TeamId>,
    },
    Event(AuctionEventEnvelope),
    Ack {
        request_id: Option<String>,
        /// Sequence of the last event the command produced.
        last_sequence: Option<u64>,
        warnings: Vec<Warning>,
    },
    Error {
        request_id: Option<String>,
        kind: String,
        message: String,
    },
    Pong {
        request_id: Option<String>,
    },
}

impl ServerMessage {
    pub fn ack(request_id: Option<String>, receipt: CommandReceipt) -> Self {
        Self::Ack {
            request_id,
            last_sequence: receipt.events.last().map(|e| e.sequence),
            warnings: receipt.warnings,
        }
    }

    pub fn error(request_id: Option<String>, err: &crate::GatewayError) -> Self {
        Self::Error {
            request_id,
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }

    /// A viewer-scoped snapshot, framed as an event at the snapshot's
    /// sequence.
    pub fn snapshot(snapshot: AuctionSnapshot, role: Role, team: Option<&TeamId>) -> Self {
        let audience = match (role, team) {
            (Role::Admin, _) => Audience::Admin,
            (Role::Team, Some(team_id)) => Audience::Team(team_id.clone()),
            _ => Audience::Public,
        };
        Self::Event(EventEnvelope::new(
            snapshot.auction_id.clone(),
            snapshot.sequence,
            shared_types::now_ms(),
            audience,
            AuctionEvent::StateSnapshot(Box::new(snapshot)),
        ))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({
                "type": "error",
                "kind": "Internal",
                "message": format!("failed to encode message: {e}"),
            })
            .to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Amount;

    #[test]
    fn test_parse_bid_command() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"command","request_id":"7","command":{"command":"place_bid","amount":150}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Command {
                request_id: Some("7".into()),
                command: AuctionCommand::PlaceBid {
                    amount: 150 as Amount,
                    team_id: None,
                },
            }
        );
    }

    #[test]
    fn test_parse_ping_without_request_id() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ping { request_id: None });
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe"}"#).is_err());
    }

    #[test]
    fn test_error_frame_carries_kind() {
        let err = crate::GatewayError::RateLimited;
        let json: serde_json::Value =
            serde_json::from_str(&ServerMessage::error(Some("1".into()), &err).to_json()).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["kind"], "RateLimited");
        assert_eq!(json["request_id"], "1");
    }
}
