//! # Live Gateway
//!
//! WebSocket edge of the auction service. Every client, whether admin
//! console, team dashboard or spectator screen, holds one connection per
//! auction.
//!
//! ## Responsibilities
//!
//! | Concern | Where |
//! |---------|-------|
//! | Token to role resolution | [`adapters::StaticCredentials`] |
//! | Frame limits, rate limit, command authorization | [`domain::Session`] |
//! | Per-role event projection and snapshot de-duplication | [`domain::Session::project`] |
//! | Connection loop, ping and idle timeout | [`ws::LiveConnection`] |
//! | Handshake route | [`router::live_router`] |
//!
//! ## Connection Lifecycle
//!
//! ```text
//! GET /auctions/{id}/live?token=..  ──▶ resolve role ──▶ subscribe ──▶ upgrade
//!                                                                      │
//!     welcome ◀── snapshot ◀───────────────────────────────────────────┘
//!        │
//!        ├── client command ──▶ authorize ──▶ AuctionDirectory::submit ──▶ ack | error
//!        ├── bus event ──▶ audience check ──▶ event
//!        └── lag ──▶ fresh snapshot
//! ```
//!
//! The gateway holds no auction state; the runtime provides an
//! [`ports::AuctionDirectory`] over its auction actors.

pub mod adapters;
pub mod connections;
pub mod domain;
pub mod ports;
pub mod router;
pub mod ws;

#[cfg(test)]
pub(crate) mod test_support;

pub use adapters::StaticCredentials;
pub use connections::{ConnectionGuard, ConnectionInfo, ConnectionManager};
pub use domain::{ClientMessage, ConfigError, GatewayConfig, GatewayError, ServerMessage, Session};
pub use ports::{AuctionDirectory, Credential, CredentialResolver};
pub use router::{live_router, GatewayState, LiveQuery};
pub use ws::LiveConnection;
