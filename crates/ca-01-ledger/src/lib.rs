//! # Auction Ledger (ca-01)
//!
//! The persisted record of one auction's teams, players, purses and trades,
//! and the append-only audit trail of every action that changed them.
//!
//! ## Ownership
//!
//! ```text
//! Auction ──owns──▶ Teams (purse, roster)
//!    │
//!    └────owns──▶ Players (status, owner, price)
//!
//! Trade ──references by id──▶ Teams / Players   (re-validated at each step)
//! ```
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - The `AuctionLedger` aggregate, audit records, seeds
//! - `ports/` - `LedgerStore`, the durable-commit port
//! - `adapters/` - In-memory and JSON-file stores
//!
//! The auction runtime applies each command to a staged copy of the ledger,
//! verifies its invariants and commits it through `LedgerStore::commit`
//! before anything is broadcast.

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::json_file::JsonFileLedgerStore;
pub use adapters::memory::InMemoryLedgerStore;
pub use domain::audit::{AuditAction, AuditQuery, AuditRecord};
pub use domain::errors::LedgerError;
pub use domain::ledger::AuctionLedger;
pub use domain::patch::LedgerPatch;
pub use domain::seed::{AuctionSeed, PlayerSeed, TeamSeed};
pub use ports::outbound::LedgerStore;
