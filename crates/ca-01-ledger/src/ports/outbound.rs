//! # Outbound Ports (Driven Ports)
//!
//! Persistence required by the auction runtime.

use crate::domain::audit::{AuditQuery, AuditRecord};
use crate::domain::errors::LedgerError;
use crate::domain::ledger::AuctionLedger;
use shared_types::AuctionId;

/// Durable store for auction ledgers and their audit trail.
///
/// Production: `JsonFileLedgerStore` (adapters/json_file.rs)
/// Testing: `InMemoryLedgerStore` (adapters/memory.rs)
pub trait LedgerStore: Send + Sync {
    /// Load the last committed ledger for an auction.
    fn load(&self, auction_id: &AuctionId) -> Result<Option<AuctionLedger>, LedgerError>;

    /// Persist `ledger` and append `audit` in one step.
    ///
    /// ## Atomicity Guarantee
    ///
    /// Either the ledger AND every audit record are stored, or neither is.
    /// Readers never observe a partially committed transition.
    fn commit(&self, ledger: &AuctionLedger, audit: &[AuditRecord]) -> Result<(), LedgerError>;

    /// Audit records matching `query`, oldest first.
    fn audit_records(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, LedgerError>;

    /// Auctions with a committed ledger.
    fn auction_ids(&self) -> Result<Vec<AuctionId>, LedgerError>;
}
