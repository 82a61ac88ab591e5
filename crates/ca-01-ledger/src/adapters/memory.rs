//! In-memory ledger store for tests and single-process deployments.

use crate::domain::audit::{AuditQuery, AuditRecord};
use crate::domain::errors::LedgerError;
use crate::domain::ledger::AuctionLedger;
use crate::ports::outbound::LedgerStore;
use parking_lot::RwLock;
use shared_types::AuctionId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
struct Inner {
    ledgers: HashMap<AuctionId, AuctionLedger>,
    audit: Vec<AuditRecord>,
}

/// Store that keeps everything behind one lock, so a commit is atomic with
/// respect to every reader.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Inner>,
    /// When set, every commit fails without writing.
    should_fail: AtomicBool,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent commits fail (fault injection).
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    pub fn audit_len(&self) -> usize {
        self.inner.read().audit.len()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn load(&self, auction_id: &AuctionId) -> Result<Option<AuctionLedger>, LedgerError> {
        Ok(self.inner.read().ledgers.get(auction_id).cloned())
    }

    fn commit(&self, ledger: &AuctionLedger, audit: &[AuditRecord]) -> Result<(), LedgerError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(LedgerError::CommitFailed {
                auction_id: ledger.id().to_string(),
                reason: "injected failure".to_string(),
            });
        }

        let mut inner = self.inner.write();
        inner.ledgers.insert(ledger.id().clone(), ledger.clone());
        inner.audit.extend_from_slice(audit);
        Ok(())
    }

    fn audit_records(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, LedgerError> {
        Ok(self
            .inner
            .read()
            .audit
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }

    fn auction_ids(&self) -> Result<Vec<AuctionId>, LedgerError> {
        Ok(self.inner.read().ledgers.keys().cloned().collect())
    }
}
