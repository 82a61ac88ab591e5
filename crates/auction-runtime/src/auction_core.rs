//! # Auction Core
//!
//! Committed state of one auction and the staged-apply cycle every change
//! goes through:
//!
//! ```text
//! clone ledger + machine ──▶ apply command / timer / sweep to the copies
//!        │                                   │ error: copies dropped
//!        ▼                                   ▼
//!  verify invariants ──▶ LedgerStore::commit ──▶ swap copies in ──▶ seal events
//! ```
//!
//! A failure at any step leaves the committed state exactly as it was and
//! produces no events. Sequences are assigned only after the commit, so a
//! rejected command never leaves a gap.

use crate::dispatch::{self, Step};
use ca_01_ledger::{AuctionLedger, LedgerStore};
use ca_02_bidding::{BiddingMachine, TimerDirective, TimerToken};
use ca_03_trade_negotiation::{expire_open_trades, trade_window_elapsed};
use shared_bus::{AuctionEventEnvelope, CommandReceipt};
use shared_types::{
    Actor, AuctionCommand, AuctionError, AuctionId, AuctionSnapshot, AuctionStatus, Role, TeamId,
    TimestampMs,
};
use std::sync::Arc;
use tracing::{debug, error};

/// A committed change, ready to publish.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applied {
    pub receipt: CommandReceipt,
    pub timer: TimerDirective,
}

pub struct AuctionCore {
    ledger: AuctionLedger,
    machine: BiddingMachine,
    /// Sequence of the last sealed event.
    sequence: u64,
    store: Arc<dyn LedgerStore>,
}

impl AuctionCore {
    pub fn new(ledger: AuctionLedger, store: Arc<dyn LedgerStore>) -> Self {
        let machine = BiddingMachine::for_ledger(&ledger);
        Self {
            ledger,
            machine,
            sequence: 0,
            store,
        }
    }

    pub fn id(&self) -> &AuctionId {
        self.ledger.id()
    }

    pub fn ledger(&self) -> &AuctionLedger {
        &self.ledger
    }

    pub fn machine(&self) -> &BiddingMachine {
        &self.machine
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn snapshot(&self, role: Role, team_id: Option<&TeamId>) -> AuctionSnapshot {
        self.ledger
            .snapshot_for(role, team_id, self.machine.view(), self.sequence)
    }

    /// Apply one client command.
    pub fn execute(
        &mut self,
        actor: &Actor,
        command: AuctionCommand,
        now: TimestampMs,
    ) -> Result<Applied, AuctionError> {
        self.stage(now, |ledger, machine| {
            dispatch::dispatch(ledger, machine, actor, command, now)
        })
    }

    /// Handle a fired timer. `None` when the token was stale.
    pub fn fire_timer(
        &mut self,
        token: TimerToken,
        now: TimestampMs,
    ) -> Result<Option<Applied>, AuctionError> {
        let mut ledger = self.ledger.clone();
        let mut machine = self.machine.clone();
        match machine.on_timer(&mut ledger, token, now)? {
            Some(transition) => self
                .commit(ledger, machine, Step::from(transition), now)
                .map(Some),
            None => Ok(None),
        }
    }

    /// Close an elapsed trade window and expire trades left open outside
    /// it. `None` when there was nothing to do.
    pub fn sweep(&mut self, now: TimestampMs) -> Result<Option<Applied>, AuctionError> {
        let window_elapsed = trade_window_elapsed(&self.ledger, now);
        let stranded = self.ledger.status().is_mutable()
            && self.ledger.status() != AuctionStatus::TradeWindow
            && self.ledger.trades().iter().any(|t| t.status.is_open());
        if !window_elapsed && !stranded {
            return Ok(None);
        }

        self.stage(now, |ledger, machine| {
            let mut step = Step::default();
            if trade_window_elapsed(ledger, now) {
                step.absorb(dispatch::complete(ledger, machine, &Actor::System, now)?);
            }
            step.absorb(expire_open_trades(ledger, now)?);
            Ok(step)
        })
        .map(Some)
    }

    fn stage<F>(&mut self, now: TimestampMs, apply: F) -> Result<Applied, AuctionError>
    where
        F: FnOnce(&mut AuctionLedger, &mut BiddingMachine) -> Result<Step, AuctionError>,
    {
        let mut ledger = self.ledger.clone();
        let mut machine = self.machine.clone();
        let step = apply(&mut ledger, &mut machine)?;
        self.commit(ledger, machine, step, now)
    }

    fn commit(
        &mut self,
        mut ledger: AuctionLedger,
        machine: BiddingMachine,
        step: Step,
        now: TimestampMs,
    ) -> Result<Applied, AuctionError> {
        if let Err(reason) = ledger.verify_invariants() {
            error!(auction_id = %self.id(), %reason, "Staged ledger violates invariants, discarding");
            return Err(AuctionError::Persistence(format!(
                "ledger invariant violated: {reason}"
            )));
        }

        let audit = ledger.take_pending_audit();
        if !audit.is_empty() || ledger != self.ledger {
            self.store.commit(&ledger, &audit).map_err(|e| {
                error!(auction_id = %self.id(), error = %e, "Ledger commit failed");
                AuctionError::from(e)
            })?;
            debug!(auction_id = %self.id(), audit_records = audit.len(), "Ledger committed");
        }

        self.ledger = ledger;
        self.machine = machine;

        let auction_id = self.ledger.id().clone();
        let events: Vec<AuctionEventEnvelope> = step
            .events
            .into_iter()
            .map(|event| {
                self.sequence += 1;
                event.seal(auction_id.clone(), self.sequence, now)
            })
            .collect();

        Ok(Applied {
            receipt: CommandReceipt {
                events,
                warnings: step.warnings,
            },
            timer: step.timer,
        })
    }
}
