//! In-memory directory used by the gateway's unit tests.

use crate::ports::AuctionDirectory;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{CommandReceipt, EventFilter, InMemoryEventBus, Subscription};
use shared_types::{
    Actor, AuctionCommand, AuctionConfig, AuctionError, AuctionId, AuctionSnapshot,
    AuctionStatus, BiddingView, PoolCounts, PoolSummary, Role, TeamId,
};

pub(crate) struct FakeDirectory {
    auction_id: AuctionId,
    bus: InMemoryEventBus,
    sequence: Mutex<u64>,
    rejection: Mutex<Option<AuctionError>>,
    receipt: Mutex<CommandReceipt>,
    submitted: Mutex<Vec<(Actor, AuctionCommand)>>,
}

impl FakeDirectory {
    pub(crate) fn new(auction_id: &str) -> Self {
        Self {
            auction_id: AuctionId::from(auction_id),
            bus: InMemoryEventBus::with_capacity(16),
            sequence: Mutex::new(0),
            rejection: Mutex::new(None),
            receipt: Mutex::new(CommandReceipt::default()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_sequence(&self, sequence: u64) {
        *self.sequence.lock() = sequence;
    }

    pub(crate) fn reject_with(&self, err: AuctionError) {
        *self.rejection.lock() = Some(err);
    }

    pub(crate) fn respond_with(&self, receipt: CommandReceipt) {
        *self.receipt.lock() = receipt;
    }

    pub(crate) fn submitted(&self) -> Vec<(Actor, AuctionCommand)> {
        self.submitted.lock().clone()
    }

    fn check(&self, auction_id: &AuctionId) -> Result<(), AuctionError> {
        if auction_id == &self.auction_id {
            Ok(())
        } else {
            Err(AuctionError::AuctionNotFound(auction_id.to_string()))
        }
    }
}

#[async_trait]
impl AuctionDirectory for FakeDirectory {
    async fn submit(
        &self,
        auction_id: &AuctionId,
        actor: Actor,
        command: AuctionCommand,
    ) -> Result<CommandReceipt, AuctionError> {
        self.check(auction_id)?;
        if let Some(err) = self.rejection.lock().clone() {
            return Err(err);
        }
        self.submitted.lock().push((actor, command));
        Ok(self.receipt.lock().clone())
    }

    async fn snapshot(
        &self,
        auction_id: &AuctionId,
        role: Role,
        team_id: Option<TeamId>,
    ) -> Result<AuctionSnapshot, AuctionError> {
        self.check(auction_id)?;
        let snapshot = AuctionSnapshot {
            auction_id: self.auction_id.clone(),
            name: "Test Auction".into(),
            status: AuctionStatus::Live,
            current_round: 1,
            trade_window_expires_at: None,
            config: AuctionConfig::default(),
            bidding: BiddingView::default(),
            current_player: None,
            teams: Vec::new(),
            pool: PoolSummary {
                counts: PoolCounts::default(),
                players: Vec::new(),
            },
            trades: Vec::new(),
            private: None,
            sequence: *self.sequence.lock(),
        };
        Ok(snapshot.for_viewer(role, team_id.as_ref()))
    }

    fn subscribe(&self, auction_id: &AuctionId) -> Result<Subscription, AuctionError> {
        self.check(auction_id)?;
        Ok(self.bus.subscribe(EventFilter::auction(auction_id.clone())))
    }
}
