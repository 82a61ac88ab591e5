//! Running auctions by id, and the gateway's view of them.

use crate::actor::{self, AuctionHandle};
use crate::clock::Clock;
use crate::auction_core::AuctionCore;
use async_trait::async_trait;
use auction_telemetry::log_auction_event;
use ca_01_ledger::{AuctionLedger, AuctionSeed, LedgerStore};
use ca_04_live_gateway::AuctionDirectory;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_bus::{CommandReceipt, EventFilter, InMemoryEventBus, Subscription};
use shared_types::{
    Actor, AuctionCommand, AuctionError, AuctionId, AuctionSnapshot, PlayerStatus, Role, TeamId,
};
use std::sync::Arc;
use tracing::warn;

pub struct AuctionRegistry {
    auctions: DashMap<AuctionId, AuctionHandle>,
    bus: Arc<InMemoryEventBus>,
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl AuctionRegistry {
    pub fn new(
        bus: Arc<InMemoryEventBus>,
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            auctions: DashMap::new(),
            bus,
            store,
            clock,
        }
    }

    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    /// Start an auction. A ledger already in the store wins over the seed.
    pub fn load_seed(&self, seed: AuctionSeed) -> Result<AuctionHandle, AuctionError> {
        let ledger = match self.store.load(&seed.id)? {
            Some(stored) => {
                log_auction_event!(info, "runtime", "Restoring stored ledger", seed.id);
                restore(stored)
            }
            None => {
                let mut ledger = AuctionLedger::from_seed(seed)?;
                let audit = ledger.take_pending_audit();
                self.store.commit(&ledger, &audit)?;
                log_auction_event!(
                    info,
                    "runtime",
                    "Auction loaded from seed",
                    ledger.id(),
                    teams = ledger.teams().len(),
                    players = ledger.players().len()
                );
                ledger
            }
        };
        self.spawn(ledger)
    }

    /// Start every stored auction that is not running yet.
    pub fn resume_stored(&self) -> Result<usize, AuctionError> {
        let mut resumed = 0;
        for auction_id in self.store.auction_ids()? {
            if self.auctions.contains_key(&auction_id) {
                continue;
            }
            match self.store.load(&auction_id)? {
                Some(ledger) => {
                    self.spawn(restore(ledger))?;
                    resumed += 1;
                }
                None => warn!(%auction_id, "Listed auction has no stored ledger"),
            }
        }
        Ok(resumed)
    }

    pub fn get(&self, auction_id: &AuctionId) -> Result<AuctionHandle, AuctionError> {
        self.auctions
            .get(auction_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AuctionError::AuctionNotFound(auction_id.to_string()))
    }

    pub fn handles(&self) -> Vec<AuctionHandle> {
        self.auctions.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.auctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.auctions.is_empty()
    }

    fn spawn(&self, ledger: AuctionLedger) -> Result<AuctionHandle, AuctionError> {
        match self.auctions.entry(ledger.id().clone()) {
            Entry::Occupied(entry) => Err(AuctionError::InvalidConfig {
                reason: format!("auction {} is already running", entry.key()),
            }),
            Entry::Vacant(entry) => {
                let core = AuctionCore::new(ledger, self.store.clone());
                let handle = actor::spawn(core, self.bus.clone(), self.clock.clone());
                entry.insert(handle.clone());
                Ok(handle)
            }
        }
    }
}

/// Bidding state is not persisted; a player left on the block goes back to
/// the pool.
fn restore(mut ledger: AuctionLedger) -> AuctionLedger {
    let stranded: Vec<_> = ledger
        .players()
        .iter()
        .filter(|p| p.status == PlayerStatus::InBidding)
        .map(|p| p.id.clone())
        .collect();
    for player_id in stranded {
        if let Ok(player) = ledger.player_mut(&player_id) {
            player.status = PlayerStatus::Pool;
        }
        log_auction_event!(
            warn,
            "runtime",
            "Player was on the block at shutdown, returned to pool",
            ledger.id(),
            player_id = %player_id
        );
    }
    ledger
}

#[async_trait]
impl AuctionDirectory for AuctionRegistry {
    async fn submit(
        &self,
        auction_id: &AuctionId,
        actor: Actor,
        command: AuctionCommand,
    ) -> Result<CommandReceipt, AuctionError> {
        self.get(auction_id)?.submit(actor, command).await
    }

    async fn snapshot(
        &self,
        auction_id: &AuctionId,
        role: Role,
        team_id: Option<TeamId>,
    ) -> Result<AuctionSnapshot, AuctionError> {
        self.get(auction_id)?.snapshot(role, team_id).await
    }

    fn subscribe(&self, auction_id: &AuctionId) -> Result<Subscription, AuctionError> {
        self.get(auction_id)?;
        Ok(self.bus.subscribe(EventFilter::auction(auction_id.clone())))
    }
}
