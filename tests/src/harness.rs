//! One auction running behind a real registry and actor.

use auction_runtime::{AuctionRegistry, MonotonicClock};
use ca_01_ledger::test_utils;
use ca_01_ledger::{AuctionSeed, InMemoryLedgerStore};
use ca_04_live_gateway::AuctionDirectory;
use shared_bus::{AuctionEvent, AuctionEventEnvelope, CommandReceipt, InMemoryEventBus, Subscription};
use shared_types::{
    Amount, AuctionCommand, AuctionError, AuctionId, AuctionSnapshot, Role, TeamId,
    TeamSummary, TradeId,
};
use std::sync::Arc;

pub struct Harness {
    pub registry: Arc<AuctionRegistry>,
    pub store: Arc<InMemoryLedgerStore>,
    pub auction_id: AuctionId,
}

impl Harness {
    /// Teams `a`, `b`, `c` with purses of 1000; players `p1`..`p4`.
    pub fn start() -> Self {
        Self::with_seed(test_utils::seed())
    }

    pub fn with_seed(seed: AuctionSeed) -> Self {
        let store = Arc::new(InMemoryLedgerStore::new());
        let registry = Arc::new(AuctionRegistry::new(
            Arc::new(InMemoryEventBus::with_capacity(256)),
            store.clone(),
            Arc::new(MonotonicClock::anchored_at(0)),
        ));
        let auction_id = seed.id.clone();
        if let Err(e) = registry.load_seed(seed) {
            panic!("fixture seed failed to load: {e}");
        }
        Self {
            registry,
            store,
            auction_id,
        }
    }

    /// Submit as an admin connection would, authorization included.
    pub async fn admin(&self, command: AuctionCommand) -> Result<CommandReceipt, AuctionError> {
        let actor = Role::Admin.authorize(&command, None)?;
        self.registry.submit(&self.auction_id, actor, command).await
    }

    pub async fn team(
        &self,
        team: &str,
        command: AuctionCommand,
    ) -> Result<CommandReceipt, AuctionError> {
        let actor = Role::Team.authorize(&command, Some(&TeamId::from(team)))?;
        self.registry.submit(&self.auction_id, actor, command).await
    }

    pub async fn bid(&self, team: &str, amount: Amount) -> Result<CommandReceipt, AuctionError> {
        self.team(
            team,
            AuctionCommand::PlaceBid {
                amount,
                team_id: None,
            },
        )
        .await
    }

    /// Admin view: every team and trade.
    pub async fn snapshot(&self) -> AuctionSnapshot {
        match self.registry.snapshot(&self.auction_id, Role::Admin, None).await {
            Ok(snapshot) => snapshot,
            Err(e) => panic!("snapshot failed: {e}"),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        match self.registry.subscribe(&self.auction_id) {
            Ok(subscription) => subscription,
            Err(e) => panic!("subscribe failed: {e}"),
        }
    }

    pub async fn force_sell(&self, player: &str, team: &str, price: Amount) {
        let result = self
            .admin(AuctionCommand::ForceOutcome {
                player_id: player.into(),
                team_id: Some(team.into()),
                price: Some(price),
            })
            .await;
        if let Err(e) = result {
            panic!("force sell of {player} to {team} failed: {e}");
        }
    }

    pub async fn sweep(&self) -> usize {
        match self.registry.get(&self.auction_id) {
            Ok(handle) => handle.sweep().await.unwrap_or(0),
            Err(e) => panic!("auction missing: {e}"),
        }
    }
}

/// Seed whose team purses differ from the configured default.
pub fn seed_with_purses(purses: &[(&str, Amount)]) -> AuctionSeed {
    let mut seed = test_utils::seed();
    for team in &mut seed.teams {
        if let Some((_, purse)) = purses.iter().find(|(id, _)| team.id.as_str() == *id) {
            team.purse_value = Some(*purse);
        }
    }
    seed
}

pub fn team<'a>(snapshot: &'a AuctionSnapshot, id: &str) -> &'a TeamSummary {
    match snapshot.teams.iter().find(|t| t.id.as_str() == id) {
        Some(team) => team,
        None => panic!("team {id} missing from snapshot"),
    }
}

/// Id of the trade a proposal receipt announced.
pub fn proposed_trade(receipt: &CommandReceipt) -> TradeId {
    receipt
        .events
        .iter()
        .find_map(|e| match &e.payload {
            AuctionEvent::TradeProposed(trade) => Some(trade.id.clone()),
            _ => None,
        })
        .unwrap_or_else(|| panic!("receipt carries no trade proposal"))
}

/// Everything buffered on `subscription` right now.
pub fn drain(subscription: &mut Subscription) -> Vec<AuctionEventEnvelope> {
    let mut events = Vec::new();
    while let Ok(Some(envelope)) = subscription.try_recv() {
        events.push(envelope);
    }
    events
}

pub fn names(events: &[AuctionEventEnvelope]) -> Vec<&'static str> {
    events.iter().map(|e| e.payload.name()).collect()
}
