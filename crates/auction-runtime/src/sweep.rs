//! Periodic trade sweep: closes elapsed trade windows and expires trades
//! left open outside one.

use crate::registry::AuctionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Run one sweep over every auction. Returns the number of events published.
pub async fn sweep_all(registry: &AuctionRegistry) -> usize {
    let mut published = 0;
    for handle in registry.handles() {
        match handle.sweep().await {
            Ok(count) => published += count,
            Err(err) => warn!(auction_id = %handle.auction_id(), error = %err, "Trade sweep failed"),
        }
    }
    published
}

/// Sweep every `period` until `shutdown` flips.
pub async fn run_sweeper(
    registry: Arc<AuctionRegistry>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    info!(period_secs = period.as_secs(), "Trade sweeper started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let published = sweep_all(&registry).await;
                if published > 0 {
                    debug!(published, "Trade sweep published events");
                }
            }
            _ = shutdown.changed() => {
                info!("Trade sweeper shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MonotonicClock;
    use ca_01_ledger::test_utils::{seed, team_id};
    use ca_01_ledger::InMemoryLedgerStore;
    use ca_04_live_gateway::AuctionDirectory;
    use shared_bus::InMemoryEventBus;
    use shared_types::{Actor, AuctionCommand, AuctionStatus, Role};

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_closes_trade_window() {
        let registry = Arc::new(AuctionRegistry::new(
            Arc::new(InMemoryEventBus::with_capacity(64)),
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(MonotonicClock::anchored_at(0)),
        ));
        let auction_id = seed().id;
        registry.load_seed(seed()).unwrap();
        for command in [
            AuctionCommand::StartAuction,
            AuctionCommand::OpenTradeWindow { duration_secs: 30 },
        ] {
            registry
                .submit(&auction_id, Actor::Admin, command)
                .await
                .unwrap();
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = tokio::spawn(run_sweeper(
            registry.clone(),
            Duration::from_secs(5),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_secs(20)).await;
        let snapshot = registry
            .snapshot(&auction_id, Role::Team, Some(team_id("a")))
            .await
            .unwrap();
        assert_eq!(snapshot.status, AuctionStatus::TradeWindow);

        tokio::time::sleep(Duration::from_secs(20)).await;
        let snapshot = registry
            .snapshot(&auction_id, Role::Spectator, None)
            .await
            .unwrap();
        assert_eq!(snapshot.status, AuctionStatus::Completed);
        assert_eq!(snapshot.trade_window_expires_at, None);

        shutdown_tx.send(true).unwrap();
        sweeper.await.unwrap();
    }
}
