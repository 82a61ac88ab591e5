//! # Durable Commit
//!
//! A failed commit leaves the auction exactly as it was and publishes
//! nothing; a JSON-backed registry picks up where it left off.

#[cfg(test)]
mod tests {
    use crate::harness::{drain, team, Harness};
    use auction_runtime::{AuctionRegistry, ManualClock};
    use ca_01_ledger::{test_utils, JsonFileLedgerStore, LedgerStore};
    use ca_04_live_gateway::AuctionDirectory;
    use shared_bus::InMemoryEventBus;
    use shared_types::{AuctionCommand, AuctionStatus, ErrorKind, PlayerStatus, Role};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_failed_commit_changes_nothing() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        let before = harness.snapshot().await;
        let audit_before = harness.store.audit_len();

        let mut events = harness.subscribe();
        harness.store.set_should_fail(true);
        let err = harness
            .admin(AuctionCommand::ForceOutcome {
                player_id: "p1".into(),
                team_id: Some("a".into()),
                price: Some(400),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);

        assert!(drain(&mut events).is_empty());
        assert_eq!(harness.snapshot().await, before);
        assert_eq!(harness.store.audit_len(), audit_before);

        // Store recovers; the same command now applies.
        harness.store.set_should_fail(false);
        harness.force_sell("p1", "a", 400).await;
        assert_eq!(team(&harness.snapshot().await, "a").purse_remaining, 600);
        assert!(!drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn test_failed_status_change_keeps_status() {
        let harness = Harness::start();
        harness.store.set_should_fail(true);
        let err = harness.admin(AuctionCommand::StartAuction).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(harness.snapshot().await.status, AuctionStatus::Setup);
    }

    #[tokio::test]
    async fn test_json_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let seed = test_utils::seed();
        let auction_id = seed.id.clone();

        {
            let store = Arc::new(JsonFileLedgerStore::open(dir.path()).unwrap());
            let registry = AuctionRegistry::new(
                Arc::new(InMemoryEventBus::with_capacity(64)),
                store,
                Arc::new(ManualClock::new(1_000)),
            );
            registry.load_seed(seed).unwrap();
            for command in [
                AuctionCommand::StartAuction,
                AuctionCommand::ForceOutcome {
                    player_id: "p2".into(),
                    team_id: Some("b".into()),
                    price: Some(250),
                },
            ] {
                let actor = Role::Admin.authorize(&command, None).unwrap();
                registry.submit(&auction_id, actor, command).await.unwrap();
            }
        }

        let store = Arc::new(JsonFileLedgerStore::open(dir.path()).unwrap());
        assert_eq!(store.auction_ids().unwrap(), vec![auction_id.clone()]);
        let registry = AuctionRegistry::new(
            Arc::new(InMemoryEventBus::with_capacity(64)),
            store,
            Arc::new(ManualClock::new(2_000)),
        );
        assert_eq!(registry.resume_stored().unwrap(), 1);

        let snapshot = registry
            .snapshot(&auction_id, Role::Admin, None)
            .await
            .unwrap();
        assert_eq!(snapshot.status, AuctionStatus::Live);
        assert_eq!(team(&snapshot, "b").purse_remaining, 750);
        let p2 = snapshot
            .pool
            .players
            .iter()
            .find(|p| p.id.as_str() == "p2")
            .unwrap();
        assert_eq!(p2.status, PlayerStatus::Sold);
        assert_eq!(p2.purchase_price, Some(250));
    }
}
