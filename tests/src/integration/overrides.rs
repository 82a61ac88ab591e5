//! # Admin Overrides
//!
//! Forced outcomes, disqualification, undo/redo and the finalized lock.

#[cfg(test)]
mod tests {
    use crate::harness::{drain, names, team, Harness};
    use ca_01_ledger::{AuditAction, AuditQuery, LedgerStore};
    use shared_types::{AuctionCommand, AuctionStatus, BiddingPhase, ErrorKind, PlayerStatus};
    use std::time::Duration;

    fn status_of(snapshot: &shared_types::AuctionSnapshot, player: &str) -> PlayerStatus {
        snapshot
            .pool
            .players
            .iter()
            .find(|p| p.id.as_str() == player)
            .map(|p| p.status)
            .unwrap()
    }

    #[tokio::test]
    async fn test_undo_restores_forced_sale_and_redo_reapplies() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        harness.force_sell("p2", "a", 300).await;
        assert_eq!(team(&harness.snapshot().await, "a").purse_remaining, 700);

        harness.admin(AuctionCommand::UndoLast).await.unwrap();
        let undone = harness.snapshot().await;
        assert_eq!(team(&undone, "a").purse_remaining, 1_000);
        assert_eq!(team(&undone, "a").squad_size, 0);
        assert_eq!(status_of(&undone, "p2"), PlayerStatus::Pool);

        harness.admin(AuctionCommand::RedoLast).await.unwrap();
        let redone = harness.snapshot().await;
        assert_eq!(team(&redone, "a").purse_remaining, 700);
        assert_eq!(status_of(&redone, "p2"), PlayerStatus::Sold);

        // Undo and redo append compensating records; the sale stays logged.
        let audit = harness
            .store
            .audit_records(&AuditQuery::auction(harness.auction_id.clone()))
            .unwrap();
        let actions: Vec<AuditAction> = audit.iter().map(|r| r.action).collect();
        assert!(actions.contains(&AuditAction::ForceSold));
        assert!(actions.contains(&AuditAction::Undo));
        assert!(actions.contains(&AuditAction::Redo));
    }

    #[tokio::test(start_paused = true)]
    async fn test_override_while_paused_settles_once() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        harness
            .admin(AuctionCommand::SelectNextPlayer { player_id: None })
            .await
            .unwrap();
        harness.admin(AuctionCommand::OpenBidding).await.unwrap();
        harness.bid("a", 100).await.unwrap();
        harness.admin(AuctionCommand::PauseAuction).await.unwrap();

        harness
            .admin(AuctionCommand::ForceOutcome {
                player_id: "p1".into(),
                team_id: Some("a".into()),
                price: None,
            })
            .await
            .unwrap();
        let mut events = harness.subscribe();
        harness.admin(AuctionCommand::ResumeAuction).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        // The countdown suspended by the pause never comes back.
        let fired = names(&drain(&mut events));
        assert!(!fired.contains(&"player_sold"));
        assert!(!fired.contains(&"player_unsold"));

        let snapshot = harness.snapshot().await;
        assert_eq!(snapshot.bidding.phase, BiddingPhase::Sold);
        assert_eq!(team(&snapshot, "a").purse_remaining, 900);
        assert_eq!(team(&snapshot, "a").squad_size, 1);

        let audit = harness
            .store
            .audit_records(&AuditQuery::auction(harness.auction_id.clone()))
            .unwrap();
        let outcomes = audit
            .iter()
            .filter(|r| matches!(r.action, AuditAction::ForceSold | AuditAction::PlayerSold))
            .count();
        assert_eq!(outcomes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_while_paused_then_resume() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        harness
            .admin(AuctionCommand::SelectNextPlayer { player_id: None })
            .await
            .unwrap();
        harness.admin(AuctionCommand::OpenBidding).await.unwrap();
        harness.admin(AuctionCommand::PauseAuction).await.unwrap();
        harness.admin(AuctionCommand::SkipPlayer).await.unwrap();

        let mut events = harness.subscribe();
        harness.admin(AuctionCommand::ResumeAuction).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!names(&drain(&mut events)).contains(&"player_unsold"));

        let snapshot = harness.snapshot().await;
        assert_eq!(snapshot.bidding.phase, BiddingPhase::Waiting);
        let p1 = snapshot
            .pool
            .players
            .iter()
            .find(|p| p.id.as_str() == "p1")
            .unwrap();
        assert_eq!(p1.status, PlayerStatus::Pool);
    }

    #[tokio::test]
    async fn test_undo_with_nothing_recorded() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        let err = harness.admin(AuctionCommand::UndoLast).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NothingToUndo);
        let err = harness.admin(AuctionCommand::RedoLast).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NothingToRedo);
    }

    #[tokio::test]
    async fn test_team_cannot_override() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        let err = harness
            .team(
                "a",
                AuctionCommand::ForceOutcome {
                    player_id: "p1".into(),
                    team_id: Some("a".into()),
                    price: Some(100),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnauthorizedRole);
        assert_eq!(team(&harness.snapshot().await, "a").purse_remaining, 1_000);
    }

    #[tokio::test]
    async fn test_disqualify_then_reinstate() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        harness
            .admin(AuctionCommand::DisqualifyPlayer {
                player_id: "p3".into(),
            })
            .await
            .unwrap();
        assert_eq!(status_of(&harness.snapshot().await, "p3"), PlayerStatus::Disqualified);

        let err = harness
            .admin(AuctionCommand::SelectNextPlayer {
                player_id: Some("p3".into()),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PlayerNotAvailable);

        harness
            .admin(AuctionCommand::ReinstatePlayer {
                player_id: "p3".into(),
            })
            .await
            .unwrap();
        assert_eq!(status_of(&harness.snapshot().await, "p3"), PlayerStatus::Pool);
    }

    #[tokio::test]
    async fn test_finalized_auction_rejects_everything() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        harness.force_sell("p1", "a", 100).await;
        harness.admin(AuctionCommand::CompleteAuction).await.unwrap();
        harness.admin(AuctionCommand::FinalizeAuction).await.unwrap();
        assert_eq!(harness.snapshot().await.status, AuctionStatus::Finalized);

        for command in [
            AuctionCommand::ForceOutcome {
                player_id: "p2".into(),
                team_id: Some("b".into()),
                price: Some(100),
            },
            AuctionCommand::UndoLast,
            AuctionCommand::DisqualifyPlayer {
                player_id: "p3".into(),
            },
        ] {
            let err = harness.admin(command).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::AuctionFinalized);
        }
        assert_eq!(team(&harness.snapshot().await, "a").purse_remaining, 900);
    }
}
