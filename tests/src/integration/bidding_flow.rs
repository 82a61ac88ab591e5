//! # Live Bidding Flows
//!
//! Reveal, open, bid and countdown through the runtime with tokio's paused
//! clock driving the timers.

#[cfg(test)]
mod tests {
    use crate::harness::{drain, names, team, Harness};
    use shared_bus::AuctionEvent;
    use shared_types::{AuctionCommand, BiddingPhase, ErrorKind, PlayerStatus};
    use std::time::Duration;

    async fn open_next(harness: &Harness) {
        harness
            .admin(AuctionCommand::SelectNextPlayer { player_id: None })
            .await
            .unwrap();
        harness.admin(AuctionCommand::OpenBidding).await.unwrap();
    }

    // =========================================================================
    // SCENARIO: 100 -> 150 -> 200, countdown expires, sold at 200
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_countdown_sells_at_final_bid() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        open_next(&harness).await;

        harness.bid("a", 100).await.unwrap();
        harness.bid("b", 150).await.unwrap();
        harness.bid("c", 200).await.unwrap();

        let mut events = harness.subscribe();
        tokio::time::sleep(Duration::from_secs(30)).await;
        let events = drain(&mut events);

        let phases: Vec<BiddingPhase> = events
            .iter()
            .filter_map(|e| match &e.payload {
                AuctionEvent::TimerPhaseChanged { phase, .. } => Some(*phase),
                _ => None,
            })
            .collect();
        assert!(phases.contains(&BiddingPhase::GoingOnce));
        assert!(phases.contains(&BiddingPhase::GoingTwice));
        assert!(names(&events).contains(&"player_sold"));

        let snapshot = harness.snapshot().await;
        let buyer = team(&snapshot, "c");
        assert_eq!(buyer.purse_remaining, 800);
        assert_eq!(buyer.squad_size, 1);
        for other in ["a", "b"] {
            let other = team(&snapshot, other);
            assert_eq!(other.purse_remaining, 1_000);
            assert_eq!(other.squad_size, 0);
        }
        let p1 = snapshot
            .pool
            .players
            .iter()
            .find(|p| p.id.as_str() == "p1")
            .unwrap();
        assert_eq!(p1.status, PlayerStatus::Sold);
        assert_eq!(p1.purchase_price, Some(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bid_reopens_floor_during_countdown() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        open_next(&harness).await;
        harness.bid("a", 100).await.unwrap();

        // Bid reset timer (5s) elapses; now going once.
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(harness.snapshot().await.bidding.phase, BiddingPhase::GoingOnce);

        harness.bid("b", 150).await.unwrap();
        assert_eq!(harness.snapshot().await.bidding.phase, BiddingPhase::Open);

        tokio::time::sleep(Duration::from_secs(30)).await;
        let snapshot = harness.snapshot().await;
        assert_eq!(team(&snapshot, "b").purse_remaining, 850);
        assert_eq!(team(&snapshot, "a").purse_remaining, 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_highest_bidder_cannot_raise_itself() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        open_next(&harness).await;
        harness.bid("a", 100).await.unwrap();

        for amount in [150, 175, 1_000] {
            let err = harness.bid("a", amount).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::AlreadyHighestBidder);
        }
        let err = harness.bid("b", 175).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidBidAmount);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_bids_leaves_player_unsold() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        open_next(&harness).await;

        let mut events = harness.subscribe();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(names(&drain(&mut events)).contains(&"player_unsold"));

        let snapshot = harness.snapshot().await;
        let p1 = snapshot
            .pool
            .players
            .iter()
            .find(|p| p.id.as_str() == "p1")
            .unwrap();
        assert_eq!(p1.status, PlayerStatus::Unsold);
        assert!(snapshot.teams.iter().all(|t| t.purse_remaining == 1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bid_rejected_while_paused() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        open_next(&harness).await;
        harness.bid("a", 100).await.unwrap();
        harness.admin(AuctionCommand::PauseAuction).await.unwrap();

        let err = harness.bid("b", 150).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BiddingNotOpen);

        // Paused for a minute; the countdown resumes where it stopped.
        tokio::time::sleep(Duration::from_secs(60)).await;
        harness.admin(AuctionCommand::ResumeAuction).await.unwrap();
        harness.bid("b", 150).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsold_players_return_for_next_round() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        for player in ["p1", "p2", "p3", "p4"] {
            harness
                .admin(AuctionCommand::ForceOutcome {
                    player_id: player.into(),
                    team_id: None,
                    price: None,
                })
                .await
                .unwrap();
        }

        let receipt = harness
            .admin(AuctionCommand::SelectNextPlayer { player_id: None })
            .await
            .unwrap();
        assert!(receipt
            .events
            .iter()
            .any(|e| matches!(e.payload, AuctionEvent::RoundStarted { round: 2, .. })));
        assert_eq!(harness.snapshot().await.current_round, 2);
    }
}
