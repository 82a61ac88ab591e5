//! # Trade Flows
//!
//! Proposal, acceptance, approval and settlement across two rosters, and
//! the checks that keep a player from moving twice.

#[cfg(test)]
mod tests {
    use crate::harness::{drain, names, proposed_trade, seed_with_purses, team, Harness};
    use shared_types::{
        AuctionCommand, ErrorKind, SettlementDirection, TradeId, TradeStatus,
    };

    async fn open_window(harness: &Harness) {
        harness
            .admin(AuctionCommand::OpenTradeWindow { duration_secs: 600 })
            .await
            .unwrap();
    }

    async fn propose(
        harness: &Harness,
        from: &str,
        to: &str,
        offered: &str,
        requested: &str,
    ) -> Result<TradeId, ErrorKind> {
        harness
            .team(
                from,
                AuctionCommand::ProposeTrade {
                    counterparty: to.into(),
                    offered: vec![offered.into()],
                    requested: vec![requested.into()],
                    message: None,
                    team_id: None,
                },
            )
            .await
            .map(|receipt| proposed_trade(&receipt))
            .map_err(|e| e.kind())
    }

    async fn agree_and_execute(harness: &Harness, counterparty: &str, trade_id: &TradeId) {
        harness
            .team(
                counterparty,
                AuctionCommand::AcceptTrade {
                    trade_id: trade_id.clone(),
                    message: None,
                },
            )
            .await
            .unwrap();
        harness
            .admin(AuctionCommand::ApproveAndExecuteTrade {
                trade_id: trade_id.clone(),
                note: None,
            })
            .await
            .unwrap();
    }

    fn owner(snapshot: &shared_types::AuctionSnapshot, player: &str) -> Option<String> {
        snapshot
            .pool
            .players
            .iter()
            .find(|p| p.id.as_str() == player)
            .and_then(|p| p.team_id.as_ref())
            .map(|t| t.to_string())
    }

    // =========================================================================
    // SCENARIO: A (500) offers a 100 player for B's (300) 250 player
    // =========================================================================

    #[tokio::test]
    async fn test_settlement_moves_purses_and_swaps_players() {
        let harness = Harness::with_seed(seed_with_purses(&[("a", 600), ("b", 550)]));
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        harness.force_sell("p1", "a", 100).await;
        harness.force_sell("p2", "b", 250).await;

        let before = harness.snapshot().await;
        assert_eq!(team(&before, "a").purse_remaining, 500);
        assert_eq!(team(&before, "b").purse_remaining, 300);

        open_window(&harness).await;
        let trade_id = propose(&harness, "a", "b", "p1", "p2").await.unwrap();

        let proposed = harness.snapshot().await;
        let trade = proposed.trades.iter().find(|t| t.id == trade_id).unwrap();
        assert_eq!(trade.settlement_amount, 150);
        assert_eq!(trade.settlement_direction, SettlementDirection::InitiatorPays);

        let mut events = harness.subscribe();
        agree_and_execute(&harness, "b", &trade_id).await;
        assert!(names(&drain(&mut events)).contains(&"trade_executed"));

        let after = harness.snapshot().await;
        assert_eq!(team(&after, "a").purse_remaining, 350);
        assert_eq!(team(&after, "b").purse_remaining, 450);
        assert_eq!(owner(&after, "p1").as_deref(), Some("b"));
        assert_eq!(owner(&after, "p2").as_deref(), Some("a"));
        assert_eq!(team(&after, "c").purse_remaining, 1_000);
    }

    // =========================================================================
    // SCENARIO: third proposal after two executed trades
    // =========================================================================

    #[tokio::test]
    async fn test_third_trade_hits_limit() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        harness.force_sell("p1", "a", 100).await;
        harness.force_sell("p2", "b", 100).await;
        harness.force_sell("p3", "c", 100).await;
        open_window(&harness).await;

        let first = propose(&harness, "a", "b", "p1", "p2").await.unwrap();
        agree_and_execute(&harness, "b", &first).await;
        let second = propose(&harness, "a", "c", "p2", "p3").await.unwrap();
        agree_and_execute(&harness, "c", &second).await;

        assert_eq!(team(&harness.snapshot().await, "a").executed_trades, 2);
        assert_eq!(
            propose(&harness, "a", "b", "p3", "p1").await.unwrap_err(),
            ErrorKind::TradeLimitReached
        );
    }

    #[tokio::test]
    async fn test_locked_player_cannot_be_offered_twice() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        harness.force_sell("p1", "a", 100).await;
        harness.force_sell("p2", "b", 100).await;
        harness.force_sell("p3", "c", 100).await;
        open_window(&harness).await;

        propose(&harness, "a", "b", "p1", "p2").await.unwrap();
        assert_eq!(
            propose(&harness, "a", "c", "p1", "p3").await.unwrap_err(),
            ErrorKind::PlayerLockedInOtherTrade
        );
    }

    #[tokio::test]
    async fn test_trade_requires_window() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        harness.force_sell("p1", "a", 100).await;
        harness.force_sell("p2", "b", 100).await;
        assert_eq!(
            propose(&harness, "a", "b", "p1", "p2").await.unwrap_err(),
            ErrorKind::AuctionNotInTradeWindow
        );
    }

    // =========================================================================
    // SCENARIO: window closes with a trade in both_agreed
    // =========================================================================

    #[tokio::test]
    async fn test_sweep_expires_agreed_trade() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        harness.force_sell("p1", "a", 100).await;
        harness.force_sell("p2", "b", 200).await;
        open_window(&harness).await;

        let trade_id = propose(&harness, "a", "b", "p1", "p2").await.unwrap();
        harness
            .team(
                "b",
                AuctionCommand::AcceptTrade {
                    trade_id: trade_id.clone(),
                    message: None,
                },
            )
            .await
            .unwrap();
        harness.admin(AuctionCommand::CompleteAuction).await.unwrap();

        let mut events = harness.subscribe();
        assert!(harness.sweep().await > 0);
        assert!(names(&drain(&mut events)).contains(&"trade_expired"));

        let snapshot = harness.snapshot().await;
        let trade = snapshot.trades.iter().find(|t| t.id == trade_id).unwrap();
        assert_eq!(trade.status, TradeStatus::Expired);

        assert!(harness
            .admin(AuctionCommand::ApproveAndExecuteTrade {
                trade_id,
                note: None,
            })
            .await
            .is_err());
        assert_eq!(owner(&harness.snapshot().await, "p1").as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_stale_trade_moves_nothing() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        harness.force_sell("p1", "a", 100).await;
        harness.force_sell("p2", "b", 300).await;
        open_window(&harness).await;

        let trade_id = propose(&harness, "a", "b", "p1", "p2").await.unwrap();
        harness
            .team(
                "b",
                AuctionCommand::AcceptTrade {
                    trade_id: trade_id.clone(),
                    message: None,
                },
            )
            .await
            .unwrap();

        // p1 changes hands before approval.
        harness.force_sell("p1", "c", 100).await;
        let before = harness.snapshot().await;

        let err = harness
            .admin(AuctionCommand::ApproveAndExecuteTrade {
                trade_id,
                note: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StaleTradeState);

        let after = harness.snapshot().await;
        assert_eq!(after.teams, before.teams);
        assert_eq!(owner(&after, "p2").as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_outsider_cannot_accept() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        harness.force_sell("p1", "a", 100).await;
        harness.force_sell("p2", "b", 100).await;
        open_window(&harness).await;

        let trade_id = propose(&harness, "a", "b", "p1", "p2").await.unwrap();
        let err = harness
            .team(
                "c",
                AuctionCommand::AcceptTrade {
                    trade_id,
                    message: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnauthorizedRole);
    }
}
