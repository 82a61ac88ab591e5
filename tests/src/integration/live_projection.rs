//! # Live Projection
//!
//! Events produced by the runtime, fanned out through gateway sessions for
//! each kind of viewer.

#[cfg(test)]
mod tests {
    use crate::harness::{drain, proposed_trade, Harness};
    use ca_04_live_gateway::{Credential, GatewayConfig, ServerMessage, Session};
    use shared_bus::{AuctionEvent, AuctionEventEnvelope};
    use shared_types::{AuctionCommand, Role, TeamId};

    struct Viewers {
        a: Session,
        b: Session,
        c: Session,
        spectator: Session,
        admin: Session,
    }

    impl Viewers {
        fn new(harness: &Harness) -> Self {
            let config = GatewayConfig::default();
            let session = |credential: Credential| {
                Session::new(harness.auction_id.clone(), credential, &config)
            };
            Self {
                a: session(Credential::team(TeamId::from("a"))),
                b: session(Credential::team(TeamId::from("b"))),
                c: session(Credential::team(TeamId::from("c"))),
                spectator: session(Credential::spectator()),
                admin: session(Credential::admin()),
            }
        }
    }

    /// Payloads of every envelope `session` lets through.
    fn seen(session: &mut Session, envelopes: &[AuctionEventEnvelope]) -> Vec<AuctionEvent> {
        envelopes
            .iter()
            .cloned()
            .filter_map(|envelope| match session.project(envelope) {
                Some(ServerMessage::Event(envelope)) => Some(envelope.payload),
                _ => None,
            })
            .collect()
    }

    fn private_for(events: &[AuctionEvent], team: &str) -> bool {
        events.iter().any(|event| {
            matches!(event, AuctionEvent::TeamPrivateUpdate(view) if view.team_id.as_str() == team)
        })
    }

    fn has_trade(events: &[AuctionEvent]) -> bool {
        events
            .iter()
            .any(|event| matches!(event, AuctionEvent::TradeProposed(_)))
    }

    #[tokio::test]
    async fn test_private_updates_reach_owner_and_admin_only() {
        let harness = Harness::start();
        let mut viewers = Viewers::new(&harness);
        let mut subscription = harness.subscribe();

        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        harness.force_sell("p1", "a", 300).await;
        let envelopes = drain(&mut subscription);

        let a = seen(&mut viewers.a, &envelopes);
        let b = seen(&mut viewers.b, &envelopes);
        let spectator = seen(&mut viewers.spectator, &envelopes);
        let admin = seen(&mut viewers.admin, &envelopes);

        assert!(private_for(&a, "a"));
        assert!(private_for(&admin, "a"));
        assert!(!private_for(&b, "a"));
        assert!(!private_for(&spectator, "a"));

        // The correction itself is public.
        for events in [&a, &b, &spectator] {
            assert!(events
                .iter()
                .any(|e| matches!(e, AuctionEvent::LedgerCorrected { .. })));
        }
        assert_eq!(admin.len(), envelopes.len());
    }

    #[tokio::test]
    async fn test_trade_negotiation_stays_between_parties() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        harness.force_sell("p1", "a", 100).await;
        harness.force_sell("p2", "b", 100).await;
        harness
            .admin(AuctionCommand::OpenTradeWindow { duration_secs: 600 })
            .await
            .unwrap();

        let mut viewers = Viewers::new(&harness);
        let mut subscription = harness.subscribe();
        let receipt = harness
            .team(
                "a",
                AuctionCommand::ProposeTrade {
                    counterparty: "b".into(),
                    offered: vec!["p1".into()],
                    requested: vec!["p2".into()],
                    message: Some("straight swap".into()),
                    team_id: None,
                },
            )
            .await
            .unwrap();
        proposed_trade(&receipt);
        let envelopes = drain(&mut subscription);

        assert!(has_trade(&seen(&mut viewers.a, &envelopes)));
        assert!(has_trade(&seen(&mut viewers.b, &envelopes)));
        assert!(has_trade(&seen(&mut viewers.admin, &envelopes)));
        assert!(!has_trade(&seen(&mut viewers.c, &envelopes)));
        assert!(!has_trade(&seen(&mut viewers.spectator, &envelopes)));
    }

    #[tokio::test]
    async fn test_snapshot_then_stream_skips_covered_events() {
        let harness = Harness::start();
        let mut subscription = harness.subscribe();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        harness.force_sell("p1", "a", 300).await;

        let mut spectator = Viewers::new(&harness).spectator;
        let snapshot = harness
            .registry
            .get(&harness.auction_id)
            .unwrap()
            .snapshot(Role::Spectator, None)
            .await
            .unwrap();
        assert!(snapshot.private.is_none());
        spectator.accept_snapshot(snapshot);

        // Everything buffered so far is already in the snapshot.
        let covered = drain(&mut subscription);
        assert!(seen(&mut spectator, &covered).is_empty());

        harness.force_sell("p2", "b", 200).await;
        let fresh = drain(&mut subscription);
        assert!(!seen(&mut spectator, &fresh).is_empty());
    }

    #[tokio::test]
    async fn test_team_snapshot_carries_private_view() {
        let harness = Harness::start();
        harness.admin(AuctionCommand::StartAuction).await.unwrap();
        harness.force_sell("p1", "a", 300).await;

        let snapshot = harness
            .registry
            .get(&harness.auction_id)
            .unwrap()
            .snapshot(Role::Team, Some(TeamId::from("a")))
            .await
            .unwrap();
        let private = snapshot.private.unwrap();
        assert_eq!(private.team_id.as_str(), "a");
        assert_eq!(private.purse_remaining, 700);
        assert_eq!(private.squad_size, 1);
    }
}
