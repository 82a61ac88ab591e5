//! Fixtures for the trade workflow tests.

use crate::domain::TradeProposal;
use ca_01_ledger::test_utils::{ledger, player_id, team_id};
use ca_01_ledger::AuctionLedger;
use shared_types::{Actor, AuctionStatus};

/// Test auction in its trade window. `a` owns p1 (100), `b` owns p2 (250)
/// and p4 (200), `c` owns p3 (150).
pub fn trade_window_ledger() -> AuctionLedger {
    let mut ledger = ledger();
    for (player, team, price) in [
        ("p1", "a", 100),
        ("p2", "b", 250),
        ("p3", "c", 150),
        ("p4", "b", 200),
    ] {
        ledger
            .record_sale(&player_id(player), &team_id(team), price)
            .unwrap();
    }
    ledger
        .transition_status(AuctionStatus::Live, &Actor::Admin, 1)
        .unwrap();
    ledger
        .transition_status(AuctionStatus::TradeWindow, &Actor::Admin, 2)
        .unwrap();
    ledger.take_pending_audit();
    ledger
}

/// One-for-one swap proposal.
pub fn proposal(initiator: &str, offered: &str, counterparty: &str, requested: &str) -> TradeProposal {
    TradeProposal {
        initiator: team_id(initiator),
        counterparty: team_id(counterparty),
        offered: vec![player_id(offered)],
        requested: vec![player_id(requested)],
        message: None,
    }
}
