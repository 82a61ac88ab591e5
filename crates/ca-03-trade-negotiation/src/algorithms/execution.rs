//! # Execution
//!
//! Admin approval of an agreed trade. Everything checked at proposal time is
//! checked again against the live rosters, then the swap and settlement are
//! applied as one step: either every effect lands or none does.
//!
//! | Effect | Ledger call |
//! |--------|-------------|
//! | Players change rosters at their purchase price | `move_player` |
//! | Payer's purse debited, payee's credited | settlement transfer |
//! | Purse identity restored | `rebalance_trade_adjustment` |
//!
//! When settlement is enabled and the payer cannot cover it, the transfer is
//! capped at the payer's remaining purse and the shortfall is returned as an
//! `InsufficientSettlementPurse` warning. Execution still proceeds.

use super::negotiation::unauthorized;
use crate::domain::{
    invariant_squads_fit, invariant_still_owned, invariant_trade_cap, invariant_trade_window,
    SettlementTransfer, TradeOutcome,
};
use ca_01_ledger::{AuctionLedger, AuditAction};
use serde_json::json;
use shared_bus::{AuctionEvent, OutboundEvent};
use shared_types::{
    Actor, AuctionError, PlayerId, TeamId, TimestampMs, Trade, TradeId, TradeSide, TradeStatus,
    Warning,
};
use tracing::{info, warn};

/// Approve a `both_agreed` trade and apply it.
pub fn approve_and_execute(
    ledger: &mut AuctionLedger,
    actor: &Actor,
    trade_id: &TradeId,
    note: Option<String>,
    now: TimestampMs,
) -> Result<TradeOutcome, AuctionError> {
    if !actor.is_admin() {
        return Err(unauthorized(actor, "approve_trade"));
    }
    invariant_trade_window(ledger)?;

    let trade = ledger.trade(trade_id)?.clone();
    if trade.status != TradeStatus::BothAgreed {
        return Err(AuctionError::trade_transition(
            trade.status,
            TradeStatus::Executed,
        ));
    }

    invariant_still_owned(ledger, &trade)?;
    for team_id in trade.parties() {
        invariant_trade_cap(ledger, team_id)?;
    }
    invariant_squads_fit(ledger, &trade)?;

    let (payer, payee) = trade.payer_and_payee();
    let (payer, payee) = (payer.clone(), payee.clone());
    let transfer = SettlementTransfer::plan(
        trade.settlement_amount,
        ledger.team(&payer)?.purse_remaining,
        ledger.config().purse_settlement_enabled,
    );
    let mut warnings = Vec::new();
    if transfer.shortfall() > 0 {
        warn!(
            auction_id = %ledger.id(),
            trade_id = %trade.id,
            payer = %payer,
            owed = transfer.owed,
            transferred = transfer.transferred,
            shortfall = transfer.shortfall(),
            "Settlement capped at payer's purse"
        );
        warnings.push(Warning::insufficient_settlement_purse(
            &payer,
            transfer.owed,
            transfer.transferred,
        ));
    }

    let player_ids: Vec<PlayerId> = trade
        .initiator
        .players
        .iter()
        .chain(&trade.counterparty.players)
        .map(|p| p.player_id.clone())
        .collect();
    let team_ids: Vec<TeamId> = trade.parties().into_iter().cloned().collect();
    let before = ledger.capture(&player_ids, &team_ids);

    if let Err(err) = apply_swap(ledger, &trade, &payer, &payee, transfer) {
        ledger.restore(&before)?;
        return Err(err);
    }
    let after = ledger.capture(&player_ids, &team_ids);

    let executed = {
        let trade = ledger.trade_mut(trade_id)?;
        trade.status = TradeStatus::Executed;
        trade.executed_at = Some(now);
        trade.updated_at = now;
        if note.is_some() {
            trade.admin_note = note;
        }
        trade.clone()
    };

    ledger.record_audit(
        actor,
        now,
        AuditAction::TradeExecuted,
        json!({ "trade_id": executed.id, "status": trade.status, "state": before }),
        json!({
            "trade_id": executed.id,
            "status": executed.status,
            "state": after,
            "settlement": transfer,
            "payer": payer,
            "payee": payee,
            "shortfall": transfer.shortfall(),
        }),
        None,
    );

    info!(
        auction_id = %ledger.id(),
        trade_id = %executed.id,
        payer = %payer,
        settlement = transfer.transferred,
        "Trade executed"
    );

    let announcement = announcement(ledger, &executed, &payer, transfer);
    let parties: Vec<&TeamId> = executed.parties().to_vec();
    let mut events = vec![OutboundEvent::public(AuctionEvent::TradeExecuted {
        trade: executed.clone(),
        teams: ledger.team_summaries(&parties),
        announcement,
    })];
    for team_id in executed.parties() {
        let view = ledger.private_view(team_id)?;
        events.push(OutboundEvent::team(
            team_id.clone(),
            AuctionEvent::TeamPrivateUpdate(view),
        ));
    }

    let mut outcome = TradeOutcome::for_trade(executed.id, events);
    outcome.warnings = warnings;
    Ok(outcome)
}

fn apply_swap(
    ledger: &mut AuctionLedger,
    trade: &Trade,
    payer: &TeamId,
    payee: &TeamId,
    transfer: SettlementTransfer,
) -> Result<(), AuctionError> {
    for offered in &trade.initiator.players {
        ledger.move_player(&offered.player_id, &trade.counterparty.team_id)?;
    }
    for offered in &trade.counterparty.players {
        ledger.move_player(&offered.player_id, &trade.initiator.team_id)?;
    }

    let paying = ledger.team_mut(payer)?;
    let available = paying.purse_remaining;
    paying.purse_remaining = available.checked_sub(transfer.transferred).ok_or_else(|| {
        AuctionError::InsufficientPurse {
            team_id: payer.to_string(),
            required: transfer.transferred,
            max_permissible: available,
        }
    })?;
    let receiving = ledger.team_mut(payee)?;
    receiving.purse_remaining = receiving.purse_remaining.saturating_add(transfer.transferred);

    ledger.rebalance_trade_adjustment(payer)?;
    ledger.rebalance_trade_adjustment(payee)?;
    Ok(())
}

fn announcement(
    ledger: &AuctionLedger,
    trade: &Trade,
    payer: &TeamId,
    transfer: SettlementTransfer,
) -> String {
    let name = |team_id: &TeamId| {
        ledger
            .team(team_id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|_| team_id.to_string())
    };
    let players = |side: &TradeSide| {
        side.players
            .iter()
            .map(|p| {
                ledger
                    .player(&p.player_id)
                    .map(|pl| pl.name.clone())
                    .unwrap_or_else(|_| p.player_id.to_string())
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut text = format!(
        "{} trade {} to {} for {}",
        name(&trade.initiator.team_id),
        players(&trade.initiator),
        name(&trade.counterparty.team_id),
        players(&trade.counterparty),
    );
    if transfer.transferred > 0 {
        text.push_str(&format!(
            "; {} pays {} in settlement",
            name(payer),
            transfer.transferred
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::negotiation::{accept_trade, admin_initiate_trade, propose_trade};
    use crate::test_support::{proposal, trade_window_ledger};
    use ca_01_ledger::test_utils::{config, player_id, player_seed, team_id, team_seed};
    use ca_01_ledger::AuctionSeed;
    use shared_types::{Audience, AuctionId, AuctionStatus, ErrorKind, PlayerStatus};

    fn agreed(
        ledger: &mut AuctionLedger,
        initiator: &str,
        offered: &str,
        counter: &str,
        requested: &str,
    ) -> TradeId {
        let id = propose_trade(ledger, proposal(initiator, offered, counter, requested), 10)
            .unwrap()
            .trade_id
            .unwrap();
        accept_trade(ledger, &Actor::Team(team_id(counter)), &id, None, 11).unwrap();
        id
    }

    /// Team A ends the auction with 500 left after buying p1 for 100; team B
    /// with 300 left after buying p2 for 250.
    fn purse_scenario_ledger() -> AuctionLedger {
        let mut a = team_seed("a");
        a.purse_value = Some(600);
        let mut b = team_seed("b");
        b.purse_value = Some(550);
        let seed = AuctionSeed {
            id: AuctionId::from("purse-scenario"),
            name: "Purse Scenario".into(),
            config: config(),
            teams: vec![a, b],
            players: vec![player_seed("p1"), player_seed("p2")],
        };
        let mut ledger = AuctionLedger::from_seed(seed).unwrap();
        ledger.record_sale(&player_id("p1"), &team_id("a"), 100).unwrap();
        ledger.record_sale(&player_id("p2"), &team_id("b"), 250).unwrap();
        ledger
            .transition_status(AuctionStatus::Live, &Actor::Admin, 1)
            .unwrap();
        ledger
            .transition_status(AuctionStatus::TradeWindow, &Actor::Admin, 2)
            .unwrap();
        ledger
    }

    #[test]
    fn test_settlement_scenario_swaps_and_pays() {
        let mut ledger = purse_scenario_ledger();
        let id = agreed(&mut ledger, "a", "p1", "b", "p2");

        let outcome =
            approve_and_execute(&mut ledger, &Actor::Admin, &id, Some("ok".into()), 20).unwrap();
        assert!(outcome.warnings.is_empty());

        let a = ledger.team(&team_id("a")).unwrap();
        let b = ledger.team(&team_id("b")).unwrap();
        assert_eq!(a.purse_remaining, 350);
        assert_eq!(b.purse_remaining, 450);
        assert!(a.owns(&player_id("p2")));
        assert!(b.owns(&player_id("p1")));

        // Purchase prices travel with the player.
        assert_eq!(ledger.player(&player_id("p2")).unwrap().purchase_price, Some(250));
        assert_eq!(ledger.player(&player_id("p1")).unwrap().team_id, Some(team_id("b")));

        let trade = ledger.trade(&id).unwrap();
        assert_eq!(trade.status, TradeStatus::Executed);
        assert_eq!(trade.executed_at, Some(20));
        assert!(ledger.verify_invariants().is_ok());

        assert_eq!(outcome.events[0].audience, Audience::Public);
        match &outcome.events[0].event {
            AuctionEvent::TradeExecuted { teams, announcement, .. } => {
                assert_eq!(teams.len(), 2);
                assert!(announcement.contains("pays 150"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_only_admin_executes() {
        let mut ledger = trade_window_ledger();
        let id = agreed(&mut ledger, "a", "p1", "b", "p2");
        assert!(matches!(
            approve_and_execute(&mut ledger, &Actor::Team(team_id("a")), &id, None, 20),
            Err(AuctionError::UnauthorizedRole { .. })
        ));
    }

    #[test]
    fn test_pending_trade_cannot_execute() {
        let mut ledger = trade_window_ledger();
        let id = propose_trade(&mut ledger, proposal("a", "p1", "b", "p2"), 10)
            .unwrap()
            .trade_id
            .unwrap();
        assert!(matches!(
            approve_and_execute(&mut ledger, &Actor::Admin, &id, None, 20),
            Err(AuctionError::InvalidPhaseTransition { .. })
        ));
    }

    #[test]
    fn test_shortfall_caps_transfer_with_warning() {
        let mut ledger = purse_scenario_ledger();
        ledger.team_mut(&team_id("a")).unwrap().purse_remaining = 90;
        ledger.rebalance_trade_adjustment(&team_id("a")).unwrap();
        let id = agreed(&mut ledger, "a", "p1", "b", "p2");

        let outcome = approve_and_execute(&mut ledger, &Actor::Admin, &id, None, 20).unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, ErrorKind::InsufficientSettlementPurse);
        assert_eq!(ledger.team(&team_id("a")).unwrap().purse_remaining, 0);
        assert_eq!(ledger.team(&team_id("b")).unwrap().purse_remaining, 390);
        assert!(ledger.verify_invariants().is_ok());

        let audit = ledger.take_pending_audit();
        let record = audit.last().unwrap();
        assert_eq!(record.action, AuditAction::TradeExecuted);
        assert_eq!(record.after["shortfall"], 60);
    }

    #[test]
    fn test_disabled_settlement_swaps_only() {
        let mut ledger = purse_scenario_ledger();
        ledger.auction_mut().config.purse_settlement_enabled = false;
        let id = agreed(&mut ledger, "a", "p1", "b", "p2");
        approve_and_execute(&mut ledger, &Actor::Admin, &id, None, 20).unwrap();
        assert_eq!(ledger.team(&team_id("a")).unwrap().purse_remaining, 500);
        assert_eq!(ledger.team(&team_id("b")).unwrap().purse_remaining, 300);
        assert!(ledger.verify_invariants().is_ok());
    }

    #[test]
    fn test_drifted_ownership_is_stale() {
        let mut ledger = trade_window_ledger();
        let id = agreed(&mut ledger, "a", "p1", "b", "p2");
        ledger.release_player(&player_id("p1")).unwrap();
        ledger.player_mut(&player_id("p1")).unwrap().status = PlayerStatus::Unsold;
        let before = ledger.clone();

        let err = approve_and_execute(&mut ledger, &Actor::Admin, &id, None, 20).unwrap_err();
        assert!(matches!(err, AuctionError::StaleTradeState { .. }));
        assert_eq!(ledger.trade(&id).unwrap().status, TradeStatus::BothAgreed);
        assert_eq!(ledger.teams(), before.teams());
        assert_eq!(ledger.players(), before.players());
    }

    #[test]
    fn test_trade_cap_rechecked_for_counterparty() {
        let mut ledger = trade_window_ledger();
        // Cap is two executed trades per team.
        let first = agreed(&mut ledger, "a", "p1", "b", "p2");
        approve_and_execute(&mut ledger, &Actor::Admin, &first, None, 20).unwrap();

        // a now holds p2 and b holds p1. Queue a second a/b trade, then
        // spend b's last slot on a trade with c.
        let pending = agreed(&mut ledger, "a", "p2", "b", "p1");
        let second = admin_initiate_trade(&mut ledger, proposal("c", "p3", "b", "p4"), 30)
            .unwrap()
            .trade_id
            .unwrap();
        approve_and_execute(&mut ledger, &Actor::Admin, &second, None, 31).unwrap();

        let err = approve_and_execute(&mut ledger, &Actor::Admin, &pending, None, 40).unwrap_err();
        assert!(matches!(err, AuctionError::TradeLimitReached { .. }));
    }

    #[test]
    fn test_expired_trade_cannot_execute() {
        let mut ledger = trade_window_ledger();
        let id = agreed(&mut ledger, "a", "p1", "b", "p2");
        ledger
            .transition_status(AuctionStatus::Completed, &Actor::Admin, 15)
            .unwrap();
        crate::algorithms::expiry::expire_open_trades(&mut ledger, 16).unwrap();
        assert!(matches!(
            approve_and_execute(&mut ledger, &Actor::Admin, &id, None, 20),
            Err(AuctionError::AuctionNotInTradeWindow { .. })
        ));
        assert_eq!(ledger.trade(&id).unwrap().status, TradeStatus::Expired);
    }
}
