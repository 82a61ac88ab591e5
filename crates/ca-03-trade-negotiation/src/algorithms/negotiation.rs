//! # Negotiation
//!
//! Creating trades and moving them between parties before execution.
//!
//! ```text
//! pending_counterparty ──accept──▶ both_agreed ──approve──▶ executed
//!        │  │  │                      │  │
//!        │  │  └─withdraw (initiator) │  └─reject (admin) ─▶ rejected
//!        │  └──reject (counterparty, admin) ───────────────▶ rejected
//!        └──cancel (admin) ──────────────────────────────────▶ cancelled
//! ```
//!
//! Admin-initiated trades start in `both_agreed`.

use crate::domain::{
    compute_settlement, invariant_not_locked, invariant_trade_cap, invariant_trade_window,
    invariant_well_formed, owned_players, TradeOutcome, TradeProposal,
};
use ca_01_ledger::{AuctionLedger, AuditAction};
use serde_json::json;
use shared_bus::{AuctionEvent, OutboundEvent};
use shared_types::{
    Actor, AuctionError, RejectedBy, TimestampMs, Trade, TradeId, TradeOrigin, TradeSide,
    TradeStatus,
};
use tracing::info;

/// Event visible to both parties (admins see everything).
pub(crate) fn party_event(trade: &Trade, event: AuctionEvent) -> OutboundEvent {
    let parties = trade.parties().into_iter().cloned().collect();
    OutboundEvent::parties(parties, event)
}

pub(crate) fn unauthorized(actor: &Actor, command: &str) -> AuctionError {
    AuctionError::UnauthorizedRole {
        role: actor.to_string(),
        command: command.to_string(),
    }
}

fn build_trade(
    ledger: &AuctionLedger,
    proposal: TradeProposal,
    origin: TradeOrigin,
    now: TimestampMs,
) -> Result<Trade, AuctionError> {
    invariant_trade_window(ledger)?;
    invariant_well_formed(
        &proposal.initiator,
        &proposal.counterparty,
        &proposal.offered,
        &proposal.requested,
    )?;
    ledger.team(&proposal.initiator)?;
    ledger.team(&proposal.counterparty)?;
    invariant_trade_cap(ledger, &proposal.initiator)?;

    let offered = owned_players(ledger, &proposal.initiator, &proposal.offered)?;
    let requested = owned_players(ledger, &proposal.counterparty, &proposal.requested)?;
    invariant_not_locked(ledger, &proposal.offered, None)?;
    invariant_not_locked(ledger, &proposal.requested, None)?;

    let initiator = TradeSide::new(proposal.initiator, offered);
    let counterparty = TradeSide::new(proposal.counterparty, requested);
    let (settlement_amount, settlement_direction) =
        compute_settlement(initiator.total_value, counterparty.total_value);

    let (status, initiator_message, admin_note) = match origin {
        TradeOrigin::Team => (TradeStatus::PendingCounterparty, proposal.message, None),
        TradeOrigin::Admin => (TradeStatus::BothAgreed, None, proposal.message),
    };

    Ok(Trade {
        id: TradeId::generate(),
        auction_id: ledger.id().clone(),
        initiator,
        counterparty,
        settlement_amount,
        settlement_direction,
        status,
        origin,
        initiator_message,
        counterparty_message: None,
        admin_note,
        rejection_reason: None,
        rejected_by: None,
        cancellation_reason: None,
        created_at: now,
        updated_at: now,
        executed_at: None,
    })
}

/// A team proposes a swap to another team.
pub fn propose_trade(
    ledger: &mut AuctionLedger,
    proposal: TradeProposal,
    now: TimestampMs,
) -> Result<TradeOutcome, AuctionError> {
    let trade = build_trade(ledger, proposal, TradeOrigin::Team, now)?;
    info!(
        auction_id = %ledger.id(),
        trade_id = %trade.id,
        initiator = %trade.initiator.team_id,
        counterparty = %trade.counterparty.team_id,
        settlement = trade.settlement_amount,
        "Trade proposed"
    );
    let outcome = TradeOutcome::for_trade(
        trade.id,
        vec![party_event(&trade, AuctionEvent::TradeProposed(trade.clone()))],
    );
    ledger.push_trade(trade);
    Ok(outcome)
}

/// An admin builds a swap from both rosters. Both sides are taken as
/// consenting, so the trade waits only for approval.
pub fn admin_initiate_trade(
    ledger: &mut AuctionLedger,
    proposal: TradeProposal,
    now: TimestampMs,
) -> Result<TradeOutcome, AuctionError> {
    let trade = build_trade(ledger, proposal, TradeOrigin::Admin, now)?;
    info!(
        auction_id = %ledger.id(),
        trade_id = %trade.id,
        initiator = %trade.initiator.team_id,
        counterparty = %trade.counterparty.team_id,
        "Admin trade created"
    );
    let outcome = TradeOutcome::for_trade(
        trade.id,
        vec![party_event(&trade, AuctionEvent::TradeProposed(trade.clone()))],
    );
    ledger.push_trade(trade);
    Ok(outcome)
}

fn step(
    ledger: &mut AuctionLedger,
    trade_id: &TradeId,
    next: TradeStatus,
    now: TimestampMs,
    apply: impl FnOnce(&mut Trade),
) -> Result<Trade, AuctionError> {
    let trade = ledger.trade_mut(trade_id)?;
    if !trade.status.can_transition_to(next) {
        return Err(AuctionError::trade_transition(trade.status, next));
    }
    trade.status = next;
    trade.updated_at = now;
    apply(trade);
    Ok(trade.clone())
}

/// Counterparty agrees: `pending_counterparty -> both_agreed`.
pub fn accept_trade(
    ledger: &mut AuctionLedger,
    actor: &Actor,
    trade_id: &TradeId,
    message: Option<String>,
    now: TimestampMs,
) -> Result<TradeOutcome, AuctionError> {
    invariant_trade_window(ledger)?;
    let trade = ledger.trade(trade_id)?;
    if let Actor::Team(team_id) = actor {
        if team_id != &trade.counterparty.team_id {
            return Err(unauthorized(actor, "accept_trade"));
        }
    }
    if trade.status != TradeStatus::PendingCounterparty {
        return Err(AuctionError::trade_transition(
            trade.status,
            TradeStatus::BothAgreed,
        ));
    }

    let trade = step(ledger, trade_id, TradeStatus::BothAgreed, now, |trade| {
        trade.counterparty_message = message;
    })?;
    info!(auction_id = %ledger.id(), trade_id = %trade.id, %actor, "Trade accepted");
    Ok(TradeOutcome::for_trade(
        trade.id,
        vec![party_event(&trade, AuctionEvent::TradeAccepted(trade.clone()))],
    ))
}

/// Counterparty declines a pending trade, or an admin rejects any open one.
pub fn reject_trade(
    ledger: &mut AuctionLedger,
    actor: &Actor,
    trade_id: &TradeId,
    reason: Option<String>,
    now: TimestampMs,
) -> Result<TradeOutcome, AuctionError> {
    ledger.ensure_mutable()?;
    let trade = ledger.trade(trade_id)?;
    let rejected_by = match actor {
        Actor::Admin => RejectedBy::Admin,
        Actor::Team(team_id) if team_id == &trade.counterparty.team_id => {
            if trade.status != TradeStatus::PendingCounterparty {
                return Err(AuctionError::trade_transition(
                    trade.status,
                    TradeStatus::Rejected,
                ));
            }
            RejectedBy::Counterparty
        }
        _ => return Err(unauthorized(actor, "reject_trade")),
    };

    let trade = step(ledger, trade_id, TradeStatus::Rejected, now, |trade| {
        trade.rejection_reason = reason;
        trade.rejected_by = Some(rejected_by);
    })?;
    info!(auction_id = %ledger.id(), trade_id = %trade.id, ?rejected_by, "Trade rejected");
    Ok(TradeOutcome::for_trade(
        trade.id,
        vec![party_event(&trade, AuctionEvent::TradeRejected(trade.clone()))],
    ))
}

/// Initiator takes back a trade the counterparty has not answered.
pub fn withdraw_trade(
    ledger: &mut AuctionLedger,
    actor: &Actor,
    trade_id: &TradeId,
    now: TimestampMs,
) -> Result<TradeOutcome, AuctionError> {
    ledger.ensure_mutable()?;
    let trade = ledger.trade(trade_id)?;
    if actor.team() != Some(&trade.initiator.team_id) {
        return Err(unauthorized(actor, "withdraw_trade"));
    }
    if trade.status != TradeStatus::PendingCounterparty {
        return Err(AuctionError::trade_transition(
            trade.status,
            TradeStatus::Withdrawn,
        ));
    }

    let trade = step(ledger, trade_id, TradeStatus::Withdrawn, now, |_| {})?;
    info!(auction_id = %ledger.id(), trade_id = %trade.id, "Trade withdrawn");
    Ok(TradeOutcome::for_trade(
        trade.id,
        vec![party_event(&trade, AuctionEvent::TradeWithdrawn(trade.clone()))],
    ))
}

/// Admin closes an open trade without executing it.
pub fn cancel_trade(
    ledger: &mut AuctionLedger,
    actor: &Actor,
    trade_id: &TradeId,
    reason: Option<String>,
    now: TimestampMs,
) -> Result<TradeOutcome, AuctionError> {
    ledger.ensure_mutable()?;
    if !actor.is_admin() {
        return Err(unauthorized(actor, "cancel_trade"));
    }
    let from = ledger.trade(trade_id)?.status;
    let trade = step(ledger, trade_id, TradeStatus::Cancelled, now, |trade| {
        trade.cancellation_reason = reason;
    })?;
    ledger.record_audit(
        actor,
        now,
        AuditAction::TradeCancelled,
        json!({ "trade_id": trade.id, "status": from }),
        json!({ "trade_id": trade.id, "status": trade.status, "reason": trade.cancellation_reason }),
        None,
    );
    info!(auction_id = %ledger.id(), trade_id = %trade.id, "Trade cancelled");
    Ok(TradeOutcome::for_trade(
        trade.id,
        vec![party_event(&trade, AuctionEvent::TradeCancelled(trade.clone()))],
    ))
}
