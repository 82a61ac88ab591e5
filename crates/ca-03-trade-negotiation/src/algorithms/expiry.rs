//! # Expiry Sweep
//!
//! Open trades do not survive the trade window. The runtime's background
//! sweep first closes an elapsed window (`trade_window -> completed`), then
//! expires every trade still `pending_counterparty` or `both_agreed`.
//! Agreed trades are never executed automatically.

use super::negotiation::party_event;
use crate::domain::TradeOutcome;
use ca_01_ledger::{AuctionLedger, AuditAction};
use serde_json::json;
use shared_bus::AuctionEvent;
use shared_types::{Actor, AuctionError, AuctionStatus, TimestampMs, TradeStatus};
use tracing::info;

/// Whether the trade window deadline has passed.
pub fn trade_window_elapsed(ledger: &AuctionLedger, now: TimestampMs) -> bool {
    ledger.status() == AuctionStatus::TradeWindow
        && ledger
            .auction()
            .trade_window_expires_at
            .is_some_and(|expires_at| now >= expires_at)
}

/// Expire every open trade once the auction has left the trade window.
///
/// A no-op while the window is still open.
pub fn expire_open_trades(
    ledger: &mut AuctionLedger,
    now: TimestampMs,
) -> Result<TradeOutcome, AuctionError> {
    let mut outcome = TradeOutcome::empty();
    if ledger.status() == AuctionStatus::TradeWindow {
        return Ok(outcome);
    }

    let mut expired = Vec::new();
    for trade in ledger.trades_mut() {
        if !trade.status.is_open() {
            continue;
        }
        let from = trade.status;
        trade.status = TradeStatus::Expired;
        trade.updated_at = now;
        expired.push((from, trade.clone()));
    }

    for (from, trade) in expired {
        ledger.record_audit(
            &Actor::System,
            now,
            AuditAction::TradeExpired,
            json!({ "trade_id": trade.id, "status": from }),
            json!({ "trade_id": trade.id, "status": trade.status }),
            None,
        );
        info!(auction_id = %ledger.id(), trade_id = %trade.id, %from, "Trade expired");
        outcome
            .events
            .push(party_event(&trade, AuctionEvent::TradeExpired(trade.clone())));
    }
    Ok(outcome)
}
