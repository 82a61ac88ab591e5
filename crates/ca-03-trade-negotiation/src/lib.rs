//! # Trade Negotiation Engine (ca-03)
//!
//! Bilateral player swaps during the post-auction trade window.
//!
//! ## Lifecycle
//!
//! | From | Step | Who | To |
//! |------|------|-----|----|
//! | - | `propose_trade` | initiator team | `pending_counterparty` |
//! | - | `admin_initiate_trade` | admin | `both_agreed` |
//! | `pending_counterparty` | `accept_trade` | counterparty | `both_agreed` |
//! | `pending_counterparty` | `reject_trade` | counterparty, admin | `rejected` |
//! | `both_agreed` | `reject_trade` | admin | `rejected` |
//! | `pending_counterparty` | `withdraw_trade` | initiator | `withdrawn` |
//! | open | `cancel_trade` | admin | `cancelled` |
//! | `both_agreed` | `approve_and_execute` | admin | `executed` |
//! | open | `expire_open_trades` | sweep | `expired` |
//!
//! A player offered in an open trade is locked: no other open trade may
//! include it. Teams are limited to `max_trades_per_team` executed trades.
//!
//! Trades reference players and teams by id. Ownership, prices, trade caps
//! and squad sizes are all re-validated at execution; a drift fails the
//! approval with `StaleTradeState` and leaves the ledger unchanged.

pub mod algorithms;
pub mod domain;

#[cfg(test)]
pub(crate) mod test_support;

pub use algorithms::{
    accept_trade, admin_initiate_trade, approve_and_execute, cancel_trade, expire_open_trades,
    propose_trade, reject_trade, trade_window_elapsed, withdraw_trade,
};
pub use domain::{compute_settlement, SettlementTransfer, TradeOutcome, TradeProposal};
