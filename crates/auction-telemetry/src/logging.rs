//! Structured logging helpers.
//!
//! Every auction log line carries the same field names so log queries can
//! join across components:
//! - `component`: emitting component (bidding, trade, gateway, runtime)
//! - `auction_id`, `team_id`, `player_id`, `trade_id`: entity identifiers
//! - `phase`, `amount`: bidding context

/// Log an auction-scoped event with standard fields.
///
/// ```rust,ignore
/// log_auction_event!(info, "bidding", "Player sold", auction_id, player_id = %id, amount = 200);
/// ```
#[macro_export]
macro_rules! log_auction_event {
    ($level:ident, $component:expr, $msg:expr, $auction_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            auction_id = %$auction_id,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a trade-scoped event with standard fields.
#[macro_export]
macro_rules! log_trade_event {
    ($level:ident, $msg:expr, $auction_id:expr, $trade_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = "trade",
            auction_id = %$auction_id,
            trade_id = %$trade_id,
            $($($field)*,)?
            $msg
        )
    };
}
