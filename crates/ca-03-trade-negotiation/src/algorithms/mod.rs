//! Trade workflow: negotiation, execution and the expiry sweep.

pub mod execution;
pub mod expiry;
pub mod negotiation;

pub use execution::approve_and_execute;
pub use expiry::{expire_open_trades, trade_window_elapsed};
pub use negotiation::{
    accept_trade, admin_initiate_trade, cancel_trade, propose_trade, reject_trade, withdraw_trade,
};
