//! Cross-crate auction flows.

pub mod bidding_flow;
pub mod live_projection;
pub mod overrides;
pub mod persistence;
pub mod trade_flow;
