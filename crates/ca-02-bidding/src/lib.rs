//! # Bidding State Machine (ca-02)
//!
//! Per-auction live bidding: one player at a time is revealed, opened at
//! base price, bid up in tier increments and closed by a three-stage
//! countdown, with the outcome committed to the [`ca_01_ledger`] ledger.
//!
//! ## Rules
//!
//! | Rule | Where |
//! |------|-------|
//! | Bid = current + increment of the band holding the current amount | `validate_bid` |
//! | Highest bidder cannot outbid itself | `validate_bid` |
//! | Stale timer callbacks are no-ops | `BiddingMachine::on_timer` |
//! | Pause keeps the remaining timer | `BiddingState::pause` |
//! | Undo/redo are compensating, audited actions | `BiddingMachine::undo_last` |
//!
//! The machine owns no clock and no tasks; callers pass `now` and act on
//! the returned [`TimerDirective`].

pub mod domain;
pub mod machine;

pub use domain::{
    validate_bid, BiddingState, JournalEntry, PausedTimer, ScheduledTimer, TimerDirective,
    TimerKind, TimerToken, UndoJournal,
};
pub use machine::{private_update, BiddingMachine, Transition};
