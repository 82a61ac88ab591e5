//! Domain layer: bidding state, timer tokens, bid validation and the undo
//! journal.

pub mod journal;
pub mod state;
pub mod timer;
pub mod validation;

pub use journal::{JournalEntry, UndoJournal};
pub use state::{BiddingState, PausedTimer};
pub use timer::{ScheduledTimer, TimerDirective, TimerKind, TimerToken};
pub use validation::validate_bid;
