//! # Timer Tokens
//!
//! Every scheduled callback carries the token that was current when it was
//! scheduled. The machine bumps its version whenever the timer is replaced,
//! cancelled or paused, so a callback that fires after the state has moved
//! on compares unequal and is discarded.

use serde::{Deserialize, Serialize};
use shared_types::{BiddingPhase, TimestampMs};

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Reveal delay elapsed: open bidding.
    OpenBidding,
    /// Countdown of the current bidding phase elapsed.
    Countdown,
    /// Move a resolved lot back to `waiting`.
    AutoAdvance,
}

impl TimerKind {
    /// Whether a timer of this kind can be armed in `phase`.
    pub fn runs_in(self, phase: BiddingPhase) -> bool {
        match self {
            Self::OpenBidding => phase == BiddingPhase::Revealed,
            Self::Countdown => matches!(
                phase,
                BiddingPhase::Open | BiddingPhase::GoingOnce | BiddingPhase::GoingTwice
            ),
            Self::AutoAdvance => matches!(phase, BiddingPhase::Sold | BiddingPhase::Unsold),
        }
    }
}

/// Identity of one scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerToken {
    pub version: u64,
    pub kind: TimerKind,
    /// Phase the timer was armed in.
    pub phase: BiddingPhase,
}

/// A timer the machine wants armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTimer {
    pub token: TimerToken,
    pub fires_at: TimestampMs,
}

impl ScheduledTimer {
    /// Milliseconds left at `now`, zero once due.
    pub fn remaining_ms(&self, now: TimestampMs) -> u64 {
        self.fires_at.saturating_sub(now)
    }
}

/// Instruction to whoever owns the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerDirective {
    /// Leave the outstanding timer (if any) alone.
    #[default]
    Keep,
    /// Replace the outstanding timer with this one.
    Schedule(ScheduledTimer),
    /// Drop the outstanding timer.
    Cancel,
}

impl TimerDirective {
    pub fn scheduled(&self) -> Option<&ScheduledTimer> {
        match self {
            Self::Schedule(timer) => Some(timer),
            _ => None,
        }
    }
}

pub(crate) fn secs_to_ms(secs: u64) -> u64 {
    secs.saturating_mul(1_000)
}
