//! # Bidding State
//!
//! The per-auction singleton the live channel mirrors to clients: phase,
//! player on the block, standing bid, bid history and the active timer.

use crate::domain::timer::{secs_to_ms, ScheduledTimer, TimerKind, TimerToken};
use serde::{Deserialize, Serialize};
use shared_types::{Amount, Bid, BiddingPhase, BiddingView, PlayerId, TeamId, TimestampMs};

/// Timer suspended by a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PausedTimer {
    pub kind: TimerKind,
    pub remaining_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiddingState {
    pub phase: BiddingPhase,
    pub player_id: Option<PlayerId>,
    pub current_bid: Option<Amount>,
    pub highest_bidder: Option<TeamId>,
    pub bids: Vec<Bid>,
    pub timer: Option<ScheduledTimer>,
    pub paused: Option<PausedTimer>,
    /// Bumped every time the timer is armed, cancelled or paused.
    timer_version: u64,
}

impl BiddingState {
    /// Put `player_id` on the block with an empty history.
    pub fn reveal(&mut self, player_id: PlayerId) {
        self.phase = BiddingPhase::Revealed;
        self.player_id = Some(player_id);
        self.current_bid = None;
        self.highest_bidder = None;
        self.bids.clear();
        self.paused = None;
    }

    /// Clear the block and return to `waiting`.
    pub fn reset(&mut self) {
        self.phase = BiddingPhase::Waiting;
        self.player_id = None;
        self.current_bid = None;
        self.highest_bidder = None;
        self.bids.clear();
        self.timer = None;
        self.paused = None;
        self.timer_version += 1;
    }

    pub fn accept_bid(&mut self, bid: Bid) {
        self.current_bid = Some(bid.amount);
        self.highest_bidder = Some(bid.team_id.clone());
        self.bids.push(bid);
        self.phase = BiddingPhase::Open;
    }

    /// Arm a new timer, invalidating any previous token.
    pub fn arm(&mut self, kind: TimerKind, now: TimestampMs, secs: u64) -> ScheduledTimer {
        self.arm_ms(kind, now, secs_to_ms(secs))
    }

    pub fn arm_ms(&mut self, kind: TimerKind, now: TimestampMs, delay_ms: u64) -> ScheduledTimer {
        self.timer_version += 1;
        self.paused = None;
        let timer = ScheduledTimer {
            token: TimerToken {
                version: self.timer_version,
                kind,
                phase: self.phase,
            },
            fires_at: now.saturating_add(delay_ms),
        };
        self.timer = Some(timer);
        timer
    }

    /// Drop the active timer and any suspended one. Returns whether a
    /// timer was armed.
    pub fn disarm(&mut self) -> bool {
        self.timer_version += 1;
        self.paused = None;
        self.timer.take().is_some()
    }

    /// Hold a timer of `kind` suspended without arming it, for a phase
    /// entered while the auction is paused.
    pub fn suspend(&mut self, kind: TimerKind, delay_ms: u64) {
        self.timer_version += 1;
        self.timer = None;
        self.paused = Some(PausedTimer {
            kind,
            remaining_ms: delay_ms,
        });
    }

    /// Whether `token` is the one currently armed.
    pub fn is_current(&self, token: &TimerToken) -> bool {
        self.paused.is_none()
            && token.phase == self.phase
            && self.timer.as_ref().map(|t| &t.token) == Some(token)
    }

    /// Suspend the active timer, keeping what is left of it.
    pub fn pause(&mut self, now: TimestampMs) -> bool {
        let Some(timer) = self.timer else {
            return false;
        };
        self.suspend(timer.token.kind, timer.remaining_ms(now));
        true
    }

    /// Re-arm a suspended timer with its remaining duration. A suspended
    /// timer that no longer fits the phase is dropped.
    pub fn resume(&mut self, now: TimestampMs) -> Option<ScheduledTimer> {
        let paused = self.paused.take()?;
        if !paused.kind.runs_in(self.phase) {
            self.timer_version += 1;
            return None;
        }
        Some(self.arm_ms(paused.kind, now, paused.remaining_ms))
    }

    pub fn view(&self) -> BiddingView {
        BiddingView {
            phase: self.phase,
            player_id: self.player_id.clone(),
            current_bid: self.current_bid,
            highest_bidder: self.highest_bidder.clone(),
            bids: self.bids.clone(),
            timer_expires_at: self.timer.map(|t| t.fires_at),
            paused_remaining_ms: self.paused.map(|p| p.remaining_ms),
        }
    }
}
