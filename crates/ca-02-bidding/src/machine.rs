//! # Bidding Machine
//!
//! Drives one player at a time through reveal, open bidding, the closing
//! countdown and resolution, and applies admin overrides and undo/redo.
//!
//! ```text
//! waiting ──select──▶ revealed ──open / reveal delay──▶ open ◀──bid──┐
//!                                                        │  ▲        │
//!                                           timer, bids  │  └─bid── going_once ◀─┐
//!                                                        ▼                │      │
//!                                                   going_once ──timer──▶ going_twice
//!                                                                         │
//! open ──timer, no bids──▶ unsold          going_twice ──timer──▶ sold ◀──┘
//! sold | unsold ──advance──▶ waiting
//! ```
//!
//! The machine is synchronous. Every operation takes the ledger it mutates
//! and the current time, and returns the events to broadcast plus a
//! [`TimerDirective`] for whoever owns the clock. Operations are applied to
//! a staged copy by the auction runtime, which commits or discards the copy
//! as a whole.

use crate::domain::journal::{JournalEntry, UndoJournal};
use crate::domain::state::BiddingState;
use crate::domain::timer::{secs_to_ms, ScheduledTimer, TimerDirective, TimerKind, TimerToken};
use crate::domain::validation::validate_bid;
use ca_01_ledger::{AuctionLedger, AuditAction, LedgerPatch};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_bus::{AuctionEvent, OutboundEvent};
use shared_types::{
    Actor, Amount, AuctionError, AuctionStatus, Bid, BiddingPhase, BiddingView, PlayerId,
    PlayerStatus, TeamId, TimestampMs,
};
use tracing::{debug, info, warn};

/// Result of one machine step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    pub events: Vec<OutboundEvent>,
    pub timer: TimerDirective,
}

impl Transition {
    fn new(events: Vec<OutboundEvent>, timer: TimerDirective) -> Self {
        Self { events, timer }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiddingMachine {
    state: BiddingState,
    journal: UndoJournal,
}

impl BiddingMachine {
    pub fn new(undo_depth: usize) -> Self {
        Self {
            state: BiddingState::default(),
            journal: UndoJournal::new(undo_depth),
        }
    }

    pub fn for_ledger(ledger: &AuctionLedger) -> Self {
        Self::new(ledger.config().undo_depth)
    }

    pub fn state(&self) -> &BiddingState {
        &self.state
    }

    pub fn journal(&self) -> &UndoJournal {
        &self.journal
    }

    pub fn view(&self) -> BiddingView {
        self.state.view()
    }

    pub fn phase(&self) -> BiddingPhase {
        self.state.phase
    }

    /// Timer that should currently be armed, if any.
    pub fn armed_timer(&self) -> Option<ScheduledTimer> {
        self.state.timer
    }

    fn current_player(&self) -> Result<PlayerId, AuctionError> {
        self.state
            .player_id
            .clone()
            .ok_or(AuctionError::BiddingNotOpen {
                phase: self.state.phase,
            })
    }

    fn ensure_live(ledger: &AuctionLedger, to: BiddingPhase) -> Result<(), AuctionError> {
        ledger.ensure_mutable()?;
        match ledger.status() {
            AuctionStatus::Live => Ok(()),
            status => Err(AuctionError::invalid_transition(status, to)),
        }
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// Put the next player on the block: `requested` if named, otherwise
    /// the first player in pool order. Starts a new round when the pool is
    /// empty and rounds remain.
    pub fn select_next_player(
        &mut self,
        ledger: &mut AuctionLedger,
        actor: &Actor,
        requested: Option<&PlayerId>,
        now: TimestampMs,
    ) -> Result<Transition, AuctionError> {
        Self::ensure_live(ledger, BiddingPhase::Revealed)?;
        if !self.state.phase.is_idle() {
            return Err(AuctionError::invalid_transition(
                self.state.phase,
                BiddingPhase::Revealed,
            ));
        }

        let mut events = Vec::new();
        let player_id = match requested {
            Some(player_id) => {
                let player = ledger.player(player_id)?;
                if !player.status.is_selectable() {
                    return Err(AuctionError::PlayerNotAvailable {
                        player_id: player_id.to_string(),
                        status: player.status,
                    });
                }
                player_id.clone()
            }
            None => match ledger.next_pool_player() {
                Some(player) => player.id.clone(),
                None => {
                    let previous = ledger.auction().current_round;
                    let returned_players = ledger.start_next_round()?;
                    let round = ledger.auction().current_round;
                    ledger.record_audit(
                        actor,
                        now,
                        AuditAction::RoundStarted,
                        Value::from(previous),
                        serde_json::json!({ "round": round, "returned_players": returned_players }),
                        None,
                    );
                    self.journal.clear();
                    info!(
                        auction_id = %ledger.id(),
                        round,
                        returned = returned_players.len(),
                        "Round started"
                    );
                    events.push(OutboundEvent::public(AuctionEvent::RoundStarted {
                        round,
                        returned_players,
                    }));
                    ledger
                        .next_pool_player()
                        .map(|player| player.id.clone())
                        .ok_or(AuctionError::PoolExhausted { round })?
                }
            },
        };

        let player = ledger.player_mut(&player_id)?;
        player.status = PlayerStatus::InBidding;
        player.times_offered = player.times_offered.saturating_add(1);
        let player = player.clone();

        self.state.disarm();
        self.state.reveal(player_id);

        let reveal_delay = ledger.config().reveal_delay_secs;
        let (opens_at, timer) = if reveal_delay > 0 {
            let timer = self.state.arm(TimerKind::OpenBidding, now, reveal_delay);
            (Some(timer.fires_at), TimerDirective::Schedule(timer))
        } else {
            (None, TimerDirective::Cancel)
        };

        debug!(auction_id = %ledger.id(), player_id = %player.id, ?opens_at, "Player revealed");
        events.push(OutboundEvent::public(AuctionEvent::PlayerRevealed {
            player,
            round: ledger.auction().current_round,
            opens_at,
        }));
        Ok(Transition::new(events, timer))
    }

    /// Admin trigger for `revealed -> open`.
    pub fn open_bidding(
        &mut self,
        ledger: &mut AuctionLedger,
        now: TimestampMs,
    ) -> Result<Transition, AuctionError> {
        Self::ensure_live(ledger, BiddingPhase::Open)?;
        if self.state.phase != BiddingPhase::Revealed {
            return Err(AuctionError::invalid_transition(
                self.state.phase,
                BiddingPhase::Open,
            ));
        }
        self.open(ledger, now)
    }

    fn open(&mut self, ledger: &AuctionLedger, now: TimestampMs) -> Result<Transition, AuctionError> {
        let player_id = self.current_player()?;
        let opening_bid = ledger.player(&player_id)?.base_price;

        self.state.phase = BiddingPhase::Open;
        let timer = self
            .state
            .arm(TimerKind::Countdown, now, ledger.config().timer_duration_secs);

        debug!(auction_id = %ledger.id(), %player_id, opening_bid, "Bidding opened");
        Ok(Transition::new(
            vec![OutboundEvent::public(AuctionEvent::BiddingOpened {
                player_id,
                opening_bid,
                timer_expires_at: timer.fires_at,
            })],
            TimerDirective::Schedule(timer),
        ))
    }

    // =========================================================================
    // BIDDING
    // =========================================================================

    pub fn place_bid(
        &mut self,
        ledger: &AuctionLedger,
        team_id: &TeamId,
        amount: Amount,
        now: TimestampMs,
    ) -> Result<Transition, AuctionError> {
        ledger.ensure_mutable()?;
        validate_bid(ledger, &self.state, team_id, amount)?;
        let player_id = self.current_player()?;
        let opening = ledger.player(&player_id)?.base_price;

        let bid = Bid {
            team_id: team_id.clone(),
            amount,
            placed_at: now,
        };
        self.state.accept_bid(bid.clone());
        let timer = self
            .state
            .arm(TimerKind::Countdown, now, ledger.config().bid_reset_timer_secs);

        debug!(
            auction_id = %ledger.id(),
            %player_id,
            %team_id,
            amount,
            "Bid accepted"
        );
        Ok(Transition::new(
            vec![OutboundEvent::public(AuctionEvent::BidPlaced {
                player_id,
                bid,
                phase: BiddingPhase::Open,
                next_valid_bid: ledger.config().next_valid_bid(Some(amount), opening),
                timer_expires_at: timer.fires_at,
            })],
            TimerDirective::Schedule(timer),
        ))
    }

    /// Handle a fired timer. Returns `None` when the token is stale: the
    /// state moved on after the timer was scheduled.
    pub fn on_timer(
        &mut self,
        ledger: &mut AuctionLedger,
        token: TimerToken,
        now: TimestampMs,
    ) -> Result<Option<Transition>, AuctionError> {
        if !self.state.is_current(&token) || !ledger.status().is_mutable() {
            debug!(
                auction_id = %ledger.id(),
                version = token.version,
                phase = %token.phase,
                "Discarding stale timer"
            );
            return Ok(None);
        }
        self.state.timer = None;

        let transition = match token.kind {
            TimerKind::OpenBidding => self.open(ledger, now)?,
            TimerKind::AutoAdvance => self.to_waiting(),
            TimerKind::Countdown => self.countdown_elapsed(ledger, now)?,
        };
        Ok(Some(transition))
    }

    fn countdown_elapsed(
        &mut self,
        ledger: &mut AuctionLedger,
        now: TimestampMs,
    ) -> Result<Transition, AuctionError> {
        let standing = self.state.highest_bidder.clone().zip(self.state.current_bid);
        let going_once = ledger.config().going_once_timer_secs;
        let going_twice = ledger.config().going_twice_timer_secs;
        match (self.state.phase, standing) {
            (BiddingPhase::Open, Some(_)) => {
                Ok(self.step_countdown(BiddingPhase::GoingOnce, going_once, now))
            }
            (BiddingPhase::GoingOnce, Some(_)) => {
                Ok(self.step_countdown(BiddingPhase::GoingTwice, going_twice, now))
            }
            (BiddingPhase::GoingTwice, Some((team_id, price))) => {
                self.resolve_sold(ledger, team_id, price, now)
            }
            (_, None) => self.resolve_unsold(ledger, &Actor::System, now),
            (phase, Some(_)) => Err(AuctionError::invalid_transition(phase, "countdown")),
        }
    }

    fn step_countdown(&mut self, next: BiddingPhase, secs: u64, now: TimestampMs) -> Transition {
        self.state.phase = next;
        let timer = self.state.arm(TimerKind::Countdown, now, secs);
        Transition::new(
            vec![OutboundEvent::public(AuctionEvent::TimerPhaseChanged {
                player_id: self.state.player_id.clone(),
                phase: next,
                timer_expires_at: Some(timer.fires_at),
            })],
            TimerDirective::Schedule(timer),
        )
    }

    fn resolve_sold(
        &mut self,
        ledger: &mut AuctionLedger,
        team_id: TeamId,
        price: Amount,
        now: TimestampMs,
    ) -> Result<Transition, AuctionError> {
        let player_id = self.current_player()?;
        let sale = self.journaled(
            ledger,
            &Actor::System,
            now,
            AuditAction::PlayerSold,
            &[player_id.clone()],
            &[team_id.clone()],
            |ledger| ledger.record_sale(&player_id, &team_id, price),
        );
        if let Err(error) = sale {
            // Purse or squad changed under the standing bid (admin override).
            warn!(
                auction_id = %ledger.id(),
                %player_id,
                %team_id,
                price,
                %error,
                "Standing bid can no longer be honoured, player goes unsold"
            );
            return self.resolve_unsold(ledger, &Actor::System, now);
        }

        self.state.phase = BiddingPhase::Sold;
        let team = ledger.team(&team_id)?;
        let sold = AuctionEvent::PlayerSold {
            player_id: player_id.clone(),
            team_id: team_id.clone(),
            price,
            purse_remaining: team.purse_remaining,
            squad_size: team.squad_size(),
        };
        info!(auction_id = %ledger.id(), %player_id, %team_id, price, "Player sold");

        let mut events = vec![OutboundEvent::public(sold)];
        events.extend(private_update(ledger, &team_id));
        Ok(Transition::new(events, self.arm_auto_advance(ledger, now)))
    }

    fn resolve_unsold(
        &mut self,
        ledger: &mut AuctionLedger,
        actor: &Actor,
        now: TimestampMs,
    ) -> Result<Transition, AuctionError> {
        let player_id = self.current_player()?;
        self.journaled(
            ledger,
            actor,
            now,
            AuditAction::PlayerUnsold,
            &[player_id.clone()],
            &[],
            |ledger| {
                ledger.player_mut(&player_id)?.status = PlayerStatus::Unsold;
                Ok(())
            },
        )?;
        self.state.phase = BiddingPhase::Unsold;
        let times_offered = ledger.player(&player_id)?.times_offered;
        info!(auction_id = %ledger.id(), %player_id, times_offered, "Player unsold");

        Ok(Transition::new(
            vec![OutboundEvent::public(AuctionEvent::PlayerUnsold {
                player_id,
                times_offered,
            })],
            self.arm_auto_advance(ledger, now),
        ))
    }

    /// Leaving a bidding phase drops whatever timer was armed or suspended.
    /// While the auction is paused the advance timer is held until resume.
    fn arm_auto_advance(&mut self, ledger: &AuctionLedger, now: TimestampMs) -> TimerDirective {
        match ledger.config().auto_advance_delay_secs {
            Some(secs) if ledger.status() == AuctionStatus::Paused => {
                self.state.suspend(TimerKind::AutoAdvance, secs_to_ms(secs));
                TimerDirective::Cancel
            }
            Some(secs) => TimerDirective::Schedule(self.state.arm(TimerKind::AutoAdvance, now, secs)),
            None => {
                self.state.disarm();
                TimerDirective::Cancel
            }
        }
    }

    // =========================================================================
    // FLOW CONTROL
    // =========================================================================

    /// Return a revealed, unbid player to the back of the pool.
    pub fn skip_player(&mut self, ledger: &mut AuctionLedger) -> Result<Transition, AuctionError> {
        ledger.ensure_mutable()?;
        let unbid = self.state.phase == BiddingPhase::Revealed
            || (self.state.phase == BiddingPhase::Open && self.state.bids.is_empty());
        if !unbid {
            return Err(AuctionError::invalid_transition(
                self.state.phase,
                BiddingPhase::Waiting,
            ));
        }
        let player_id = self.current_player()?;
        self.return_to_pool(ledger, &player_id)?;
        self.state.reset();

        debug!(auction_id = %ledger.id(), %player_id, "Player skipped");
        Ok(Transition::new(
            vec![OutboundEvent::public(AuctionEvent::PlayerSkipped { player_id })],
            TimerDirective::Cancel,
        ))
    }

    fn return_to_pool(
        &self,
        ledger: &mut AuctionLedger,
        player_id: &PlayerId,
    ) -> Result<(), AuctionError> {
        let player = ledger.player_mut(player_id)?;
        player.status = PlayerStatus::Pool;
        player.times_offered = player.times_offered.saturating_sub(1);
        ledger.send_to_back(player_id)
    }

    /// `sold | unsold -> waiting`.
    pub fn advance(&mut self, ledger: &AuctionLedger) -> Result<Transition, AuctionError> {
        ledger.ensure_mutable()?;
        if !matches!(self.state.phase, BiddingPhase::Sold | BiddingPhase::Unsold) {
            return Err(AuctionError::invalid_transition(
                self.state.phase,
                BiddingPhase::Waiting,
            ));
        }
        Ok(self.to_waiting())
    }

    fn to_waiting(&mut self) -> Transition {
        self.state.reset();
        Transition::new(
            vec![OutboundEvent::public(AuctionEvent::TimerPhaseChanged {
                player_id: None,
                phase: BiddingPhase::Waiting,
                timer_expires_at: None,
            })],
            TimerDirective::Cancel,
        )
    }

    /// Suspend the active timer for an auction pause.
    pub fn pause(&mut self, now: TimestampMs) -> TimerDirective {
        if self.state.pause(now) {
            TimerDirective::Cancel
        } else {
            TimerDirective::Keep
        }
    }

    /// Re-arm a paused timer with the time it had left.
    pub fn resume(&mut self, now: TimestampMs) -> TimerDirective {
        match self.state.resume(now) {
            Some(timer) => TimerDirective::Schedule(timer),
            None => TimerDirective::Keep,
        }
    }

    /// Bidding must be idle before the trade window opens. Clears the block
    /// and the undo history.
    pub fn prepare_trade_window(&mut self) -> Result<TimerDirective, AuctionError> {
        if !self.state.phase.is_idle() {
            return Err(AuctionError::invalid_transition(
                self.state.phase,
                AuctionStatus::TradeWindow,
            ));
        }
        self.state.reset();
        self.journal.clear();
        Ok(TimerDirective::Cancel)
    }

    /// Wind down for auction completion: a player still on the block goes
    /// back to the pool.
    pub fn close_out(&mut self, ledger: &mut AuctionLedger) -> Result<Transition, AuctionError> {
        let mut events = Vec::new();
        if !self.state.phase.is_idle() {
            let player_id = self.current_player()?;
            self.return_to_pool(ledger, &player_id)?;
            events.push(OutboundEvent::public(AuctionEvent::PlayerSkipped { player_id }));
        }
        self.state.reset();
        Ok(Transition::new(events, TimerDirective::Cancel))
    }

    // =========================================================================
    // ADMIN OVERRIDES
    // =========================================================================

    /// Force a player sold to `team_id` (reassigning an owned player and
    /// refunding the previous owner), or unsold when `team_id` is `None`.
    /// Forcing the player on the block ends its bidding.
    pub fn force_outcome(
        &mut self,
        ledger: &mut AuctionLedger,
        actor: &Actor,
        player_id: &PlayerId,
        team_id: Option<&TeamId>,
        price: Option<Amount>,
        now: TimestampMs,
    ) -> Result<Transition, AuctionError> {
        ledger.ensure_mutable()?;
        let player = ledger.player(player_id)?.clone();
        let on_block =
            self.state.player_id.as_ref() == Some(player_id) && !self.state.phase.is_idle();
        let forceable = match player.status {
            PlayerStatus::Pool | PlayerStatus::Sold | PlayerStatus::Unsold => true,
            PlayerStatus::InBidding => on_block,
            _ => false,
        };
        if !forceable {
            return Err(AuctionError::PlayerNotAvailable {
                player_id: player_id.to_string(),
                status: player.status,
            });
        }

        let mut teams: Vec<TeamId> = player.team_id.iter().cloned().collect();
        let (action, patch) = match team_id {
            Some(team_id) => {
                ledger.team(team_id)?;
                if !teams.contains(team_id) {
                    teams.push(team_id.clone());
                }
                let price = price
                    .or(if on_block { self.state.current_bid } else { None })
                    .unwrap_or(player.base_price);
                let patch = self.journaled(
                    ledger,
                    actor,
                    now,
                    AuditAction::ForceSold,
                    &[player_id.clone()],
                    &teams,
                    |ledger| {
                        ledger.release_player(player_id)?;
                        ledger.record_sale(player_id, team_id, price)
                    },
                )?;
                info!(auction_id = %ledger.id(), %player_id, %team_id, price, %actor, "Player force-sold");
                (AuditAction::ForceSold, patch)
            }
            None => {
                let patch = self.journaled(
                    ledger,
                    actor,
                    now,
                    AuditAction::ForceUnsold,
                    &[player_id.clone()],
                    &teams,
                    |ledger| {
                        ledger.release_player(player_id)?;
                        ledger.player_mut(player_id)?.status = PlayerStatus::Unsold;
                        Ok(())
                    },
                )?;
                info!(auction_id = %ledger.id(), %player_id, %actor, "Player force-unsold");
                (AuditAction::ForceUnsold, patch)
            }
        };

        let timer = if on_block {
            self.state.phase = match team_id {
                Some(_) => BiddingPhase::Sold,
                None => BiddingPhase::Unsold,
            };
            self.arm_auto_advance(ledger, now)
        } else {
            TimerDirective::Keep
        };
        Ok(Transition::new(self.corrections(ledger, action, &patch), timer))
    }

    pub fn disqualify_player(
        &mut self,
        ledger: &mut AuctionLedger,
        actor: &Actor,
        player_id: &PlayerId,
        now: TimestampMs,
    ) -> Result<Transition, AuctionError> {
        ledger.ensure_mutable()?;
        let player = ledger.player(player_id)?;
        let from = player.status;
        if matches!(from, PlayerStatus::Disqualified | PlayerStatus::InBidding) {
            return Err(AuctionError::PlayerNotAvailable {
                player_id: player_id.to_string(),
                status: from,
            });
        }
        let teams: Vec<TeamId> = player.team_id.iter().cloned().collect();

        let patch = self.journaled(
            ledger,
            actor,
            now,
            AuditAction::PlayerDisqualified,
            &[player_id.clone()],
            &teams,
            |ledger| {
                ledger.release_player(player_id)?;
                ledger.player_mut(player_id)?.status = PlayerStatus::Disqualified;
                Ok(())
            },
        )?;
        info!(auction_id = %ledger.id(), %player_id, %actor, "Player disqualified");

        let mut events = vec![OutboundEvent::public(AuctionEvent::PlayerStatusChanged {
            player_id: player_id.clone(),
            from,
            to: PlayerStatus::Disqualified,
        })];
        if !teams.is_empty() {
            events.extend(self.corrections(ledger, AuditAction::PlayerDisqualified, &patch));
        }
        Ok(Transition::new(events, TimerDirective::Keep))
    }

    pub fn reinstate_player(
        &mut self,
        ledger: &mut AuctionLedger,
        actor: &Actor,
        player_id: &PlayerId,
        now: TimestampMs,
    ) -> Result<Transition, AuctionError> {
        ledger.ensure_mutable()?;
        let status = ledger.player(player_id)?.status;
        if status != PlayerStatus::Disqualified {
            return Err(AuctionError::PlayerNotAvailable {
                player_id: player_id.to_string(),
                status,
            });
        }

        self.journaled(
            ledger,
            actor,
            now,
            AuditAction::PlayerReinstated,
            &[player_id.clone()],
            &[],
            |ledger| {
                ledger.player_mut(player_id)?.status = PlayerStatus::Pool;
                Ok(())
            },
        )?;
        info!(auction_id = %ledger.id(), %player_id, %actor, "Player reinstated");

        Ok(Transition::new(
            vec![OutboundEvent::public(AuctionEvent::PlayerStatusChanged {
                player_id: player_id.clone(),
                from: PlayerStatus::Disqualified,
                to: PlayerStatus::Pool,
            })],
            TimerDirective::Keep,
        ))
    }

    // =========================================================================
    // UNDO / REDO
    // =========================================================================

    /// Revert the newest outcome-changing action. Writes a compensating
    /// audit record; nothing already logged is touched.
    pub fn undo_last(
        &mut self,
        ledger: &mut AuctionLedger,
        actor: &Actor,
        now: TimestampMs,
    ) -> Result<Transition, AuctionError> {
        ledger.ensure_mutable()?;
        self.ensure_idle_for("undo")?;
        let entry = self
            .journal
            .peek_undo()
            .cloned()
            .ok_or(AuctionError::NothingToUndo)?;
        if !ledger.is_current(&entry.after) {
            return Err(AuctionError::UndoConflict {
                operation: "undo".into(),
                reason: format!("state touched by {} has changed since", entry.action),
            });
        }

        ledger.restore(&entry.before)?;
        let audit_id = ledger.record_audit(
            actor,
            now,
            AuditAction::Undo,
            patch_json(&entry.after),
            patch_json(&entry.before),
            Some(entry.audit_id),
        );
        self.journal.commit_undo(audit_id);
        self.state.reset();

        info!(auction_id = %ledger.id(), reverted = %entry.action, compensates = entry.audit_id, %actor, "Undo applied");
        Ok(Transition::new(
            self.corrections(ledger, AuditAction::Undo, &entry.before),
            TimerDirective::Cancel,
        ))
    }

    /// Re-apply the newest undone action.
    pub fn redo_last(
        &mut self,
        ledger: &mut AuctionLedger,
        actor: &Actor,
        now: TimestampMs,
    ) -> Result<Transition, AuctionError> {
        ledger.ensure_mutable()?;
        self.ensure_idle_for("redo")?;
        let entry = self
            .journal
            .peek_redo()
            .cloned()
            .ok_or(AuctionError::NothingToRedo)?;
        if !ledger.is_current(&entry.before) {
            return Err(AuctionError::UndoConflict {
                operation: "redo".into(),
                reason: format!("state restored by undoing {} has changed since", entry.action),
            });
        }

        ledger.restore(&entry.after)?;
        let audit_id = ledger.record_audit(
            actor,
            now,
            AuditAction::Redo,
            patch_json(&entry.before),
            patch_json(&entry.after),
            Some(entry.audit_id),
        );
        self.journal.commit_redo(audit_id);
        self.state.reset();

        info!(auction_id = %ledger.id(), reapplied = %entry.action, compensates = entry.audit_id, %actor, "Redo applied");
        Ok(Transition::new(
            self.corrections(ledger, AuditAction::Redo, &entry.after),
            TimerDirective::Cancel,
        ))
    }

    fn ensure_idle_for(&self, operation: &str) -> Result<(), AuctionError> {
        if self.state.phase.is_idle() {
            Ok(())
        } else {
            Err(AuctionError::UndoConflict {
                operation: operation.to_string(),
                reason: format!("bidding is {}", self.state.phase),
            })
        }
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    /// Apply `mutate` as one journaled, audited action over the given
    /// players and teams. On failure the touched entities are restored.
    /// A player on the block is captured as `pool`, so undoing its outcome
    /// returns it to the pool.
    #[allow(clippy::too_many_arguments)]
    fn journaled<F>(
        &mut self,
        ledger: &mut AuctionLedger,
        actor: &Actor,
        now: TimestampMs,
        action: AuditAction,
        player_ids: &[PlayerId],
        team_ids: &[TeamId],
        mutate: F,
    ) -> Result<LedgerPatch, AuctionError>
    where
        F: FnOnce(&mut AuctionLedger) -> Result<(), AuctionError>,
    {
        let raw = ledger.capture(player_ids, team_ids);
        if let Err(error) = mutate(ledger) {
            ledger.restore(&raw)?;
            return Err(error);
        }

        let mut before = raw;
        for player in &mut before.players {
            if player.status == PlayerStatus::InBidding {
                player.status = PlayerStatus::Pool;
            }
        }
        let after = ledger.capture(player_ids, team_ids);
        let audit_id = ledger.record_audit(
            actor,
            now,
            action,
            patch_json(&before),
            patch_json(&after),
            None,
        );
        self.journal.record(JournalEntry {
            action,
            audit_id,
            before,
            after: after.clone(),
        });
        Ok(after)
    }

    /// Public correction carrying the post-correction state of every
    /// touched entity, plus a private update per touched team.
    fn corrections(
        &self,
        ledger: &AuctionLedger,
        action: AuditAction,
        patch: &LedgerPatch,
    ) -> Vec<OutboundEvent> {
        let players = patch
            .player_ids()
            .iter()
            .filter_map(|id| ledger.player(id).ok().cloned())
            .collect();
        let team_ids = patch.team_ids();
        let team_refs: Vec<&TeamId> = team_ids.iter().collect();

        let mut events = vec![OutboundEvent::public(AuctionEvent::LedgerCorrected {
            action: action.as_str().to_string(),
            players,
            teams: ledger.team_summaries(&team_refs),
            bidding: self.view(),
        })];
        events.extend(team_ids.iter().filter_map(|id| private_update(ledger, id)));
        events
    }
}

fn patch_json(patch: &LedgerPatch) -> Value {
    serde_json::to_value(patch).unwrap_or(Value::Null)
}

/// Private purse/squad view for one team.
pub fn private_update(ledger: &AuctionLedger, team_id: &TeamId) -> Option<OutboundEvent> {
    ledger.private_view(team_id).ok().map(|view| {
        OutboundEvent::team(team_id.clone(), AuctionEvent::TeamPrivateUpdate(view))
    })
}
