//! Command routing onto the engines.
//!
//! Every arm works on the staged ledger and machine handed in by
//! [`AuctionCore`](crate::auction_core::AuctionCore); nothing here touches committed
//! state, the store or the bus.

use ca_01_ledger::AuctionLedger;
use ca_02_bidding::{BiddingMachine, TimerDirective, Transition};
use ca_03_trade_negotiation::{
    accept_trade, admin_initiate_trade, approve_and_execute, cancel_trade, expire_open_trades,
    propose_trade, reject_trade, withdraw_trade, TradeOutcome, TradeProposal,
};
use shared_bus::{AuctionEvent, OutboundEvent};
use shared_types::{
    Actor, AuctionCommand, AuctionError, AuctionStatus, TeamId, TimestampMs, Warning,
};

/// Events, warnings and timer instruction produced by one staged step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Step {
    pub events: Vec<OutboundEvent>,
    pub warnings: Vec<Warning>,
    pub timer: TimerDirective,
}

impl Step {
    /// Fold in a later step. A later timer instruction replaces an earlier
    /// one unless it is `Keep`.
    pub fn absorb(&mut self, other: impl Into<Step>) {
        let other = other.into();
        self.events.extend(other.events);
        self.warnings.extend(other.warnings);
        if other.timer != TimerDirective::Keep {
            self.timer = other.timer;
        }
    }

    fn event(event: OutboundEvent) -> Self {
        Self {
            events: vec![event],
            ..Self::default()
        }
    }
}

impl From<Transition> for Step {
    fn from(transition: Transition) -> Self {
        Self {
            events: transition.events,
            warnings: Vec::new(),
            timer: transition.timer,
        }
    }
}

impl From<TradeOutcome> for Step {
    fn from(outcome: TradeOutcome) -> Self {
        Self {
            events: outcome.events,
            warnings: outcome.warnings,
            timer: TimerDirective::Keep,
        }
    }
}

impl From<TimerDirective> for Step {
    fn from(timer: TimerDirective) -> Self {
        Self {
            timer,
            ..Self::default()
        }
    }
}

/// Apply `command` as `actor` to the staged state.
pub fn dispatch(
    ledger: &mut AuctionLedger,
    machine: &mut BiddingMachine,
    actor: &Actor,
    command: AuctionCommand,
    now: TimestampMs,
) -> Result<Step, AuctionError> {
    let acting_team = command.acting_team(actor);

    match command {
        // =====================================================================
        // AUCTION STATUS
        // =====================================================================
        AuctionCommand::StartAuction => {
            let from = ledger.transition_status(AuctionStatus::Live, actor, now)?;
            Ok(Step::event(status_changed(ledger, machine, from)))
        }
        AuctionCommand::PauseAuction => {
            let from = ledger.transition_status(AuctionStatus::Paused, actor, now)?;
            let mut step = Step::from(machine.pause(now));
            step.events.push(status_changed(ledger, machine, from));
            Ok(step)
        }
        AuctionCommand::ResumeAuction => {
            let from = ledger.transition_status(AuctionStatus::Live, actor, now)?;
            let mut step = Step::from(machine.resume(now));
            step.events.push(status_changed(ledger, machine, from));
            Ok(step)
        }
        AuctionCommand::OpenTradeWindow { duration_secs } => {
            if duration_secs == 0 {
                return Err(AuctionError::InvalidConfig {
                    reason: "trade window duration must be positive".into(),
                });
            }
            ledger.ensure_mutable()?;
            let mut step = Step::from(machine.prepare_trade_window()?);
            let from = ledger.transition_status(AuctionStatus::TradeWindow, actor, now)?;
            ledger.auction_mut().trade_window_expires_at =
                Some(now.saturating_add(duration_secs.saturating_mul(1_000)));
            step.events.push(status_changed(ledger, machine, from));
            Ok(step)
        }
        AuctionCommand::CompleteAuction => complete(ledger, machine, actor, now),
        AuctionCommand::FinalizeAuction => {
            // Trades still open when the window closed are expired before
            // the ledger becomes immutable.
            let mut step = Step::from(expire_open_trades(ledger, now)?);
            let from = ledger.transition_status(AuctionStatus::Finalized, actor, now)?;
            step.events.push(status_changed(ledger, machine, from));
            Ok(step)
        }

        // =====================================================================
        // LIVE BIDDING
        // =====================================================================
        AuctionCommand::SelectNextPlayer { player_id } => machine
            .select_next_player(ledger, actor, player_id.as_ref(), now)
            .map(Step::from),
        AuctionCommand::OpenBidding => machine.open_bidding(ledger, now).map(Step::from),
        AuctionCommand::PlaceBid { amount, .. } => {
            let team_id = required_team(acting_team, actor)?;
            machine
                .place_bid(ledger, &team_id, amount, now)
                .map(Step::from)
        }
        AuctionCommand::SkipPlayer => machine.skip_player(ledger).map(Step::from),
        AuctionCommand::AdvanceToNext => machine.advance(ledger).map(Step::from),

        // =====================================================================
        // ADMIN OVERRIDES
        // =====================================================================
        AuctionCommand::ForceOutcome {
            player_id,
            team_id,
            price,
        } => machine
            .force_outcome(ledger, actor, &player_id, team_id.as_ref(), price, now)
            .map(Step::from),
        AuctionCommand::DisqualifyPlayer { player_id } => machine
            .disqualify_player(ledger, actor, &player_id, now)
            .map(Step::from),
        AuctionCommand::ReinstatePlayer { player_id } => machine
            .reinstate_player(ledger, actor, &player_id, now)
            .map(Step::from),
        AuctionCommand::UndoLast => machine.undo_last(ledger, actor, now).map(Step::from),
        AuctionCommand::RedoLast => machine.redo_last(ledger, actor, now).map(Step::from),

        // =====================================================================
        // TRADES
        // =====================================================================
        AuctionCommand::ProposeTrade {
            counterparty,
            offered,
            requested,
            message,
            ..
        } => {
            let initiator = required_team(acting_team, actor)?;
            let proposal = TradeProposal {
                initiator,
                counterparty,
                offered,
                requested,
                message,
            };
            propose_trade(ledger, proposal, now).map(Step::from)
        }
        AuctionCommand::AcceptTrade { trade_id, message } => {
            accept_trade(ledger, actor, &trade_id, message, now).map(Step::from)
        }
        AuctionCommand::RejectTrade { trade_id, reason } => {
            reject_trade(ledger, actor, &trade_id, reason, now).map(Step::from)
        }
        AuctionCommand::WithdrawTrade { trade_id } => {
            withdraw_trade(ledger, actor, &trade_id, now).map(Step::from)
        }
        AuctionCommand::ApproveAndExecuteTrade { trade_id, note } => {
            approve_and_execute(ledger, actor, &trade_id, note, now).map(Step::from)
        }
        AuctionCommand::AdminInitiateTrade {
            initiator,
            counterparty,
            offered,
            requested,
            note,
        } => {
            if !actor.is_admin() {
                return Err(AuctionError::UnauthorizedRole {
                    role: actor.to_string(),
                    command: "admin_initiate_trade".into(),
                });
            }
            let proposal = TradeProposal {
                initiator,
                counterparty,
                offered,
                requested,
                message: note,
            };
            admin_initiate_trade(ledger, proposal, now).map(Step::from)
        }
        AuctionCommand::CancelTrade { trade_id, reason } => {
            cancel_trade(ledger, actor, &trade_id, reason, now).map(Step::from)
        }

        AuctionCommand::Announce { message } => {
            ledger.ensure_mutable()?;
            Ok(Step::event(OutboundEvent::public(
                AuctionEvent::AdminAnnouncement { message },
            )))
        }
    }
}

/// Close the auction: a player still on the block returns to the pool.
///
/// Open trades are left for the sweep, which expires them once the
/// auction is no longer in the trade window.
pub fn complete(
    ledger: &mut AuctionLedger,
    machine: &mut BiddingMachine,
    actor: &Actor,
    now: TimestampMs,
) -> Result<Step, AuctionError> {
    ledger.ensure_mutable()?;
    let from = ledger.status();
    if !from.can_transition_to(AuctionStatus::Completed) {
        return Err(AuctionError::invalid_transition(
            from,
            AuctionStatus::Completed,
        ));
    }
    let mut step = Step::from(machine.close_out(ledger)?);
    ledger.transition_status(AuctionStatus::Completed, actor, now)?;
    step.events.push(status_changed(ledger, machine, from));
    Ok(step)
}

fn status_changed(
    ledger: &AuctionLedger,
    machine: &BiddingMachine,
    from: AuctionStatus,
) -> OutboundEvent {
    OutboundEvent::public(AuctionEvent::StatusChanged {
        from,
        to: ledger.status(),
        trade_window_expires_at: ledger.auction().trade_window_expires_at,
        bidding: machine.view(),
    })
}

/// Team a bid or proposal is made for. Admins must name one.
fn required_team(team: Option<TeamId>, actor: &Actor) -> Result<TeamId, AuctionError> {
    team.ok_or_else(|| AuctionError::UnauthorizedRole {
        role: actor.to_string(),
        command: "act without naming a team".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ca_01_ledger::test_utils::{ledger, player_id, team_id};
    use shared_types::{Audience, BiddingPhase, PlayerStatus};

    fn run(
        ledger: &mut AuctionLedger,
        machine: &mut BiddingMachine,
        actor: &Actor,
        command: AuctionCommand,
        now: TimestampMs,
    ) -> Step {
        dispatch(ledger, machine, actor, command, now).unwrap()
    }

    fn live() -> (AuctionLedger, BiddingMachine) {
        let mut ledger = ledger();
        let mut machine = BiddingMachine::for_ledger(&ledger);
        run(&mut ledger, &mut machine, &Actor::Admin, AuctionCommand::StartAuction, 0);
        (ledger, machine)
    }

    #[test]
    fn test_start_emits_status_change() {
        let mut ledger = ledger();
        let mut machine = BiddingMachine::for_ledger(&ledger);
        let step = run(&mut ledger, &mut machine, &Actor::Admin, AuctionCommand::StartAuction, 0);
        assert_eq!(ledger.status(), AuctionStatus::Live);
        assert!(matches!(
            step.events[0].event,
            AuctionEvent::StatusChanged {
                from: AuctionStatus::Setup,
                to: AuctionStatus::Live,
                ..
            }
        ));
    }

    #[test]
    fn test_pause_cancels_and_resume_rearms_timer() {
        let (mut ledger, mut machine) = live();
        let admin = Actor::Admin;
        run(&mut ledger, &mut machine, &admin, AuctionCommand::SelectNextPlayer { player_id: None }, 0);
        run(&mut ledger, &mut machine, &admin, AuctionCommand::OpenBidding, 0);

        let paused = run(&mut ledger, &mut machine, &admin, AuctionCommand::PauseAuction, 4_000);
        assert_eq!(paused.timer, TimerDirective::Cancel);

        let resumed = run(&mut ledger, &mut machine, &admin, AuctionCommand::ResumeAuction, 60_000);
        let timer = resumed.timer.scheduled().copied().unwrap();
        // 10s countdown with 4s used before the pause.
        assert_eq!(timer.fires_at, 66_000);
    }

    #[test]
    fn test_bid_needs_named_team_for_admin() {
        let (mut ledger, mut machine) = live();
        let admin = Actor::Admin;
        run(&mut ledger, &mut machine, &admin, AuctionCommand::SelectNextPlayer { player_id: None }, 0);
        run(&mut ledger, &mut machine, &admin, AuctionCommand::OpenBidding, 0);

        let err = dispatch(
            &mut ledger,
            &mut machine,
            &admin,
            AuctionCommand::PlaceBid {
                amount: 100,
                team_id: None,
            },
            1,
        )
        .unwrap_err();
        assert_eq!(err.kind().as_str(), "UnauthorizedRole");

        let step = run(
            &mut ledger,
            &mut machine,
            &admin,
            AuctionCommand::PlaceBid {
                amount: 100,
                team_id: Some(team_id("a")),
            },
            1,
        );
        assert!(matches!(step.events[0].event, AuctionEvent::BidPlaced { .. }));
    }

    #[test]
    fn test_trade_window_requires_idle_bidding() {
        let (mut ledger, mut machine) = live();
        let admin = Actor::Admin;
        run(&mut ledger, &mut machine, &admin, AuctionCommand::SelectNextPlayer { player_id: None }, 0);

        let err = dispatch(
            &mut ledger,
            &mut machine,
            &admin,
            AuctionCommand::OpenTradeWindow { duration_secs: 60 },
            10,
        )
        .unwrap_err();
        assert_eq!(err.kind().as_str(), "InvalidPhaseTransition");
        assert_eq!(ledger.status(), AuctionStatus::Live);
    }

    #[test]
    fn test_trade_window_stamps_expiry() {
        let (mut ledger, mut machine) = live();
        run(
            &mut ledger,
            &mut machine,
            &Actor::Admin,
            AuctionCommand::OpenTradeWindow { duration_secs: 60 },
            1_000,
        );
        assert_eq!(ledger.status(), AuctionStatus::TradeWindow);
        assert_eq!(ledger.auction().trade_window_expires_at, Some(61_000));
    }

    #[test]
    fn test_complete_returns_block_player_to_pool() {
        let (mut ledger, mut machine) = live();
        let admin = Actor::Admin;
        run(&mut ledger, &mut machine, &admin, AuctionCommand::SelectNextPlayer { player_id: None }, 0);

        let step = run(&mut ledger, &mut machine, &admin, AuctionCommand::CompleteAuction, 5);
        assert_eq!(ledger.status(), AuctionStatus::Completed);
        assert_eq!(machine.phase(), BiddingPhase::Waiting);
        assert_eq!(ledger.player(&player_id("p1")).unwrap().status, PlayerStatus::Pool);
        assert_eq!(step.timer, TimerDirective::Cancel);
    }

    #[test]
    fn test_finalized_rejects_everything() {
        let (mut ledger, mut machine) = live();
        let admin = Actor::Admin;
        run(&mut ledger, &mut machine, &admin, AuctionCommand::CompleteAuction, 1);
        run(&mut ledger, &mut machine, &admin, AuctionCommand::FinalizeAuction, 2);

        for command in [
            AuctionCommand::SelectNextPlayer { player_id: None },
            AuctionCommand::Announce {
                message: "late".into(),
            },
            AuctionCommand::UndoLast,
        ] {
            let err = dispatch(&mut ledger, &mut machine, &admin, command, 3).unwrap_err();
            assert_eq!(err, AuctionError::AuctionFinalized);
        }
    }

    #[test]
    fn test_announcement_is_public_and_leaves_ledger_alone() {
        let (mut ledger, mut machine) = live();
        let before = ledger.clone();
        let step = run(
            &mut ledger,
            &mut machine,
            &Actor::Admin,
            AuctionCommand::Announce {
                message: "Strategic timeout, back in five".into(),
            },
            10,
        );
        assert_eq!(step.events.len(), 1);
        assert_eq!(step.events[0].audience, Audience::Public);
        assert!(matches!(
            &step.events[0].event,
            AuctionEvent::AdminAnnouncement { message } if message.starts_with("Strategic")
        ));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_zero_length_trade_window_rejected() {
        let (mut ledger, mut machine) = live();
        let err = dispatch(
            &mut ledger,
            &mut machine,
            &Actor::Admin,
            AuctionCommand::OpenTradeWindow { duration_secs: 0 },
            1,
        )
        .unwrap_err();
        assert_eq!(err.kind().as_str(), "InvalidConfig");
    }
}
