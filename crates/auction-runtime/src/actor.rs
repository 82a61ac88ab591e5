//! # Auction Actor
//!
//! One task per auction owns its [`AuctionCore`]. Commands, snapshot
//! requests, timer firings and sweeps all arrive on one mailbox, so the
//! auction sees them in a single total order.
//!
//! ```text
//! AuctionHandle::submit ─┐
//! AuctionHandle::snapshot┤
//! timer task ────────────┼──▶ mailbox ──▶ AuctionCore ──▶ EventPublisher
//! sweep loop ────────────┘                    │
//!                                             └──▶ timer task (re)armed
//! ```
//!
//! The actor stops once every handle is dropped. Timer tasks hold only a
//! weak sender and never keep it alive.

use crate::clock::Clock;
use crate::auction_core::{Applied, AuctionCore};
use auction_telemetry::{
    log_auction_event, log_trade_event, metric_inc, time_histogram, ACTIVE_AUCTIONS, BIDS_ACCEPTED, BIDS_REJECTED,
    COMMANDS, COMMAND_DURATION, EVENTS_PUBLISHED, PLAYERS_SOLD, PLAYERS_UNSOLD, SALE_PRICE,
    SETTLEMENT_SHORTFALLS, STALE_TIMERS, TRADES_CLOSED,
};
use ca_02_bidding::{ScheduledTimer, TimerDirective, TimerToken};
use shared_bus::{AuctionEvent, CommandReceipt, EventPublisher};
use shared_types::{
    Actor, AuctionCommand, AuctionError, AuctionId, AuctionSnapshot, ErrorKind, Role, TeamId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

/// Mailbox depth per auction.
pub const MAILBOX_CAPACITY: usize = 256;

/// Delay before re-firing a timer whose commit failed.
const TIMER_RETRY_MS: u64 = 1_000;

pub enum ActorMessage {
    Submit {
        actor: Actor,
        command: AuctionCommand,
        reply: oneshot::Sender<Result<CommandReceipt, AuctionError>>,
    },
    Snapshot {
        role: Role,
        team_id: Option<TeamId>,
        reply: oneshot::Sender<AuctionSnapshot>,
    },
    TimerFired(TimerToken),
    Sweep {
        reply: oneshot::Sender<Result<usize, AuctionError>>,
    },
}

/// Cloneable address of a running auction.
#[derive(Debug, Clone)]
pub struct AuctionHandle {
    auction_id: AuctionId,
    sender: mpsc::Sender<ActorMessage>,
}

impl AuctionHandle {
    pub fn auction_id(&self) -> &AuctionId {
        &self.auction_id
    }

    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    pub async fn submit(
        &self,
        actor: Actor,
        command: AuctionCommand,
    ) -> Result<CommandReceipt, AuctionError> {
        self.request(|reply| ActorMessage::Submit {
            actor,
            command,
            reply,
        })
        .await?
    }

    pub async fn snapshot(
        &self,
        role: Role,
        team_id: Option<TeamId>,
    ) -> Result<AuctionSnapshot, AuctionError> {
        self.request(|reply| ActorMessage::Snapshot {
            role,
            team_id,
            reply,
        })
        .await
    }

    /// Run the trade sweep now. Returns the number of events published.
    pub async fn sweep(&self) -> Result<usize, AuctionError> {
        self.request(|reply| ActorMessage::Sweep { reply }).await?
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> ActorMessage,
    ) -> Result<T, AuctionError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(message(reply))
            .await
            .map_err(|_| self.stopped())?;
        response.await.map_err(|_| self.stopped())
    }

    fn stopped(&self) -> AuctionError {
        AuctionError::AuctionNotFound(self.auction_id.to_string())
    }
}

/// Start the actor task for `core`.
pub fn spawn(
    core: AuctionCore,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
) -> AuctionHandle {
    let (sender, receiver) = mpsc::channel(MAILBOX_CAPACITY);
    let handle = AuctionHandle {
        auction_id: core.id().clone(),
        sender: sender.clone(),
    };
    let actor = AuctionActor {
        core,
        publisher,
        clock,
        receiver,
        timer_sender: sender.downgrade(),
        timer: None,
    };
    drop(sender);
    tokio::spawn(actor.run());
    handle
}

struct AuctionActor {
    core: AuctionCore,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    receiver: mpsc::Receiver<ActorMessage>,
    timer_sender: mpsc::WeakSender<ActorMessage>,
    timer: Option<JoinHandle<()>>,
}

impl AuctionActor {
    #[instrument(skip(self), fields(auction_id = %self.core.id()), name = "auction_actor")]
    async fn run(mut self) {
        ACTIVE_AUCTIONS.inc();
        log_auction_event!(info, "runtime", "Auction actor started", self.core.id());

        while let Some(message) = self.receiver.recv().await {
            match message {
                ActorMessage::Submit {
                    actor,
                    command,
                    reply,
                } => {
                    let result = self.submit(actor, command).await;
                    let _ = reply.send(result);
                }
                ActorMessage::Snapshot {
                    role,
                    team_id,
                    reply,
                } => {
                    let _ = reply.send(self.core.snapshot(role, team_id.as_ref()));
                }
                ActorMessage::TimerFired(token) => self.on_timer(token).await,
                ActorMessage::Sweep { reply } => {
                    let result = self.sweep().await;
                    let _ = reply.send(result);
                }
            }
        }

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        ACTIVE_AUCTIONS.dec();
        log_auction_event!(info, "runtime", "Auction actor stopped", self.core.id());
    }

    async fn submit(
        &mut self,
        actor: Actor,
        command: AuctionCommand,
    ) -> Result<CommandReceipt, AuctionError> {
        let name = command.name();
        let is_bid = matches!(command, AuctionCommand::PlaceBid { .. });
        let _timer = time_histogram!(COMMAND_DURATION);

        let now = self.clock.now_ms();
        match self.core.execute(&actor, command, now) {
            Ok(applied) => {
                metric_inc!(COMMANDS, &[name, "ok"]);
                debug!(command = name, actor = %actor, "Command applied");
                Ok(self.publish(applied).await)
            }
            Err(err) => {
                let kind = err.kind().as_str();
                metric_inc!(COMMANDS, &[name, kind]);
                if is_bid {
                    metric_inc!(BIDS_REJECTED, &[kind]);
                }
                debug!(command = name, actor = %actor, error = %err, "Command rejected");
                Err(err)
            }
        }
    }

    async fn on_timer(&mut self, token: TimerToken) {
        let now = self.clock.now_ms();
        match self.core.fire_timer(token, now) {
            Ok(Some(applied)) => {
                self.publish(applied).await;
            }
            Ok(None) => {
                STALE_TIMERS.inc();
                debug!(?token, "Stale timer ignored");
            }
            Err(err) => {
                error!(?token, error = %err, "Timer transition failed, retrying");
                self.arm(ScheduledTimer {
                    token,
                    fires_at: now + TIMER_RETRY_MS,
                });
            }
        }
    }

    async fn sweep(&mut self) -> Result<usize, AuctionError> {
        let now = self.clock.now_ms();
        match self.core.sweep(now)? {
            Some(applied) => {
                let receipt = self.publish(applied).await;
                Ok(receipt.events.len())
            }
            None => Ok(0),
        }
    }

    async fn publish(&mut self, applied: Applied) -> CommandReceipt {
        let Applied { receipt, timer } = applied;
        match timer {
            TimerDirective::Keep => {}
            TimerDirective::Schedule(timer) => self.arm(timer),
            TimerDirective::Cancel => self.disarm(),
        }

        record_outcomes(&receipt);
        for envelope in &receipt.events {
            self.publisher.publish(envelope.clone()).await;
            EVENTS_PUBLISHED.inc();
        }
        receipt
    }

    fn arm(&mut self, timer: ScheduledTimer) {
        self.disarm();
        let delay = Duration::from_millis(timer.remaining_ms(self.clock.now_ms()));
        let sender = self.timer_sender.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(sender) = sender.upgrade() {
                let _ = sender.send(ActorMessage::TimerFired(timer.token)).await;
            }
        }));
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

fn record_outcomes(receipt: &CommandReceipt) {
    for envelope in &receipt.events {
        match &envelope.payload {
            AuctionEvent::BidPlaced { .. } => BIDS_ACCEPTED.inc(),
            AuctionEvent::PlayerSold { price, .. } => {
                PLAYERS_SOLD.inc();
                SALE_PRICE.observe(*price as f64);
            }
            AuctionEvent::PlayerUnsold { .. } => PLAYERS_UNSOLD.inc(),
            AuctionEvent::TradeRejected(trade)
            | AuctionEvent::TradeWithdrawn(trade)
            | AuctionEvent::TradeCancelled(trade)
            | AuctionEvent::TradeExpired(trade)
            | AuctionEvent::TradeExecuted { trade, .. } => {
                metric_inc!(TRADES_CLOSED, &[trade.status.as_str()]);
                log_trade_event!(
                    info,
                    "Trade closed",
                    trade.auction_id,
                    trade.id,
                    status = trade.status.as_str(),
                    sequence = envelope.sequence
                );
            }
            _ => {}
        }
    }
    for warning in &receipt.warnings {
        if warning.kind == ErrorKind::InsufficientSettlementPurse {
            SETTLEMENT_SHORTFALLS.inc();
        }
    }
}
