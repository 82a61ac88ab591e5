//! WebSocket connection loop.
//!
//! One task per connection multiplexes three sources:
//!
//! - client frames, answered with an ack, an error or a snapshot;
//! - the auction's event stream, projected for this viewer;
//! - a ping ticker that also enforces the idle timeout.
//!
//! The subscription is opened before the first snapshot is taken, so no
//! event can fall between the two. A subscriber that lags is sent a fresh
//! snapshot instead of the events it missed.

use crate::connections::{ConnectionInfo, ConnectionManager};
use crate::domain::{ClientMessage, GatewayConfig, GatewayError, ServerMessage, Session};
use crate::ports::AuctionDirectory;
use auction_telemetry::{log_auction_event, COMMANDS, SUBSCRIBER_LAGS};
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use shared_bus::{Subscription, SubscriptionError};
use shared_types::AuctionCommand;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub struct LiveConnection {
    session: Session,
    directory: Arc<dyn AuctionDirectory>,
    connections: Arc<ConnectionManager>,
    config: GatewayConfig,
}

impl LiveConnection {
    pub fn new(
        session: Session,
        directory: Arc<dyn AuctionDirectory>,
        connections: Arc<ConnectionManager>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            session,
            directory,
            connections,
            config,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Drive the connection until either side closes it.
    pub async fn run(mut self, socket: WebSocket, mut subscription: Subscription) {
        let connection_id = self.session.connection_id();
        let _guard = self.connections.register(
            connection_id,
            ConnectionInfo {
                auction_id: self.session.auction_id().clone(),
                role: self.session.role(),
                team_id: self.session.team_id().cloned(),
                connected_at: shared_types::now_ms(),
            },
        );
        log_auction_event!(
            info,
            "gateway",
            "Live connection opened",
            self.session.auction_id(),
            %connection_id,
            role = %self.session.role()
        );

        let (mut sink, mut stream) = socket.split();
        let opening = match self.refresh().await {
            Ok(snapshot) => vec![self.session.welcome(), snapshot],
            Err(err) => vec![ServerMessage::error(None, &err)],
        };
        for message in opening {
            if sink.send(Message::Text(message.to_json())).await.is_err() {
                return;
            }
        }

        let mut ping = tokio::time::interval(self.config.ping_interval());
        ping.tick().await;
        let mut last_activity = Instant::now();

        loop {
            tokio::select! {
                frame = stream.next() => {
                    let Some(frame) = frame else { break };
                    last_activity = Instant::now();
                    let reply = match frame {
                        Ok(Message::Text(text)) => self.on_text(&text).await,
                        Ok(Message::Binary(_)) => ServerMessage::error(
                            None,
                            &GatewayError::MalformedMessage("binary frames are not supported".into()),
                        ),
                        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                        Ok(Message::Close(_)) => {
                            debug!(%connection_id, "Close frame received");
                            break;
                        }
                        Err(e) => {
                            warn!(%connection_id, error = %e, "WebSocket error");
                            break;
                        }
                    };
                    if sink.send(Message::Text(reply.to_json())).await.is_err() {
                        break;
                    }
                }
                received = subscription.recv() => {
                    let outbound = match received {
                        Ok(envelope) => self.session.project(envelope),
                        Err(SubscriptionError::Lagged { skipped }) => {
                            SUBSCRIBER_LAGS.inc();
                            warn!(%connection_id, skipped, "Subscriber lagged, resending snapshot");
                            match self.refresh().await {
                                Ok(snapshot) => Some(snapshot),
                                Err(err) => Some(ServerMessage::error(None, &err)),
                            }
                        }
                        Err(SubscriptionError::Closed) => {
                            info!(%connection_id, "Event bus closed");
                            break;
                        }
                    };
                    if let Some(message) = outbound {
                        if sink.send(Message::Text(message.to_json())).await.is_err() {
                            break;
                        }
                    }
                }
                _ = ping.tick() => {
                    if last_activity.elapsed() > self.config.idle_timeout() {
                        info!(%connection_id, "Closing idle live connection");
                        break;
                    }
                    if sink.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }

        let _ = sink.send(Message::Close(None)).await;
        log_auction_event!(
            info,
            "gateway",
            "Live connection closed",
            self.session.auction_id(),
            %connection_id
        );
    }

    /// Answer one text frame.
    pub async fn on_text(&mut self, text: &str) -> ServerMessage {
        let message = match self.session.decode(text) {
            Ok(message) => message,
            Err(err) => return ServerMessage::error(None, &err),
        };

        match message {
            ClientMessage::Command {
                request_id,
                command,
            } => self.on_command(request_id, command).await,
            ClientMessage::RequestSnapshot { request_id } => match self.refresh().await {
                Ok(snapshot) => snapshot,
                Err(err) => ServerMessage::error(request_id, &err),
            },
            ClientMessage::Ping { request_id } => ServerMessage::Pong { request_id },
        }
    }

    async fn on_command(
        &mut self,
        request_id: Option<String>,
        command: AuctionCommand,
    ) -> ServerMessage {
        let name = command.name();
        let actor = match self.session.authorize(&command) {
            Ok(actor) => actor,
            Err(err) => {
                COMMANDS.with_label_values(&[name, err.kind()]).inc();
                debug!(
                    connection_id = %self.session.connection_id(),
                    command = name,
                    role = %self.session.role(),
                    "Command refused at the gateway"
                );
                return ServerMessage::error(request_id, &err);
            }
        };

        match self
            .directory
            .submit(self.session.auction_id(), actor, command)
            .await
        {
            Ok(receipt) => self.session.ack(request_id, receipt),
            Err(err) => ServerMessage::error(request_id, &GatewayError::from(err)),
        }
    }

    /// Fetch a snapshot for this viewer.
    async fn refresh(&mut self) -> Result<ServerMessage, GatewayError> {
        let snapshot = self
            .directory
            .snapshot(
                self.session.auction_id(),
                self.session.role(),
                self.session.team_id().cloned(),
            )
            .await?;
        Ok(self.session.accept_snapshot(snapshot))
    }
}
