//! Registry of open live connections.

use auction_telemetry::LIVE_CONNECTIONS;
use dashmap::DashMap;
use shared_types::{AuctionId, Role, TeamId, TimestampMs};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub auction_id: AuctionId,
    pub role: Role,
    pub team_id: Option<TeamId>,
    pub connected_at: TimestampMs,
}

#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections: DashMap<Uuid, ConnectionInfo>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a connection until the returned guard is dropped.
    pub fn register(
        self: &Arc<Self>,
        connection_id: Uuid,
        info: ConnectionInfo,
    ) -> ConnectionGuard {
        LIVE_CONNECTIONS.with_label_values(&[info.role.as_str()]).inc();
        debug!(
            %connection_id,
            auction_id = %info.auction_id,
            role = %info.role,
            "Live connection registered"
        );
        self.connections.insert(connection_id, info);
        ConnectionGuard {
            manager: Arc::clone(self),
            connection_id,
        }
    }

    fn remove(&self, connection_id: &Uuid) {
        if let Some((_, info)) = self.connections.remove(connection_id) {
            LIVE_CONNECTIONS.with_label_values(&[info.role.as_str()]).dec();
            debug!(%connection_id, auction_id = %info.auction_id, "Live connection removed");
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Open connections watching `auction_id`.
    pub fn count_for(&self, auction_id: &AuctionId) -> usize {
        self.connections
            .iter()
            .filter(|entry| &entry.value().auction_id == auction_id)
            .count()
    }

    pub fn get(&self, connection_id: &Uuid) -> Option<ConnectionInfo> {
        self.connections.get(connection_id).map(|r| r.clone())
    }
}

/// Removes its connection from the manager on drop.
pub struct ConnectionGuard {
    manager: Arc<ConnectionManager>,
    connection_id: Uuid,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.manager.remove(&self.connection_id);
    }
}
