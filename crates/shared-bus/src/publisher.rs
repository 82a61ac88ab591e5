//! # Publishing
//!
//! The auction actor is the only writer for its auction, so envelopes
//! arrive here already sequenced. The bus keeps the highest sequence seen
//! per auction and refuses anything that would move it backwards.

use crate::events::{AuctionEventEnvelope, EventFilter};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::AuctionId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Fan `envelope` out to every live subscription. Returns how many
    /// receivers got it; zero when nobody is watching or the envelope was
    /// out of order.
    async fn publish(&self, envelope: AuctionEventEnvelope) -> usize;

    /// Envelopes accepted since startup, across all auctions.
    fn published_total(&self) -> u64;
}

/// Broadcast-channel bus shared by every auction in the process.
///
/// A subscription that falls more than `capacity` envelopes behind is told
/// it lagged and must start over from a snapshot.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<AuctionEventEnvelope>,
    published: AtomicU64,
    /// Highest sequence published per auction.
    high_water: Mutex<HashMap<AuctionId, u64>>,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            published: AtomicU64::new(0),
            high_water: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Receive envelopes matching `filter`, starting after the latest one.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(auction_id = ?filter.auction_id, topics = ?filter.topics, "Subscription opened");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Same as [`subscribe`](Self::subscribe), as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.sender.subscribe(), filter)
    }

    /// Sequence of the newest envelope published for `auction_id`.
    pub fn last_sequence(&self, auction_id: &AuctionId) -> Option<u64> {
        self.high_water.lock().get(auction_id).copied()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record `sequence` for `auction_id` if it moves the auction forward.
    fn advance(&self, auction_id: &AuctionId, sequence: u64) -> Result<(), u64> {
        let mut high_water = self.high_water.lock();
        match high_water.get(auction_id) {
            Some(&last) if sequence <= last => Err(last),
            _ => {
                high_water.insert(auction_id.clone(), sequence);
                Ok(())
            }
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, envelope: AuctionEventEnvelope) -> usize {
        let event = envelope.payload.name();
        let sequence = envelope.sequence;
        let auction_id = envelope.auction_id.clone();

        if let Err(last) = self.advance(&auction_id, sequence) {
            warn!(%auction_id, event, sequence, last, "Out-of-order envelope dropped");
            return 0;
        }
        self.published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(envelope) {
            Ok(receivers) => {
                debug!(%auction_id, event, sequence, receivers, "Event published");
                receivers
            }
            Err(_) => {
                trace!(%auction_id, event, sequence, "No live subscriptions");
                0
            }
        }
    }

    fn published_total(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
