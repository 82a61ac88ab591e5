//! # Subscriptions
//!
//! Filtered receivers over the bus. A gap is never papered over: a receiver
//! that lags is told how much it missed.

use crate::events::{AuctionEventEnvelope, EventFilter};
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("event bus closed")]
    Closed,

    /// The subscriber fell behind and `skipped` events were dropped. The
    /// subscriber must resynchronize from a fresh snapshot.
    #[error("subscriber lagged, {skipped} envelopes dropped")]
    Lagged { skipped: u64 },
}

#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<AuctionEventEnvelope>,
    filter: EventFilter,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<AuctionEventEnvelope>,
        filter: EventFilter,
    ) -> Self {
        Self { receiver, filter }
    }

    /// Wait for the next matching envelope.
    pub async fn recv(&mut self) -> Result<AuctionEventEnvelope, SubscriptionError> {
        loop {
            let envelope = match self.receiver.recv().await {
                Ok(envelope) => envelope,
                Err(broadcast::error::RecvError::Closed) => return Err(SubscriptionError::Closed),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Subscription lagged");
                    return Err(SubscriptionError::Lagged { skipped });
                }
            };

            if self.filter.matches(&envelope) {
                return Ok(envelope);
            }
        }
    }

    /// Next matching envelope already buffered, if any.
    pub fn try_recv(&mut self) -> Result<Option<AuctionEventEnvelope>, SubscriptionError> {
        loop {
            let envelope = match self.receiver.try_recv() {
                Ok(envelope) => envelope,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    return Err(SubscriptionError::Lagged { skipped })
                }
            };

            if self.filter.matches(&envelope) {
                return Ok(Some(envelope));
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

/// `Stream` form of a subscription. Yields `Err(Lagged)` where envelopes
/// were dropped.
pub struct EventStream {
    inner: BroadcastStream<AuctionEventEnvelope>,
    filter: EventFilter,
}

impl EventStream {
    pub(crate) fn new(
        receiver: broadcast::Receiver<AuctionEventEnvelope>,
        filter: EventFilter,
    ) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
            filter,
        }
    }

    #[must_use]
    pub fn event_filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = Result<AuctionEventEnvelope, SubscriptionError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(envelope))) => {
                    if self.filter.matches(&envelope) {
                        return Poll::Ready(Some(Ok(envelope)));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    return Poll::Ready(Some(Err(SubscriptionError::Lagged { skipped })));
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AuctionEvent, EventTopic};
    use crate::publisher::InMemoryEventBus;
    use crate::EventPublisher;
    use shared_types::{AuctionId, Audience, EventEnvelope, PlayerId};
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    fn envelope(sequence: u64, payload: AuctionEvent) -> AuctionEventEnvelope {
        EventEnvelope::new(AuctionId::from("ipl"), sequence, 0, Audience::Public, payload)
    }

    fn announcement(sequence: u64) -> AuctionEventEnvelope {
        envelope(
            sequence,
            AuctionEvent::AdminAnnouncement {
                message: "lunch".into(),
            },
        )
    }

    fn skipped(sequence: u64) -> AuctionEventEnvelope {
        envelope(
            sequence,
            AuctionEvent::PlayerSkipped {
                player_id: PlayerId::from("p1"),
            },
        )
    }

    #[tokio::test]
    async fn test_subscription_recv() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        bus.publish(announcement(1)).await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("event");

        assert_eq!(received.sequence, 1);
    }

    #[tokio::test]
    async fn test_subscription_filter() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::topics(vec![EventTopic::Bidding]));

        bus.publish(announcement(1)).await;
        bus.publish(skipped(2)).await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("event");

        assert_eq!(received.sequence, 2);
    }

    #[tokio::test]
    async fn test_subscription_preserves_order() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        for sequence in 1..=5 {
            bus.publish(announcement(sequence)).await;
        }
        for expected in 1..=5 {
            assert_eq!(sub.recv().await.unwrap().sequence, expected);
        }
    }

    #[tokio::test]
    async fn test_lag_is_reported() {
        let bus = InMemoryEventBus::with_capacity(2);
        let mut sub = bus.subscribe(EventFilter::all());

        for sequence in 1..=5 {
            bus.publish(announcement(sequence)).await;
        }

        let err = sub.recv().await.unwrap_err();
        assert!(matches!(err, SubscriptionError::Lagged { skipped: 3 }));
        // After the lag the receiver resumes at the oldest retained event.
        assert_eq!(sub.recv().await.unwrap().sequence, 4);
    }

    #[tokio::test]
    async fn test_subscription_drop_cleanup() {
        let bus = InMemoryEventBus::new();

        {
            let _sub1 = bus.subscribe(EventFilter::all());
            let _sub2 = bus.subscribe(EventFilter::all());
            assert_eq!(bus.subscriber_count(), 2);
        }

        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        assert!(matches!(sub.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_event_stream_filters() {
        let bus = InMemoryEventBus::new();
        let mut stream = bus.event_stream(EventFilter::topics(vec![EventTopic::Bidding]));
        assert_eq!(stream.event_filter().topics, vec![EventTopic::Bidding]);

        bus.publish(announcement(1)).await;
        bus.publish(skipped(2)).await;

        let received = timeout(Duration::from_millis(100), stream.next())
            .await
            .expect("timeout")
            .expect("stream open")
            .expect("event");
        assert_eq!(received.sequence, 2);
    }
}
