//! # Shared Bus - Auction Event Bus
//!
//! Carries every committed auction event from the auction runtime to the
//! live gateway and any other observer.
//!
//! ## Rules
//!
//! - Events are published only after the state change is durable.
//! - Every event is wrapped in an `EventEnvelope` with a per-auction sequence.
//! - Subscribers receive events in publish order; a lagging subscriber is
//!   told so and must resynchronize from a snapshot.
//!
//! ```text
//! ┌──────────────┐    publish()     ┌──────────────┐   subscribe()   ┌──────────────┐
//! │ Auction      │ ───────────────▶ │  Event Bus   │ ──────────────▶ │ Live Gateway │
//! │ Actor        │                  │ (broadcast)  │                 │ sessions     │
//! └──────────────┘                  └──────────────┘                 └──────────────┘
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{
    AuctionEvent, AuctionEventEnvelope, CommandReceipt, EventFilter, EventTopic, OutboundEvent,
};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it is reported as lagged.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
