//! # Shared Types Crate
//!
//! Domain entities, commands, the event envelope and the error taxonomy
//! shared by every auction subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: all cross-subsystem types are defined here.
//! - **Integer Money**: every currency value is a `u64` in the smallest unit.
//! - **Closed Configuration**: `AuctionConfig` rejects unknown fields.
//! - **Role-Scoped Commands**: authorization is decided once, at the edge,
//!   by `Role::authorize`.

pub mod commands;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod snapshot;

pub use commands::*;
pub use entities::*;
pub use envelope::{Audience, EventEnvelope, ENVELOPE_VERSION};
pub use errors::*;
pub use snapshot::*;

/// Milliseconds since the Unix epoch, from the system clock.
pub fn now_ms() -> TimestampMs {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
