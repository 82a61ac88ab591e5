//! # Cricket Auction Test Suite
//!
//! Cross-crate flows driven through the auction runtime, the way a live
//! client would drive them.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # Registry over an in-memory store, command helpers
//! └── integration/
//!     ├── bidding_flow.rs     # Reveal, bid, countdown, sold/unsold
//!     ├── trade_flow.rs       # Proposal, settlement, caps, locks, expiry
//!     ├── overrides.rs        # Force outcome, undo/redo, finalize
//!     ├── persistence.rs      # Store faults leave state untouched
//!     └── live_projection.rs  # Per-role event visibility
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ca-tests
//! cargo test -p ca-tests integration::trade_flow::
//! ```

pub mod harness;
pub mod integration;
