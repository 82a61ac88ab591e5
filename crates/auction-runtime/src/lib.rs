//! # Auction Runtime
//!
//! Hosts every running auction and the service around them.
//!
//! ## Modular Structure
//!
//! - `dispatch` - Routes one command to the bidding machine, trade engine or
//!   status transitions
//! - `auction_core` - Staged apply, invariant check, durable commit, event sealing
//! - `actor` - One task per auction: mailbox, timers, publishing, metrics
//! - `registry` - Running auctions by id; the gateway's `AuctionDirectory`
//! - `sweep` - Periodic trade-window close and open-trade expiry
//! - `service` - `/health`, `/metrics` and the live gateway routes
//! - `runtime` - Wiring and lifecycle
//!
//! ## Command Flow
//!
//! ```text
//! client ──▶ live gateway ──▶ AuctionHandle ──▶ mailbox
//!                                                  │
//!                                                  ▼
//!                          AuctionCore::execute (staged) ──▶ LedgerStore::commit
//!                                                  │
//!                      receipt ◀── publish to bus ◀┘
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry
//! 2. Load configuration from the environment
//! 3. Open the ledger store
//! 4. Resume stored auctions and load seed files
//! 5. Start the trade sweeper and the HTTP service

pub mod actor;
pub mod auction_core;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod registry;
pub mod runtime;
pub mod seeds;
pub mod service;
pub mod sweep;

pub use actor::AuctionHandle;
pub use auction_core::{Applied, AuctionCore};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ConfigError, RuntimeConfig, TeamToken};
pub use registry::AuctionRegistry;
pub use runtime::AuctionRuntime;
pub use seeds::{read_seed, SeedError};
