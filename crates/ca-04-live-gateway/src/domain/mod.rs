//! Domain layer: configuration, errors, wire messages and session rules.

pub mod config;
pub mod error;
pub mod messages;
pub mod session;

pub use config::{ConfigError, GatewayConfig, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_RATE_LIMIT};
pub use error::GatewayError;
pub use messages::{ClientMessage, ServerMessage};
pub use session::Session;
