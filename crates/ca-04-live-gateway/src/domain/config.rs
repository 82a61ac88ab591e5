//! Gateway configuration with validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default maximum inbound message size (64 KiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Default per-connection rate limit (messages per second).
pub const DEFAULT_RATE_LIMIT: u32 = 20;

/// Limits applied to every live connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Maximum size of one client message in bytes
    pub max_message_size: usize,
    /// Client messages allowed per second per connection
    pub rate_limit: u32,
    /// Seconds between server pings
    pub ping_interval_secs: u64,
    /// Close a connection after this many seconds without client traffic
    pub idle_timeout_secs: u64,
    /// Outbound frames buffered per connection before it is treated as slow
    pub send_buffer: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            rate_limit: DEFAULT_RATE_LIMIT,
            ping_interval_secs: 30,
            idle_timeout_secs: 300,
            send_buffer: 256,
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_message_size cannot be 0".into(),
            ));
        }
        if self.rate_limit == 0 {
            return Err(ConfigError::InvalidLimit("rate_limit cannot be 0".into()));
        }
        if self.ping_interval_secs == 0 {
            return Err(ConfigError::InvalidTimeout(
                "ping_interval_secs cannot be 0".into(),
            ));
        }
        if self.idle_timeout_secs <= self.ping_interval_secs {
            return Err(ConfigError::InvalidTimeout(
                "idle_timeout_secs must exceed ping_interval_secs".into(),
            ));
        }
        Ok(())
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}
