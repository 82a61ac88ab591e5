//! # Runtime Configuration
//!
//! Loaded from environment variables, with defaults for local development.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CA_HOST` | `0.0.0.0` | Listen address |
//! | `CA_PORT` | `8080` | Listen port |
//! | `CA_ADMIN_KEY` | unset | Admin credential, valid for every auction |
//! | `CA_TEAM_TOKENS` | empty | `auction:team=token,...` |
//! | `CA_SWEEP_INTERVAL_SECS` | `5` | Trade-window sweep period |
//! | `CA_AUCTION_SEEDS` | empty | Comma-separated JSON seed files |
//! | `CA_EVENT_CAPACITY` | `1000` | Per-subscriber event buffer |
//! | `CA_DATA_DIR` | unset | Ledger directory; in-memory store when unset |
//!
//! ## Security Requirements
//!
//! - `CA_ADMIN_KEY` MUST be set in production; without it nobody can run
//!   an auction.

use ca_04_live_gateway::GatewayConfig;
use shared_types::{AuctionId, TeamId};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    /// Team token entry not in `auction:team=token` form.
    #[error("invalid team token entry {0:?}: expected auction:team=token")]
    InvalidTeamToken(String),

    #[error("SECURITY VIOLATION: no admin key configured. Set CA_ADMIN_KEY.")]
    MissingAdminKey,

    #[error("sweep interval must be at least one second")]
    InvalidSweepInterval,
}

/// One team credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamToken {
    pub auction_id: AuctionId,
    pub team_id: TeamId,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub host: String,
    pub port: u16,
    pub admin_key: Option<String>,
    pub team_tokens: Vec<TeamToken>,
    pub sweep_interval_secs: u64,
    pub seed_files: Vec<PathBuf>,
    pub event_capacity: usize,
    pub data_dir: Option<PathBuf>,
    pub gateway: GatewayConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            admin_key: None,
            team_tokens: Vec::new(),
            sweep_interval_secs: 5,
            seed_files: Vec::new(),
            event_capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
            data_dir: None,
            gateway: GatewayConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("CA_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("CA_PORT") {
            config.port = parse("CA_PORT", &port)?;
        }
        config.admin_key = lookup("CA_ADMIN_KEY").filter(|key| !key.is_empty());
        if let Some(tokens) = lookup("CA_TEAM_TOKENS") {
            config.team_tokens = parse_team_tokens(&tokens)?;
        }
        if let Some(secs) = lookup("CA_SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = parse("CA_SWEEP_INTERVAL_SECS", &secs)?;
        }
        if let Some(files) = lookup("CA_AUCTION_SEEDS") {
            config.seed_files = split_list(&files).map(PathBuf::from).collect();
        }
        if let Some(capacity) = lookup("CA_EVENT_CAPACITY") {
            config.event_capacity = parse("CA_EVENT_CAPACITY", &capacity)?;
        }
        config.data_dir = lookup("CA_DATA_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);

        if config.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidSweepInterval);
        }
        Ok(config)
    }

    /// Reject configurations that cannot run a real auction.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if self.admin_key.is_none() {
            return Err(ConfigError::MissingAdminKey);
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn parse_team_tokens(value: &str) -> Result<Vec<TeamToken>, ConfigError> {
    split_list(value)
        .map(|entry| {
            let invalid = || ConfigError::InvalidTeamToken(entry.to_string());
            let (scope, token) = entry.split_once('=').ok_or_else(invalid)?;
            let (auction, team) = scope.split_once(':').ok_or_else(invalid)?;
            if auction.is_empty() || team.is_empty() || token.is_empty() {
                return Err(invalid());
            }
            Ok(TeamToken {
                auction_id: AuctionId::from(auction),
                team_id: TeamId::from(team),
                token: token.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<RuntimeConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RuntimeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert_eq!(config.sweep_interval(), Duration::from_secs(5));
        assert!(config.team_tokens.is_empty());
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_team_tokens_parsed() {
        let config = load(&[(
            "CA_TEAM_TOKENS",
            "ipl:csk=yellow, ipl:mi=blue ,wpl:rcb=red",
        )])
        .unwrap();
        assert_eq!(config.team_tokens.len(), 3);
        assert_eq!(
            config.team_tokens[1],
            TeamToken {
                auction_id: AuctionId::from("ipl"),
                team_id: TeamId::from("mi"),
                token: "blue".into(),
            }
        );
    }

    #[test]
    fn test_malformed_team_token_rejected() {
        assert_eq!(
            load(&[("CA_TEAM_TOKENS", "ipl-csk=yellow")]).unwrap_err(),
            ConfigError::InvalidTeamToken("ipl-csk=yellow".into())
        );
        assert!(load(&[("CA_TEAM_TOKENS", "ipl:csk=")]).is_err());
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(matches!(
            load(&[("CA_PORT", "eighty")]),
            Err(ConfigError::InvalidValue { key: "CA_PORT", .. })
        ));
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        assert_eq!(
            load(&[("CA_SWEEP_INTERVAL_SECS", "0")]).unwrap_err(),
            ConfigError::InvalidSweepInterval
        );
    }

    #[test]
    fn test_production_requires_admin_key() {
        assert_eq!(
            load(&[]).unwrap().validate_for_production(),
            Err(ConfigError::MissingAdminKey)
        );
        assert_eq!(
            load(&[("CA_ADMIN_KEY", "")]).unwrap().validate_for_production(),
            Err(ConfigError::MissingAdminKey)
        );
        assert!(load(&[("CA_ADMIN_KEY", "s3cret")])
            .unwrap()
            .validate_for_production()
            .is_ok());
    }

    #[test]
    fn test_seed_files_split() {
        let config = load(&[("CA_AUCTION_SEEDS", "a.json, ,b.json")]).unwrap();
        assert_eq!(
            config.seed_files,
            vec![PathBuf::from("a.json"), PathBuf::from("b.json")]
        );
    }
}
