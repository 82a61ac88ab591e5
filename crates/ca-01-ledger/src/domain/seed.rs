//! Pool-load input: the auction header, its teams and its player pool.

use serde::{Deserialize, Serialize};
use shared_types::{
    Amount, AuctionConfig, AuctionId, PlayerId, PlayerRole, PlayerStatus, TeamId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuctionSeed {
    pub id: AuctionId,
    pub name: String,
    #[serde(default)]
    pub config: AuctionConfig,
    pub teams: Vec<TeamSeed>,
    pub players: Vec<PlayerSeed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamSeed {
    pub id: TeamId,
    pub name: String,
    pub short_code: String,
    /// Overrides the configured purse for this team.
    #[serde(default)]
    pub purse_value: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerSeed {
    pub id: PlayerId,
    pub name: String,
    pub role: PlayerRole,
    /// Defaults to the configured base price.
    #[serde(default)]
    pub base_price: Option<Amount>,
    /// `pool` (default), `ineligible` or `retained`.
    #[serde(default)]
    pub status: PlayerStatus,
    /// Retaining team, for `retained` players.
    #[serde(default)]
    pub team_id: Option<TeamId>,
    /// Retention price, for `retained` players.
    #[serde(default)]
    pub price: Option<Amount>,
}
