//! Test fixtures shared across the auction crates.

use crate::domain::ledger::AuctionLedger;
use crate::domain::seed::{AuctionSeed, PlayerSeed, TeamSeed};
use shared_types::{
    AuctionConfig, AuctionId, IncrementTier, PlayerId, PlayerRole, PlayerStatus, TeamId,
};

pub fn team_id(id: &str) -> TeamId {
    TeamId::from(id)
}

pub fn player_id(id: &str) -> PlayerId {
    PlayerId::from(id)
}

/// Small, fast configuration: base 100, purse 1000, squads of 3..=5,
/// tiers `[0,1000) +50`, `[1000,..) +100`.
pub fn config() -> AuctionConfig {
    AuctionConfig {
        base_price: 100,
        purse_value: 1_000,
        min_squad_size: 3,
        max_squad_size: 5,
        max_rounds: 2,
        max_offers_per_player: None,
        timer_duration_secs: 10,
        bid_reset_timer_secs: 5,
        going_once_timer_secs: 3,
        going_twice_timer_secs: 3,
        reveal_delay_secs: 0,
        auto_advance_delay_secs: None,
        increment_tiers: vec![
            IncrementTier {
                from: 0,
                until: Some(1_000),
                step: 50,
            },
            IncrementTier {
                from: 1_000,
                until: None,
                step: 100,
            },
        ],
        max_trades_per_team: 2,
        purse_settlement_enabled: true,
        undo_depth: 3,
    }
}

pub fn team_seed(id: &str) -> TeamSeed {
    TeamSeed {
        id: team_id(id),
        name: format!("Team {}", id.to_uppercase()),
        short_code: id.to_uppercase(),
        purse_value: None,
    }
}

pub fn player_seed(id: &str) -> PlayerSeed {
    PlayerSeed {
        id: player_id(id),
        name: format!("Player {id}"),
        role: PlayerRole::AllRounder,
        base_price: None,
        status: PlayerStatus::Pool,
        team_id: None,
        price: None,
    }
}

/// Teams `a`, `b`, `c`; players `p1`..`p4` in the pool.
pub fn seed() -> AuctionSeed {
    AuctionSeed {
        id: AuctionId::from("test-auction"),
        name: "Test Auction".to_string(),
        config: config(),
        teams: ["a", "b", "c"].iter().map(|id| team_seed(id)).collect(),
        players: ["p1", "p2", "p3", "p4"]
            .iter()
            .map(|id| player_seed(id))
            .collect(),
    }
}

pub fn ledger() -> AuctionLedger {
    AuctionLedger::from_seed(seed()).expect("fixture seed is valid")
}
