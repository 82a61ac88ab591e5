//! # Trade Invariants
//!
//! Checks run at proposal time and again, against live roster state, at
//! execution time. A trade references teams and players by id only, so
//! nothing checked at proposal is trusted at execution.

use ca_01_ledger::AuctionLedger;
use shared_types::{
    AuctionError, AuctionStatus, OfferedPlayer, PlayerId, PlayerStatus, TeamId, Trade, TradeId,
};
use std::collections::HashSet;

/// Trades may only be created or executed during the trade window.
pub fn invariant_trade_window(ledger: &AuctionLedger) -> Result<(), AuctionError> {
    ledger.ensure_mutable()?;
    match ledger.status() {
        AuctionStatus::TradeWindow => Ok(()),
        status => Err(AuctionError::AuctionNotInTradeWindow { status }),
    }
}

/// Distinct teams, non-empty sides, no player listed twice.
pub fn invariant_well_formed(
    initiator: &TeamId,
    counterparty: &TeamId,
    offered: &[PlayerId],
    requested: &[PlayerId],
) -> Result<(), AuctionError> {
    if initiator == counterparty {
        return Err(AuctionError::InvalidTrade(format!(
            "team {initiator} cannot trade with itself"
        )));
    }
    if offered.is_empty() || requested.is_empty() {
        return Err(AuctionError::InvalidTrade(
            "both sides must offer at least one player".into(),
        ));
    }
    let mut seen = HashSet::new();
    for player_id in offered.iter().chain(requested) {
        if !seen.insert(player_id) {
            return Err(AuctionError::InvalidTrade(format!(
                "player {player_id} listed more than once"
            )));
        }
    }
    Ok(())
}

/// The team has executed fewer trades than the cap.
pub fn invariant_trade_cap(ledger: &AuctionLedger, team_id: &TeamId) -> Result<(), AuctionError> {
    let executed = ledger.executed_trades(team_id);
    let max = ledger.config().max_trades_per_team;
    if executed >= max {
        return Err(AuctionError::TradeLimitReached {
            team_id: team_id.to_string(),
            executed,
            max,
        });
    }
    Ok(())
}

/// Every player is currently on `team_id`'s roster, bought or retained.
/// Returns each player with its purchase price.
pub fn owned_players(
    ledger: &AuctionLedger,
    team_id: &TeamId,
    player_ids: &[PlayerId],
) -> Result<Vec<OfferedPlayer>, AuctionError> {
    let team = ledger.team(team_id)?;
    player_ids
        .iter()
        .map(|player_id| {
            let player = ledger.player(player_id)?;
            let owned = matches!(player.status, PlayerStatus::Sold | PlayerStatus::Retained)
                && player.team_id.as_ref() == Some(team_id)
                && team.owns(player_id);
            match (owned, player.purchase_price) {
                (true, Some(price)) => Ok(OfferedPlayer {
                    player_id: player_id.clone(),
                    price,
                }),
                _ => Err(AuctionError::PlayerNotOwned {
                    player_id: player_id.to_string(),
                    team_id: team_id.to_string(),
                }),
            }
        })
        .collect()
}

/// No player is already part of another open trade.
pub fn invariant_not_locked(
    ledger: &AuctionLedger,
    player_ids: &[PlayerId],
    except: Option<&TradeId>,
) -> Result<(), AuctionError> {
    for player_id in player_ids {
        if let Some(trade) = ledger.open_trade_offering(player_id) {
            if Some(&trade.id) != except {
                return Err(AuctionError::PlayerLockedInOtherTrade {
                    player_id: player_id.to_string(),
                    trade_id: trade.id.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Execution-time ownership check: every listed player is still owned by
/// its offering side at the price recorded in the trade.
pub fn invariant_still_owned(ledger: &AuctionLedger, trade: &Trade) -> Result<(), AuctionError> {
    for side in [&trade.initiator, &trade.counterparty] {
        let ids: Vec<PlayerId> = side.players.iter().map(|p| p.player_id.clone()).collect();
        let current = owned_players(ledger, &side.team_id, &ids)
            .map_err(|e| AuctionError::stale(trade.id, e.to_string()))?;
        if current != side.players {
            return Err(AuctionError::stale(
                trade.id,
                format!("prices on team {}'s side changed since proposal", side.team_id),
            ));
        }
    }
    Ok(())
}

/// Squad sizes after the swap stay within the configured maximum.
pub fn invariant_squads_fit(ledger: &AuctionLedger, trade: &Trade) -> Result<(), AuctionError> {
    let max = ledger.config().max_squad_size;
    let gives = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
    for (side, other) in [
        (&trade.initiator, &trade.counterparty),
        (&trade.counterparty, &trade.initiator),
    ] {
        let team = ledger.team(&side.team_id)?;
        let after = team
            .squad_size()
            .saturating_sub(gives(side.players.len()))
            .saturating_add(gives(other.players.len()));
        if after > max {
            return Err(AuctionError::stale(
                trade.id,
                format!("team {} would exceed max squad size {max}", side.team_id),
            ));
        }
    }
    Ok(())
}
