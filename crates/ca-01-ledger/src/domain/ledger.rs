//! # Auction Ledger
//!
//! The single source of truth for one auction: its header, teams, player
//! pool and trades. Every mutation of purses, rosters and player status goes
//! through this aggregate, which is owned by exactly one auction actor.
//!
//! ## Invariants
//!
//! | Invariant | Enforced by |
//! |-----------|-------------|
//! | Status moves forward only (except `paused -> live`) | `transition_status` |
//! | Nothing changes after `finalized` | `ensure_mutable` |
//! | `purse_remaining = purse_value - roster_value + trade_adjustment` | `record_sale`, `release_player`, `verify_invariants` |
//! | Squad size never exceeds `max_squad_size` | `record_sale`, `verify_invariants` |
//! | Each owned player is on exactly one roster | `verify_invariants` |

use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::patch::LedgerPatch;
use crate::domain::seed::AuctionSeed;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{
    Actor, Amount, Auction, AuctionConfig, AuctionError, AuctionId, AuctionSnapshot,
    AuctionStatus, BiddingView, Player, PlayerId, PlayerStatus, PoolCounts, PoolSummary, Role,
    RosterEntry, Team, TeamId, TeamPrivateView, TeamSummary, TimestampMs, Trade, TradeId,
    TradeStatus,
};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionLedger {
    auction: Auction,
    teams: Vec<Team>,
    players: Vec<Player>,
    trades: Vec<Trade>,
    audit_seq: u64,
    /// Records produced since the last commit.
    #[serde(skip)]
    pending_audit: Vec<AuditRecord>,
}

impl AuctionLedger {
    /// Load an auction at pool-load time.
    pub fn from_seed(seed: AuctionSeed) -> Result<Self, AuctionError> {
        seed.config.validate()?;

        let mut seen = HashSet::new();
        let mut teams = Vec::with_capacity(seed.teams.len());
        for team in seed.teams {
            if !seen.insert(team.id.to_string()) {
                return Err(AuctionError::InvalidConfig {
                    reason: format!("duplicate team id {}", team.id),
                });
            }
            let purse = team.purse_value.unwrap_or(seed.config.purse_value);
            teams.push(Team {
                id: team.id,
                name: team.name,
                short_code: team.short_code,
                purse_value: purse,
                purse_remaining: purse,
                roster: Vec::new(),
                trade_adjustment: 0,
            });
        }

        let mut seen = HashSet::new();
        let mut players = Vec::with_capacity(seed.players.len());
        for player in seed.players {
            if !seen.insert(player.id.to_string()) {
                return Err(AuctionError::InvalidConfig {
                    reason: format!("duplicate player id {}", player.id),
                });
            }
            let mut loaded = Player {
                id: player.id,
                name: player.name,
                role: player.role,
                base_price: player.base_price.unwrap_or(seed.config.base_price),
                status: PlayerStatus::Pool,
                team_id: None,
                purchase_price: None,
                times_offered: 0,
            };

            match player.status {
                PlayerStatus::Pool | PlayerStatus::Ineligible => loaded.status = player.status,
                PlayerStatus::Retained => {
                    let (Some(team_id), Some(price)) = (player.team_id, player.price) else {
                        return Err(AuctionError::InvalidConfig {
                            reason: format!("retained player {} needs team_id and price", loaded.id),
                        });
                    };
                    let team = teams
                        .iter_mut()
                        .find(|t| t.id == team_id)
                        .ok_or_else(|| AuctionError::TeamNotFound(team_id.to_string()))?;
                    if team.purse_remaining < price
                        || team.squad_size() >= seed.config.max_squad_size
                    {
                        return Err(AuctionError::InvalidConfig {
                            reason: format!("team {team_id} cannot retain player {}", loaded.id),
                        });
                    }
                    team.purse_remaining -= price;
                    team.roster.push(RosterEntry {
                        player_id: loaded.id.clone(),
                        price,
                    });
                    loaded.status = PlayerStatus::Retained;
                    loaded.team_id = Some(team_id);
                    loaded.purchase_price = Some(price);
                }
                other => {
                    return Err(AuctionError::InvalidConfig {
                        reason: format!("player {} cannot be loaded as {other}", loaded.id),
                    });
                }
            }
            players.push(loaded);
        }

        Ok(Self {
            auction: Auction {
                id: seed.id,
                name: seed.name,
                status: AuctionStatus::Setup,
                config: seed.config,
                current_round: 1,
                trade_window_expires_at: None,
            },
            teams,
            players,
            trades: Vec::new(),
            audit_seq: 0,
            pending_audit: Vec::new(),
        })
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn id(&self) -> &AuctionId {
        &self.auction.id
    }

    pub fn auction(&self) -> &Auction {
        &self.auction
    }

    pub fn auction_mut(&mut self) -> &mut Auction {
        &mut self.auction
    }

    pub fn config(&self) -> &AuctionConfig {
        &self.auction.config
    }

    pub fn status(&self) -> AuctionStatus {
        self.auction.status
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn team(&self, team_id: &TeamId) -> Result<&Team, AuctionError> {
        self.teams
            .iter()
            .find(|t| &t.id == team_id)
            .ok_or_else(|| AuctionError::TeamNotFound(team_id.to_string()))
    }

    pub fn team_mut(&mut self, team_id: &TeamId) -> Result<&mut Team, AuctionError> {
        self.teams
            .iter_mut()
            .find(|t| &t.id == team_id)
            .ok_or_else(|| AuctionError::TeamNotFound(team_id.to_string()))
    }

    pub fn player(&self, player_id: &PlayerId) -> Result<&Player, AuctionError> {
        self.players
            .iter()
            .find(|p| &p.id == player_id)
            .ok_or_else(|| AuctionError::PlayerNotFound(player_id.to_string()))
    }

    pub fn player_mut(&mut self, player_id: &PlayerId) -> Result<&mut Player, AuctionError> {
        self.players
            .iter_mut()
            .find(|p| &p.id == player_id)
            .ok_or_else(|| AuctionError::PlayerNotFound(player_id.to_string()))
    }

    pub fn trade(&self, trade_id: &TradeId) -> Result<&Trade, AuctionError> {
        self.trades
            .iter()
            .find(|t| &t.id == trade_id)
            .ok_or_else(|| AuctionError::TradeNotFound(trade_id.to_string()))
    }

    pub fn trade_mut(&mut self, trade_id: &TradeId) -> Result<&mut Trade, AuctionError> {
        self.trades
            .iter_mut()
            .find(|t| &t.id == trade_id)
            .ok_or_else(|| AuctionError::TradeNotFound(trade_id.to_string()))
    }

    pub fn trades_mut(&mut self) -> impl Iterator<Item = &mut Trade> {
        self.trades.iter_mut()
    }

    pub fn push_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    // =========================================================================
    // STATUS
    // =========================================================================

    /// Fail with `AuctionFinalized` once the auction is finalized.
    pub fn ensure_mutable(&self) -> Result<(), AuctionError> {
        if self.auction.status.is_mutable() {
            Ok(())
        } else {
            Err(AuctionError::AuctionFinalized)
        }
    }

    /// Move the auction to `next`, recording an audit entry.
    pub fn transition_status(
        &mut self,
        next: AuctionStatus,
        actor: &Actor,
        now: TimestampMs,
    ) -> Result<AuctionStatus, AuctionError> {
        self.ensure_mutable()?;
        let from = self.auction.status;
        if !from.can_transition_to(next) {
            return Err(AuctionError::invalid_transition(from, next));
        }

        self.auction.status = next;
        if next != AuctionStatus::TradeWindow {
            self.auction.trade_window_expires_at = None;
        }
        self.record_audit(
            actor,
            now,
            AuditAction::StatusChanged,
            Value::from(from.as_str()),
            Value::from(next.as_str()),
            None,
        );
        Ok(from)
    }

    // =========================================================================
    // PURSE RULES
    // =========================================================================

    /// Highest bid `team` can place and still afford the base price for every
    /// slot it must fill to reach the minimum squad.
    pub fn max_permissible_bid(&self, team: &Team) -> Amount {
        let config = self.config();
        let after_this_player = team.squad_size().saturating_add(1);
        let slots_to_reserve = config.min_squad_size.saturating_sub(after_this_player);
        let reserve = config.base_price.saturating_mul(u64::from(slots_to_reserve));
        team.purse_remaining.saturating_sub(reserve)
    }

    /// Whether `team` may bid at all: squad not full and enough purse for at
    /// least the base price of a future player.
    pub fn can_bid(&self, team: &Team) -> bool {
        team.squad_size() < self.config().max_squad_size
            && self.max_permissible_bid(team) >= self.config().base_price
    }

    /// Executed trades `team_id` has been party to.
    pub fn executed_trades(&self, team_id: &TeamId) -> u32 {
        let count = self
            .trades
            .iter()
            .filter(|t| t.status == TradeStatus::Executed && t.involves(team_id))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Open trade that already offers `player_id`, if any.
    pub fn open_trade_offering(&self, player_id: &PlayerId) -> Option<&Trade> {
        self.trades.iter().find(|t| {
            t.status.is_open() && (t.initiator.offers(player_id) || t.counterparty.offers(player_id))
        })
    }

    // =========================================================================
    // ROSTER MUTATIONS
    // =========================================================================

    /// Attach `player_id` to `team_id` at `price`: player becomes sold, the
    /// purse is debited and the roster grows by one. Checks first, then
    /// mutates, so a failure leaves the ledger untouched.
    pub fn record_sale(
        &mut self,
        player_id: &PlayerId,
        team_id: &TeamId,
        price: Amount,
    ) -> Result<(), AuctionError> {
        let max_squad_size = self.config().max_squad_size;
        self.player(player_id)?;
        let team = self.team(team_id)?;
        if team.squad_size() >= max_squad_size {
            return Err(AuctionError::SquadFull {
                team_id: team_id.to_string(),
                max_squad_size,
            });
        }
        if team.purse_remaining < price {
            return Err(AuctionError::InsufficientPurse {
                team_id: team_id.to_string(),
                required: price,
                max_permissible: team.purse_remaining,
            });
        }

        let team = self.team_mut(team_id)?;
        team.purse_remaining -= price;
        team.roster.push(RosterEntry {
            player_id: player_id.clone(),
            price,
        });

        let player = self.player_mut(player_id)?;
        player.status = PlayerStatus::Sold;
        player.team_id = Some(team_id.clone());
        player.purchase_price = Some(price);
        Ok(())
    }

    /// Detach an owned player from its team and refund the purchase price.
    /// Returns the previous owner and price; a no-op for unowned players.
    pub fn release_player(
        &mut self,
        player_id: &PlayerId,
    ) -> Result<Option<(TeamId, Amount)>, AuctionError> {
        let player = self.player(player_id)?;
        let Some(team_id) = player.team_id.clone() else {
            return Ok(None);
        };

        let team = self.team_mut(&team_id)?;
        let Some(index) = team.roster.iter().position(|e| &e.player_id == player_id) else {
            return Err(AuctionError::PlayerNotOwned {
                player_id: player_id.to_string(),
                team_id: team_id.to_string(),
            });
        };
        let entry = team.roster.remove(index);
        team.purse_remaining = team.purse_remaining.saturating_add(entry.price);

        let player = self.player_mut(player_id)?;
        player.team_id = None;
        player.purchase_price = None;
        Ok(Some((team_id, entry.price)))
    }

    /// Move an owned player's roster entry to `to`, keeping its price.
    /// Purses are untouched; callers settle and rebalance separately.
    pub fn move_player(&mut self, player_id: &PlayerId, to: &TeamId) -> Result<(), AuctionError> {
        self.team(to)?;
        let from = self
            .player(player_id)?
            .team_id
            .clone()
            .ok_or_else(|| AuctionError::PlayerNotOwned {
                player_id: player_id.to_string(),
                team_id: to.to_string(),
            })?;

        let source = self.team_mut(&from)?;
        let index = source
            .roster
            .iter()
            .position(|e| &e.player_id == player_id)
            .ok_or_else(|| AuctionError::PlayerNotOwned {
                player_id: player_id.to_string(),
                team_id: from.to_string(),
            })?;
        let entry = source.roster.remove(index);
        self.team_mut(to)?.roster.push(entry);
        self.player_mut(player_id)?.team_id = Some(to.clone());
        Ok(())
    }

    /// Recompute a team's trade adjustment so the purse identity holds
    /// after roster moves and settlements.
    pub fn rebalance_trade_adjustment(&mut self, team_id: &TeamId) -> Result<(), AuctionError> {
        let team = self.team_mut(team_id)?;
        let purse = i128::from(team.purse_remaining);
        let roster = i128::from(team.roster_value());
        let value = i128::from(team.purse_value);
        team.trade_adjustment = i64::try_from(purse + roster - value).map_err(|_| {
            AuctionError::InvalidTrade(format!("trade adjustment for {team_id} out of range"))
        })?;
        Ok(())
    }

    // =========================================================================
    // POOL
    // =========================================================================

    /// First player still waiting in the pool, in pool order.
    pub fn next_pool_player(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.status.is_selectable())
    }

    /// Move a player to the end of the pool order.
    pub fn send_to_back(&mut self, player_id: &PlayerId) -> Result<(), AuctionError> {
        let index = self
            .players
            .iter()
            .position(|p| &p.id == player_id)
            .ok_or_else(|| AuctionError::PlayerNotFound(player_id.to_string()))?;
        let player = self.players.remove(index);
        self.players.push(player);
        Ok(())
    }

    /// Whether an unsold player may be offered again.
    pub fn is_reofferable(&self, player: &Player) -> bool {
        player.status == PlayerStatus::Unsold
            && self
                .config()
                .max_offers_per_player
                .map_or(true, |max| player.times_offered < max)
    }

    /// Begin the next round if one remains: every re-offerable unsold player
    /// returns to the pool. Returns the returned players, or `PoolExhausted`.
    pub fn start_next_round(&mut self) -> Result<Vec<PlayerId>, AuctionError> {
        let round = self.auction.current_round;
        if round >= self.config().max_rounds {
            return Err(AuctionError::PoolExhausted { round });
        }

        let returned: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| self.is_reofferable(p))
            .map(|p| p.id.clone())
            .collect();
        if returned.is_empty() {
            return Err(AuctionError::PoolExhausted { round });
        }

        for player in self.players.iter_mut() {
            if returned.contains(&player.id) {
                player.status = PlayerStatus::Pool;
            }
        }
        self.auction.current_round = round + 1;
        Ok(returned)
    }

    // =========================================================================
    // PATCHES (undo / redo)
    // =========================================================================

    /// Copy the current state of the given players and teams.
    pub fn capture(&self, player_ids: &[PlayerId], team_ids: &[TeamId]) -> LedgerPatch {
        LedgerPatch {
            players: self
                .players
                .iter()
                .filter(|p| player_ids.contains(&p.id))
                .cloned()
                .collect(),
            teams: self
                .teams
                .iter()
                .filter(|t| team_ids.contains(&t.id))
                .cloned()
                .collect(),
        }
    }

    /// Whether every entity in `patch` currently equals its copy.
    pub fn is_current(&self, patch: &LedgerPatch) -> bool {
        self.capture(&patch.player_ids(), &patch.team_ids()) == *patch
    }

    /// Overwrite the entities named in `patch` with its copies.
    pub fn restore(&mut self, patch: &LedgerPatch) -> Result<(), AuctionError> {
        for player in &patch.players {
            *self.player_mut(&player.id)? = player.clone();
        }
        for team in &patch.teams {
            *self.team_mut(&team.id)? = team.clone();
        }
        Ok(())
    }

    // =========================================================================
    // AUDIT
    // =========================================================================

    /// Append an audit record; it is handed to the store with the next commit.
    pub fn record_audit(
        &mut self,
        actor: &Actor,
        at: TimestampMs,
        action: AuditAction,
        before: Value,
        after: Value,
        compensates: Option<u64>,
    ) -> u64 {
        self.audit_seq += 1;
        self.pending_audit.push(AuditRecord {
            id: self.audit_seq,
            auction_id: self.auction.id.clone(),
            actor: actor.clone(),
            at,
            action,
            before,
            after,
            compensates,
        });
        self.audit_seq
    }

    /// Records produced since the last call.
    pub fn take_pending_audit(&mut self) -> Vec<AuditRecord> {
        std::mem::take(&mut self.pending_audit)
    }

    pub fn pending_audit(&self) -> &[AuditRecord] {
        &self.pending_audit
    }

    // =========================================================================
    // INVARIANTS
    // =========================================================================

    /// Check every cross-entity invariant. A violation means a transition
    /// applied only part of its effect; the staged state must be discarded.
    pub fn verify_invariants(&self) -> Result<(), String> {
        let max_squad_size = self.config().max_squad_size;
        let mut owner_of: HashMap<&PlayerId, &TeamId> = HashMap::new();

        for team in &self.teams {
            if !team.purse_balances() {
                return Err(format!(
                    "team {} purse {} does not match roster value {} and adjustment {}",
                    team.id,
                    team.purse_remaining,
                    team.roster_value(),
                    team.trade_adjustment
                ));
            }
            if team.squad_size() > max_squad_size {
                return Err(format!("team {} exceeds max squad size", team.id));
            }
            for entry in &team.roster {
                if owner_of.insert(&entry.player_id, &team.id).is_some() {
                    return Err(format!("player {} is on two rosters", entry.player_id));
                }
                let player = self.player(&entry.player_id).map_err(|e| e.to_string())?;
                if player.team_id.as_ref() != Some(&team.id)
                    || player.purchase_price != Some(entry.price)
                {
                    return Err(format!(
                        "roster entry for {} disagrees with the player record",
                        player.id
                    ));
                }
            }
        }

        for player in &self.players {
            let owned = matches!(player.status, PlayerStatus::Sold | PlayerStatus::Retained);
            if owned != owner_of.contains_key(&player.id) {
                return Err(format!(
                    "player {} is {} but roster membership disagrees",
                    player.id, player.status
                ));
            }
        }
        Ok(())
    }

    // =========================================================================
    // VIEWS
    // =========================================================================

    pub fn team_summary(&self, team: &Team) -> TeamSummary {
        TeamSummary {
            id: team.id.clone(),
            name: team.name.clone(),
            short_code: team.short_code.clone(),
            purse_value: team.purse_value,
            purse_remaining: team.purse_remaining,
            squad_size: team.squad_size(),
            roster: team.roster.clone(),
            executed_trades: self.executed_trades(&team.id),
        }
    }

    pub fn team_summaries(&self, team_ids: &[&TeamId]) -> Vec<TeamSummary> {
        self.teams
            .iter()
            .filter(|t| team_ids.contains(&&t.id))
            .map(|t| self.team_summary(t))
            .collect()
    }

    pub fn private_view(&self, team_id: &TeamId) -> Result<TeamPrivateView, AuctionError> {
        let team = self.team(team_id)?;
        let config = self.config();
        let executed = self.executed_trades(team_id);
        Ok(TeamPrivateView {
            team_id: team.id.clone(),
            purse_remaining: team.purse_remaining,
            squad_size: team.squad_size(),
            slots_remaining: config.max_squad_size.saturating_sub(team.squad_size()),
            max_permissible_bid: self.max_permissible_bid(team),
            can_bid: self.can_bid(team),
            executed_trades: executed,
            trades_remaining: config.max_trades_per_team.saturating_sub(executed),
        })
    }

    /// Full snapshot narrowed to one viewer.
    pub fn snapshot_for(
        &self,
        role: Role,
        team: Option<&TeamId>,
        bidding: BiddingView,
        sequence: u64,
    ) -> AuctionSnapshot {
        let current_player = bidding
            .player_id
            .as_ref()
            .and_then(|id| self.player(id).ok())
            .cloned();

        let private = match (role, team) {
            (Role::Team, Some(team_id)) => self.private_view(team_id).ok(),
            _ => None,
        };

        AuctionSnapshot {
            auction_id: self.auction.id.clone(),
            name: self.auction.name.clone(),
            status: self.auction.status,
            current_round: self.auction.current_round,
            trade_window_expires_at: self.auction.trade_window_expires_at,
            config: self.auction.config.clone(),
            bidding,
            current_player,
            teams: self.teams.iter().map(|t| self.team_summary(t)).collect(),
            pool: PoolSummary {
                counts: PoolCounts::tally(&self.players),
                players: self.players.clone(),
            },
            trades: self.trades.clone(),
            private,
            sequence,
        }
        .for_viewer(role, team)
    }
}
