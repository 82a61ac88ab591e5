//! Point-in-time copies of the players and teams an action touches.
//!
//! An undo entry holds the patch captured before the action and the one
//! captured after it. Restoring a patch overwrites exactly those entities.

use serde::{Deserialize, Serialize};
use shared_types::{Player, PlayerId, Team, TeamId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPatch {
    pub players: Vec<Player>,
    pub teams: Vec<Team>,
}

impl LedgerPatch {
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id.clone()).collect()
    }

    pub fn team_ids(&self) -> Vec<TeamId> {
        self.teams.iter().map(|t| t.id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.teams.is_empty()
    }
}
