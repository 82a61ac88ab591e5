//! Bid validation, applied in order before any bid is accepted.

use crate::domain::state::BiddingState;
use ca_01_ledger::AuctionLedger;
use shared_types::{Amount, AuctionError, AuctionStatus, TeamId};

/// Check a bid of `amount` by `team_id` against the standing state.
///
/// Order: phase, self-outbid, squad room, purse headroom, exact amount,
/// amount within the team's maximum permissible bid.
pub fn validate_bid(
    ledger: &AuctionLedger,
    state: &BiddingState,
    team_id: &TeamId,
    amount: Amount,
) -> Result<(), AuctionError> {
    if !state.phase.accepts_bids() || ledger.status() != AuctionStatus::Live {
        return Err(AuctionError::BiddingNotOpen { phase: state.phase });
    }
    let Some(player_id) = state.player_id.as_ref() else {
        return Err(AuctionError::BiddingNotOpen { phase: state.phase });
    };

    if state.highest_bidder.as_ref() == Some(team_id) {
        return Err(AuctionError::AlreadyHighestBidder {
            team_id: team_id.to_string(),
        });
    }

    let config = ledger.config();
    let team = ledger.team(team_id)?;
    if team.squad_size() >= config.max_squad_size {
        return Err(AuctionError::SquadFull {
            team_id: team_id.to_string(),
            max_squad_size: config.max_squad_size,
        });
    }
    let max_permissible = ledger.max_permissible_bid(team);
    if !ledger.can_bid(team) {
        return Err(AuctionError::InsufficientPurse {
            team_id: team_id.to_string(),
            required: config.base_price,
            max_permissible,
        });
    }

    let opening = ledger.player(player_id)?.base_price;
    let expected = config
        .next_valid_bid(state.current_bid, opening)
        .ok_or(AuctionError::InvalidBidAmount {
            expected: state.current_bid.unwrap_or(opening),
            proposed: amount,
        })?;
    if amount != expected {
        return Err(AuctionError::InvalidBidAmount {
            expected,
            proposed: amount,
        });
    }

    if amount > max_permissible {
        return Err(AuctionError::InsufficientPurse {
            team_id: team_id.to_string(),
            required: amount,
            max_permissible,
        });
    }
    Ok(())
}
