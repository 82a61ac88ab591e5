//! # Settlement
//!
//! Purse payment that balances two unequal sides of a trade. The side that
//! offers less value pays the difference.

use serde::{Deserialize, Serialize};
use shared_types::{Amount, SettlementDirection};

/// Settlement amount and direction for the two side totals.
///
/// Equal values settle at zero with `CounterpartyPays`.
pub fn compute_settlement(
    initiator_value: Amount,
    counterparty_value: Amount,
) -> (Amount, SettlementDirection) {
    let amount = initiator_value.abs_diff(counterparty_value);
    let direction = if initiator_value < counterparty_value {
        SettlementDirection::InitiatorPays
    } else {
        SettlementDirection::CounterpartyPays
    };
    (amount, direction)
}

/// What actually moves between purses at execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementTransfer {
    pub owed: Amount,
    pub transferred: Amount,
}

impl SettlementTransfer {
    /// Cap `owed` at what the payer has left. With settlement disabled
    /// nothing is owed.
    pub fn plan(owed: Amount, payer_purse: Amount, enabled: bool) -> Self {
        if !enabled {
            return Self {
                owed: 0,
                transferred: 0,
            };
        }
        Self {
            owed,
            transferred: owed.min(payer_purse),
        }
    }

    /// Amount the payer could not cover.
    pub fn shortfall(&self) -> Amount {
        self.owed.saturating_sub(self.transferred)
    }
}
