//! Outbound instructions handed to the [`MessageSubmitter`](crate::MessageSubmitter).
//!
//! The core only decides *what* to send; encoding and relaying to the remote
//! chain belong to the submitter.

use serde::{Deserialize, Serialize};

use crate::coin::Coin;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Msg {
    /// Delegate `amount` from the zone's delegation account to a validator.
    Delegate {
        delegator_address: String,
        validator_address: String,
        amount: Coin,
    },
    /// Convert tokenized shares back into a native delegation.
    RedeemTokensForShares {
        delegator_address: String,
        amount: Coin,
    },
    /// Withdraw accrued rewards for one delegator/validator pair.
    WithdrawDelegatorReward {
        delegator_address: String,
        validator_address: String,
    },
}

impl Msg {
    pub fn validator_address(&self) -> Option<&str> {
        match self {
            Msg::Delegate {
                validator_address, ..
            }
            | Msg::WithdrawDelegatorReward {
                validator_address, ..
            } => Some(validator_address),
            Msg::RedeemTokensForShares { .. } => None,
        }
    }
}
