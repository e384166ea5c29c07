use borsh::{BorshDeserialize, BorshSerialize};
use ics_safe_math::Dec;
use serde::{Deserialize, Serialize};

/// An integer token amount of a single denomination.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Coin {
            denom: denom.into(),
            amount,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

/// A fractional token amount, as reported for accrued rewards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DecCoin {
    pub denom: String,
    pub amount: Dec,
}

impl DecCoin {
    pub fn new(denom: impl Into<String>, amount: Dec) -> Self {
        DecCoin {
            denom: denom.into(),
            amount,
        }
    }
}

/// True when at least one coin carries a positive amount.
pub fn has_positive_amount(coins: &[DecCoin]) -> bool {
    coins.iter().any(|coin| coin.amount.is_positive())
}
