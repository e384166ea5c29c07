use borsh::{BorshDeserialize, BorshSerialize};
use ics_safe_math::safe_add;
use serde::{Deserialize, Serialize};

use crate::allocation::AllocationMap;
use crate::coin::Coin;
use crate::error::Result;

/// A delegation held by one of the zone's accounts with a remote validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Delegation {
    pub delegation_address: String,
    pub validator_address: String,
    pub amount: Coin,
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub redelegation_end: i64,
}

/// Sums delegation amounts per validator. Returns the per-validator map and
/// the grand total.
pub fn delegation_map<'a, I>(delegations: I) -> Result<(AllocationMap, u128)>
where
    I: IntoIterator<Item = &'a Delegation>,
{
    let mut out = AllocationMap::new();
    let mut sum = 0u128;

    for delegation in delegations {
        let entry = out
            .entry(delegation.validator_address.clone())
            .or_insert(0u128);
        *entry = safe_add(*entry, delegation.amount.amount)?;
        sum = safe_add(sum, delegation.amount.amount)?;
    }

    Ok((out, sum))
}
