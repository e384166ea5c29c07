//! Splits a **new stake amount** across a zone's validators so that, after the
//! deposit, each validator's share moves toward the zone's aggregate intent.
//!
//! This module is **purely functional**: it computes plans and the outbound
//! instructions that realise them. *It never touches storage.* Persisting
//! delegations and submitting instructions is left to the
//! [`Keeper`](crate::Keeper).
//!
//! Planning flow
//! =============
//! 1. [`calculate_deltas`] – for every validator in the target vector, the gap
//!    between its target share of the current total and what it holds now.
//! 2. [`plan_allocation`] – shifts the gaps so the smallest is zero
//!    ([`shift_deltas`]), fills
//!    them proportionally with up to `amount`, spreads whatever is left evenly,
//!    then truncates every entry and hands the leftover units (**dust**) to the
//!    first validator.
//! 3. [`delegation_messages_for_coins`] – one `Delegate` instruction per
//!    non-zero entry of the plan.
//!
//! Tokenized shares skip the split entirely:
//! [`delegation_messages_for_shares`] redeems each share denomination as-is.
//!
//! Ordering
//! --------
//! Every walk over validators is in **strict ascending validator address**
//! order. The dust recipient is the first validator in that order. Two nodes
//! fed the same inputs therefore produce byte-identical plans.
//!
//! Arithmetic
//! ----------
//! Gaps and fractional shares are carried as [`Dec`] and truncated toward
//! zero. Its 256-bit magnitude covers the whole `u128` range of holdings and
//! amounts. The dust is computed *after* truncating each entry, so
//! `Σ plan == amount` holds exactly.

use std::collections::BTreeMap;

use ics_safe_math::{checked_sum, safe_add, safe_sub, Dec, MathError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coin::Coin;
use crate::error::{Result, StakingError};
use crate::intent::IntentVector;
use crate::msgs::Msg;
use crate::zone::Zone;

/// Token amounts keyed by validator address.
pub type AllocationMap = BTreeMap<String, u128>;

/// Signed gap between a validator's target share and its current holding.
/// Always a whole number of tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delta {
    pub valoper_address: String,
    pub amount: Dec,
}

/// Per-validator amounts for one deposit. The entries always sum to the
/// amount that was planned.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationPlan(AllocationMap);

impl AllocationPlan {
    pub fn get(&self, valoper_address: &str) -> u128 {
        self.0.get(valoper_address).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in ascending validator-address order, zeros included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u128)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn total(&self) -> Result<u128> {
        Ok(checked_sum(self.0.values().copied())?)
    }

    pub fn into_inner(self) -> AllocationMap {
        self.0
    }
}

impl From<AllocationPlan> for AllocationMap {
    fn from(plan: AllocationPlan) -> Self {
        plan.0
    }
}

/// Gap for every validator named by `target`, ascending by address.
///
/// A validator's target is `weight × current_sum`, truncated to an integer.
/// Validators that only appear in `current` are not part of the result.
pub fn calculate_deltas(
    current: &AllocationMap,
    current_sum: u128,
    target: &IntentVector,
) -> Result<Vec<Delta>> {
    let total = Dec::from_u128(current_sum);

    target
        .iter()
        .map(|intent| {
            let target_amount = intent.weight.mul_truncate(total)?.trunc();
            let held = current.get(&intent.valoper_address).copied().unwrap_or(0);
            let amount = target_amount.checked_sub(Dec::from_u128(held))?;
            Ok(Delta {
                valoper_address: intent.valoper_address.clone(),
                amount,
            })
        })
        .collect()
}

/// Shifts every delta by `-min(delta)` so the smallest becomes exactly zero,
/// whether the minimum was negative, zero or positive. Returns the sum of the
/// shifted deltas.
pub fn shift_deltas(deltas: &mut [Delta]) -> Result<Dec> {
    let Some(min_delta) = deltas.iter().map(|d| d.amount).min() else {
        return Ok(Dec::ZERO);
    };
    let mut shifted_sum = Dec::ZERO;
    for delta in deltas.iter_mut() {
        delta.amount = delta.amount.checked_sub(min_delta)?;
        shifted_sum = shifted_sum.checked_add(delta.amount)?;
    }
    Ok(shifted_sum)
}

/// Plans how `amount` new tokens are split across the validators in `target`.
///
/// # Errors
/// * [`StakingError::EmptyAmount`] if `amount` is zero.
/// * [`StakingError::NoTargetValidators`] if `target` is empty.
/// * [`StakingError::Math`] on overflow.
pub fn plan_allocation(
    current: &AllocationMap,
    current_sum: u128,
    target: &IntentVector,
    amount: u128,
) -> Result<AllocationPlan> {
    if amount == 0 {
        return Err(StakingError::EmptyAmount);
    }
    if target.is_empty() {
        return Err(StakingError::NoTargetValidators);
    }

    let mut deltas = calculate_deltas(current, current_sum, target)?;
    // Already ascending from the BTreeMap; make the order explicit.
    deltas.sort_by(|a, b| a.valoper_address.cmp(&b.valoper_address));
    let shifted_sum = shift_deltas(&mut deltas)?;

    let amount_dec = Dec::from_u128(amount);
    let unequal_split = shifted_sum.min(amount_dec);
    let equal_split = amount_dec.checked_sub(unequal_split)?;

    let mut shares: Vec<(String, Dec)> = Vec::with_capacity(deltas.len());
    for delta in deltas {
        let share = if shifted_sum.is_zero() {
            Dec::ZERO
        } else {
            delta
                .amount
                .quo_truncate(shifted_sum)?
                .mul_truncate(unequal_split)?
        };
        shares.push((delta.valoper_address, share));
    }

    if equal_split.is_positive() {
        let count = u128::try_from(shares.len()).map_err(|_| MathError::ConversionError)?;
        let each = equal_split.quo_int(count)?;
        for (_, share) in shares.iter_mut() {
            *share = share.checked_add(each)?;
        }
    }

    let mut plan = AllocationMap::new();
    let mut allocated = 0u128;
    for (valoper, share) in shares {
        let units = share.to_u128()?;
        allocated = safe_add(allocated, units)?;
        plan.insert(valoper, units);
    }

    let dust = safe_sub(amount, allocated)?;
    if let Some((first, units)) = plan.iter_mut().next() {
        *units = safe_add(*units, dust)?;
        debug!(
            validator = %first,
            dust,
            %unequal_split,
            %equal_split,
            "allocation dust assigned"
        );
    }

    Ok(AllocationPlan(plan))
}

/// One `Delegate` instruction per non-zero plan entry, in plan order.
pub fn delegation_messages_for_coins(zone: &Zone, plan: &AllocationPlan) -> Vec<Msg> {
    plan.iter()
        .filter(|(_, units)| *units > 0)
        .map(|(valoper, units)| Msg::Delegate {
            delegator_address: zone.delegation_address.address.clone(),
            validator_address: valoper.to_string(),
            amount: Coin::new(zone.base_denom.clone(), units),
        })
        .collect()
}

/// One `RedeemTokensForShares` instruction per non-zero coin, ascending by
/// denom.
pub fn delegation_messages_for_shares(zone: &Zone, coins: &[Coin]) -> Vec<Msg> {
    let mut coins: Vec<&Coin> = coins.iter().filter(|coin| !coin.is_zero()).collect();
    coins.sort_by(|a, b| a.denom.cmp(&b.denom));

    coins
        .into_iter()
        .map(|coin| Msg::RedeemTokensForShares {
            delegator_address: zone.delegation_address.address.clone(),
            amount: coin.clone(),
        })
        .collect()
}
