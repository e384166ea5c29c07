//! Outstanding-operation counter for batches of asynchronously acknowledged
//! per-validator operations.
//!
//! A batch increments the zone's counter by the number of instructions it
//! emits; every acknowledgement decrements it by one. Reaching zero is the
//! signal for whatever continuation is waiting on the batch. There is no
//! expiry: an acknowledgement that never arrives keeps the counter above
//! zero until an operator intervenes.

use borsh::{BorshDeserialize, BorshSerialize};
use ics_safe_math::MathError;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::coin::{has_positive_amount, DecCoin};
use crate::delegation::Delegation;
use crate::error::{Result, StakingError};
use crate::msgs::Msg;
use crate::zone::Zone;

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(transparent)]
pub struct CompletionCounter(u32);

impl CompletionCounter {
    pub const fn new(pending: u32) -> Self {
        CompletionCounter(pending)
    }

    pub const fn pending(self) -> u32 {
        self.0
    }

    pub const fn is_complete(self) -> bool {
        self.0 == 0
    }

    /// Registers `count` more outstanding operations.
    pub fn add(&mut self, count: usize) -> Result<u32> {
        let count = u32::try_from(count).map_err(|_| MathError::ConversionError)?;
        self.0 = self.0.checked_add(count).ok_or(MathError::AdditionOverflow)?;
        Ok(self.0)
    }

    /// Retires one operation. `None` if nothing was outstanding.
    pub fn acknowledge(&mut self) -> Option<u32> {
        self.0 = self.0.checked_sub(1)?;
        Some(self.0)
    }
}

/// Rewards accrued by one delegator with one validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationReward {
    pub validator_address: String,
    pub reward: Vec<DecCoin>,
}

/// Decoded reply to a delegator-total-rewards query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatorRewards {
    pub rewards: Vec<DelegationReward>,
    #[serde(default)]
    pub total: Vec<DecCoin>,
}

impl DelegatorRewards {
    /// Rewards owed by `validator`, empty if the reply does not mention it.
    pub fn for_validator(&self, validator: &str) -> &[DecCoin] {
        self.rewards
            .iter()
            .find(|r| r.validator_address == validator)
            .map(|r| r.reward.as_slice())
            .unwrap_or(&[])
    }
}

/// One withdrawal instruction for every delegation that has a non-zero
/// reward in `rewards`.
pub fn withdrawal_messages<'a, I>(delegations: I, rewards: &DelegatorRewards) -> Vec<Msg>
where
    I: IntoIterator<Item = &'a Delegation>,
{
    let mut msgs = Vec::new();
    for delegation in delegations {
        let amount = rewards.for_validator(&delegation.validator_address);
        info!(
            delegator = %delegation.delegation_address,
            validator = %delegation.validator_address,
            coins = amount.len(),
            "Withdraw rewards"
        );
        if has_positive_amount(amount) {
            msgs.push(Msg::WithdrawDelegatorReward {
                delegator_address: delegation.delegation_address.clone(),
                validator_address: delegation.validator_address.clone(),
            });
        }
    }
    msgs
}

/// Adds one outstanding operation per instruction in `msgs` to the zone's
/// counter. An empty batch leaves the counter untouched.
pub fn dispatch_batch(zone: &mut Zone, msgs: &[Msg]) -> Result<u32> {
    if msgs.is_empty() {
        return Ok(zone.withdrawal_waitgroup.pending());
    }
    let pending = zone.withdrawal_waitgroup.add(msgs.len())?;
    info!(
        chain_id = %zone.chain_id,
        dispatched = msgs.len(),
        pending,
        "dispatched batch"
    );
    Ok(pending)
}

/// Retires one outstanding operation for the zone.
pub fn acknowledge(zone: &mut Zone) -> Result<u32> {
    let pending = zone.withdrawal_waitgroup.acknowledge().ok_or_else(|| {
        StakingError::UnexpectedAcknowledgement {
            chain_id: zone.chain_id.clone(),
        }
    })?;
    info!(chain_id = %zone.chain_id, pending, "acknowledged batch operation");
    Ok(pending)
}
