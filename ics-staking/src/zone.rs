use borsh::{BorshDeserialize, BorshSerialize};
use ics_safe_math::Dec;
use serde::{Deserialize, Serialize};

use crate::completion::CompletionCounter;
use crate::error::Result;
use crate::intent::IntentVector;

/// An account controlled on the remote chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct IcaAccount {
    pub address: String,
}

/// A remote validator as last reported by the zone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Validator {
    pub valoper_address: String,
    pub voting_power: u128,
    pub delegator_shares: Dec,
}

impl Validator {
    /// Token value of `shares` at the validator's current exchange rate.
    /// A validator with no outstanding shares converts everything to zero.
    pub fn shares_to_tokens(&self, shares: Dec) -> Result<u128> {
        if self.delegator_shares.is_zero() {
            return Ok(0);
        }
        let tokens = shares
            .mul_quo_truncate(Dec::from_u128(self.voting_power), self.delegator_shares)?
            .to_u128()?;
        Ok(tokens)
    }
}

/// The remote chain scope under which delegations and intents are tracked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Zone {
    pub chain_id: String,
    /// Liquid-staked token denom on the host chain.
    pub local_denom: String,
    /// Native staking denom on the remote chain.
    pub base_denom: String,
    pub redemption_rate: Dec,
    pub delegation_address: IcaAccount,
    #[serde(default)]
    pub validators: Vec<Validator>,
    /// Normalized zone-wide target, replaced wholesale by each aggregation.
    #[serde(default)]
    pub aggregate_intent: IntentVector,
    /// Outstanding reward withdrawals awaiting acknowledgement.
    #[serde(default)]
    pub withdrawal_waitgroup: CompletionCounter,
}

impl Zone {
    pub fn new(
        chain_id: impl Into<String>,
        local_denom: impl Into<String>,
        base_denom: impl Into<String>,
    ) -> Self {
        Zone {
            chain_id: chain_id.into(),
            local_denom: local_denom.into(),
            base_denom: base_denom.into(),
            redemption_rate: Dec::ONE,
            delegation_address: IcaAccount::default(),
            validators: Vec::new(),
            aggregate_intent: IntentVector::new(),
            withdrawal_waitgroup: CompletionCounter::default(),
        }
    }

    pub fn validator(&self, valoper_address: &str) -> Option<&Validator> {
        self.validators
            .iter()
            .find(|v| v.valoper_address == valoper_address)
    }

    pub fn is_validator(&self, valoper_address: &str) -> bool {
        self.validator(valoper_address).is_some()
    }

    /// The stored aggregate intent, or an equal split across every known
    /// validator when no depositor has expressed one yet.
    pub fn aggregate_intent_or_default(&self) -> Result<IntentVector> {
        if !self.aggregate_intent.is_empty() {
            return Ok(self.aggregate_intent.clone());
        }
        IntentVector::equal_weights(self.validators.iter().map(|v| v.valoper_address.as_str()))
    }
}
