//! Shared collaborators and fixtures for the keeper integration tests.

use std::collections::{BTreeMap, BTreeSet};

use ics_safe_math::Dec;
use ics_staking::{
    BalanceLookup, Bech32PrefixValidator, Coin, Delegation, IcaAccount, Keeper, MemStore,
    MessageSubmitter, Msg, Result, StakingError, Validator, Zone,
};

pub const CHAIN_ID: &str = "hub-4";
pub const LOCAL_DENOM: &str = "uqatom";
pub const BASE_DENOM: &str = "uatom";
pub const DELEGATION_ACCOUNT: &str = "cosmos1delegationaccount";

pub const VAL_A: &str = "cosmosvaloper1a";
pub const VAL_B: &str = "cosmosvaloper1b";
pub const VAL_C: &str = "cosmosvaloper1c";
pub const VAL_D: &str = "cosmosvaloper1d";

pub const ALICE: &str = "quick1xalpha";
pub const BOB: &str = "quick1xdelta";
pub const CAROL: &str = "quick1xgamma";

// -----------------------------------------------------------------------------
// Collaborators
// -----------------------------------------------------------------------------

/// Balances keyed by `(address, denom)`; unknown pairs hold zero.
#[derive(Default)]
pub struct MockBank {
    balances: BTreeMap<(String, String), u128>,
    unresolvable: BTreeSet<String>,
}

impl MockBank {
    pub fn with_balance(mut self, address: &str, denom: &str, amount: u128) -> Self {
        self.balances
            .insert((address.to_string(), denom.to_string()), amount);
        self
    }

    pub fn with_unresolvable(mut self, address: &str) -> Self {
        self.unresolvable.insert(address.to_string());
        self
    }
}

impl BalanceLookup for MockBank {
    fn balance(&self, address: &str, denom: &str) -> Result<u128> {
        if self.unresolvable.contains(address) {
            return Err(StakingError::BalanceLookup {
                address: address.to_string(),
                reason: "account not found".into(),
            });
        }
        Ok(self
            .balances
            .get(&(address.to_string(), denom.to_string()))
            .copied()
            .unwrap_or(0))
    }
}

/// Records every submitted transaction, or rejects all of them when built
/// with [`RecordingSubmitter::failing`].
#[derive(Default)]
pub struct RecordingSubmitter {
    pub submitted: Vec<(Vec<Msg>, String, String)>,
    failure: Option<String>,
}

impl RecordingSubmitter {
    pub fn failing(reason: &str) -> Self {
        RecordingSubmitter {
            submitted: Vec::new(),
            failure: Some(reason.to_string()),
        }
    }
}

impl MessageSubmitter for RecordingSubmitter {
    fn submit_tx(&mut self, msgs: Vec<Msg>, account: &IcaAccount, memo: &str) -> Result<()> {
        if let Some(reason) = &self.failure {
            return Err(StakingError::Submission(reason.clone()));
        }
        self.submitted
            .push((msgs, account.address.clone(), memo.to_string()));
        Ok(())
    }
}

pub type TestKeeper = Keeper<MemStore, MockBank, Bech32PrefixValidator, RecordingSubmitter>;

// -----------------------------------------------------------------------------
// Fixtures
// -----------------------------------------------------------------------------

pub fn dec(s: &str) -> Dec {
    s.parse().unwrap()
}

pub fn keeper(bank: MockBank) -> TestKeeper {
    keeper_with_submitter(bank, RecordingSubmitter::default())
}

pub fn keeper_with_submitter(bank: MockBank, submitter: RecordingSubmitter) -> TestKeeper {
    Keeper::new(
        MemStore::new(),
        bank,
        Bech32PrefixValidator::new("quick"),
        submitter,
    )
}

pub fn zone() -> Zone {
    let mut zone = Zone::new(CHAIN_ID, LOCAL_DENOM, BASE_DENOM);
    zone.delegation_address = IcaAccount {
        address: DELEGATION_ACCOUNT.into(),
    };
    zone.validators = [VAL_A, VAL_B, VAL_C, VAL_D]
        .iter()
        .map(|valoper| Validator {
            valoper_address: valoper.to_string(),
            voting_power: 1_000,
            delegator_shares: dec("1000"),
        })
        .collect();
    zone
}

pub fn delegation(validator: &str, amount: u128) -> Delegation {
    Delegation {
        delegation_address: DELEGATION_ACCOUNT.into(),
        validator_address: validator.into(),
        amount: Coin::new(BASE_DENOM, amount),
        height: 100,
        redelegation_end: 0,
    }
}
