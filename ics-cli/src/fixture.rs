//! Zone-state fixtures: a JSON snapshot of zones, intents, delegations and
//! balances that is loaded into an in-memory [`Keeper`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ics_staking::{
    BalanceLookup, Bech32PrefixValidator, Delegation, DelegatorIntent, IcaAccount, Keeper,
    MemStore, MessageSubmitter, Msg, StakingError, Zone,
};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub intents: Vec<ZoneIntent>,
    #[serde(default)]
    pub delegations: Vec<ZoneDelegation>,
    #[serde(default)]
    pub balances: Vec<Balance>,
}

#[derive(Debug, Deserialize)]
pub struct ZoneIntent {
    pub chain_id: String,
    #[serde(default)]
    pub snapshot: bool,
    pub intent: DelegatorIntent,
}

#[derive(Debug, Deserialize)]
pub struct ZoneDelegation {
    pub chain_id: String,
    pub delegation: Delegation,
}

#[derive(Debug, Deserialize)]
pub struct Balance {
    pub address: String,
    pub denom: String,
    pub amount: u128,
}

/// Balances read from the fixture. Accounts it does not list hold nothing.
#[derive(Debug, Default)]
pub struct FixtureBank {
    balances: BTreeMap<(String, String), u128>,
}

impl BalanceLookup for FixtureBank {
    fn balance(&self, address: &str, denom: &str) -> ics_staking::Result<u128> {
        Ok(self
            .balances
            .get(&(address.to_string(), denom.to_string()))
            .copied()
            .unwrap_or(0))
    }
}

/// Keeps submitted batches so they can be printed instead of relayed.
#[derive(Debug, Default)]
pub struct CapturingSubmitter {
    pub batches: Vec<Vec<Msg>>,
}

impl MessageSubmitter for CapturingSubmitter {
    fn submit_tx(&mut self, msgs: Vec<Msg>, account: &IcaAccount, memo: &str) -> ics_staking::Result<()> {
        if account.address.is_empty() {
            return Err(StakingError::Submission(
                "zone has no delegation account".into(),
            ));
        }
        info!(account = %account.address, memo, msgs = msgs.len(), "captured tx");
        self.batches.push(msgs);
        Ok(())
    }
}

pub type FixtureKeeper = Keeper<MemStore, FixtureBank, Bech32PrefixValidator, CapturingSubmitter>;

impl Fixture {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading state fixture {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing state fixture {}", path.display()))
    }

    /// Writes every record into a fresh store and wraps it in a keeper.
    pub fn into_keeper(self, hrp: &str) -> Result<FixtureKeeper> {
        let bank = FixtureBank {
            balances: self
                .balances
                .into_iter()
                .map(|b| ((b.address, b.denom), b.amount))
                .collect(),
        };
        let mut keeper = Keeper::new(
            MemStore::new(),
            bank,
            Bech32PrefixValidator::new(hrp),
            CapturingSubmitter::default(),
        );

        for zone in &self.zones {
            keeper.set_zone(zone)?;
        }
        for entry in &self.intents {
            let zone = keeper.zone(&entry.chain_id)?;
            keeper.set_intent(&zone, &entry.intent, entry.snapshot)?;
        }
        for entry in &self.delegations {
            let zone = keeper.zone(&entry.chain_id)?;
            keeper.set_delegation(&zone, &entry.delegation)?;
        }

        debug!(
            zones = self.zones.len(),
            intents = self.intents.len(),
            delegations = self.delegations.len(),
            records = keeper.store().len(),
            "loaded fixture"
        );
        Ok(keeper)
    }
}
