//! Depositor voting intent: weighted preferences over validators.
//!
//! An [`IntentVector`] is normally *normalized* (weights sum to one). It is
//! *ordinalized* by multiplying every weight by a value amount (a balance or
//! a deposit) so that vectors owned by different depositors become directly
//! comparable and can be summed.
//!
//! The vector is keyed by validator address in a `BTreeMap`, so every walk
//! over it is in ascending address order regardless of insertion history.

use std::collections::BTreeMap;
use std::io;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use ics_safe_math::Dec;
use serde::{Deserialize, Serialize};

use crate::coin::Coin;
use crate::error::{Result, StakingError};

/// Decoding goes through [`ValidatorIntent::new`], so a stored or loaded
/// intent never carries a negative weight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(try_from = "UncheckedIntent")]
pub struct ValidatorIntent {
    pub valoper_address: String,
    pub weight: Dec,
}

#[derive(Deserialize, BorshDeserialize)]
struct UncheckedIntent {
    valoper_address: String,
    weight: Dec,
}

impl TryFrom<UncheckedIntent> for ValidatorIntent {
    type Error = StakingError;

    fn try_from(raw: UncheckedIntent) -> Result<Self> {
        ValidatorIntent::new(raw.valoper_address, raw.weight)
    }
}

impl BorshDeserialize for ValidatorIntent {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        let raw = UncheckedIntent::deserialize_reader(reader)?;
        ValidatorIntent::try_from(raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl ValidatorIntent {
    /// Fails with [`StakingError::InvalidIntent`] on a negative weight.
    pub fn new(valoper_address: impl Into<String>, weight: Dec) -> Result<Self> {
        let valoper_address = valoper_address.into();
        if weight.is_negative() {
            return Err(StakingError::InvalidIntent(format!(
                "negative weight {weight} for {valoper_address}"
            )));
        }
        Ok(ValidatorIntent {
            valoper_address,
            weight,
        })
    }
}

/// Encoded (JSON and borsh) as a list of [`ValidatorIntent`] in address
/// order. Decoding rejects negative weights and repeated validators.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ValidatorIntent>", into = "Vec<ValidatorIntent>")]
pub struct IntentVector(BTreeMap<String, ValidatorIntent>);

impl IntentVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, valoper_address: &str) -> Option<&ValidatorIntent> {
        self.0.get(valoper_address)
    }

    pub fn contains(&self, valoper_address: &str) -> bool {
        self.0.contains_key(valoper_address)
    }

    /// Inserts `intent`, replacing any previous entry for the same validator.
    pub fn insert(&mut self, intent: ValidatorIntent) -> Option<ValidatorIntent> {
        self.0.insert(intent.valoper_address.clone(), intent)
    }

    pub fn remove(&mut self, valoper_address: &str) -> Option<ValidatorIntent> {
        self.0.remove(valoper_address)
    }

    /// Intents in ascending validator-address order.
    pub fn iter(&self) -> impl Iterator<Item = &ValidatorIntent> {
        self.0.values()
    }

    pub fn validators(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn weight_sum(&self) -> Result<Dec> {
        self.iter()
            .try_fold(Dec::ZERO, |acc, intent| acc.checked_add(intent.weight))
            .map_err(StakingError::from)
    }

    /// Adds `weight` to the entry for `valoper_address`, creating it at zero
    /// first if absent.
    pub fn accumulate(&mut self, valoper_address: &str, weight: Dec) -> Result<()> {
        match self.0.get_mut(valoper_address) {
            Some(existing) => existing.weight = existing.weight.checked_add(weight)?,
            None => {
                self.insert(ValidatorIntent::new(valoper_address, weight)?);
            }
        }
        Ok(())
    }

    /// Multiplies every weight by `multiplier`.
    pub fn ordinalize(mut self, multiplier: Dec) -> Result<Self> {
        for intent in self.0.values_mut() {
            intent.weight = intent.weight.mul_truncate(multiplier)?;
        }
        Ok(self)
    }

    /// Rescales the weights to sum to one, truncating each quotient.
    ///
    /// A vector whose weights sum to zero (including the empty vector) is
    /// returned unchanged.
    pub fn normalize(self) -> Result<Self> {
        let sum = self.weight_sum()?;
        self.normalize_by(sum)
    }

    /// Divides every weight by `total`; a zero `total` leaves the vector as is.
    pub fn normalize_by(mut self, total: Dec) -> Result<Self> {
        if total.is_zero() {
            return Ok(self);
        }
        for intent in self.0.values_mut() {
            intent.weight = intent.weight.quo_truncate(total)?;
        }
        Ok(self)
    }

    /// Merges `incoming` (already in value units) into this normalized
    /// vector after ordinalizing it by `multiplier`, then normalizes the
    /// result. An empty `incoming` returns `self` untouched.
    pub fn add_ordinal(self, multiplier: Dec, incoming: &IntentVector) -> Result<Self> {
        if incoming.is_empty() {
            return Ok(self);
        }

        let mut merged = self.ordinalize(multiplier)?;
        for intent in incoming.iter() {
            merged.accumulate(&intent.valoper_address, intent.weight)?;
        }
        merged.normalize()
    }

    /// Equal weights (truncated) over `validators`.
    pub fn equal_weights<'a, I>(validators: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut vector = IntentVector::new();
        for valoper in validators {
            vector.insert(ValidatorIntent::new(valoper, Dec::ONE)?);
        }
        vector.normalize()
    }

    /// Converts tokenized-share coins, whose denom is `"<valoper>/<record>"`,
    /// into an ordinal vector weighted by coin amount. Coins that do not name
    /// a validator accepted by `is_validator` are skipped.
    pub fn from_lsm_coins<F>(coins: &[Coin], is_validator: F) -> Result<Self>
    where
        F: Fn(&str) -> bool,
    {
        let mut vector = IntentVector::new();
        for coin in coins {
            if coin.is_zero() {
                continue;
            }
            let valoper = match coin.denom.split_once('/') {
                Some((valoper, _record)) => valoper,
                None => continue,
            };
            if !is_validator(valoper) {
                continue;
            }
            vector.accumulate(valoper, Dec::from_u128(coin.amount))?;
        }
        Ok(vector)
    }
}

impl TryFrom<Vec<ValidatorIntent>> for IntentVector {
    type Error = StakingError;

    fn try_from(intents: Vec<ValidatorIntent>) -> Result<Self> {
        let mut vector = IntentVector::new();
        for intent in intents {
            let intent = ValidatorIntent::new(intent.valoper_address, intent.weight)?;
            if let Some(previous) = vector.insert(intent) {
                return Err(StakingError::InvalidIntent(format!(
                    "duplicate validator {}",
                    previous.valoper_address
                )));
            }
        }
        Ok(vector)
    }
}

impl From<IntentVector> for Vec<ValidatorIntent> {
    fn from(vector: IntentVector) -> Self {
        vector.0.into_values().collect()
    }
}

impl BorshSerialize for IntentVector {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        let intents: Vec<&ValidatorIntent> = self.iter().collect();
        BorshSerialize::serialize(&intents, writer)
    }
}

impl BorshDeserialize for IntentVector {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        let intents = Vec::<ValidatorIntent>::deserialize_reader(reader)?;
        IntentVector::try_from(intents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Parses the signal-intent wire format: comma-separated entries, each a
/// decimal weight immediately followed by a validator address, e.g.
/// `"0.3cosmosvaloper1abc,0.7cosmosvaloper1def"`.
impl FromStr for IntentVector {
    type Err = StakingError;

    fn from_str(s: &str) -> Result<Self> {
        let mut vector = IntentVector::new();
        for entry in s.split(',').map(str::trim) {
            if entry.is_empty() {
                return Err(StakingError::InvalidIntent("empty intent entry".into()));
            }
            let split = entry
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(entry.len());
            let (weight, valoper) = entry.split_at(split);
            if weight.is_empty() || valoper.is_empty() {
                return Err(StakingError::InvalidIntent(format!(
                    "malformed intent entry {entry:?}"
                )));
            }
            let weight: Dec = weight
                .parse()
                .map_err(|_| StakingError::InvalidIntent(format!("bad weight in {entry:?}")))?;
            if vector
                .insert(ValidatorIntent::new(valoper, weight)?)
                .is_some()
            {
                return Err(StakingError::InvalidIntent(format!(
                    "duplicate validator {valoper}"
                )));
            }
        }
        Ok(vector)
    }
}

/// One depositor's intent record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DelegatorIntent {
    pub delegator: String,
    pub intents: IntentVector,
}

impl DelegatorIntent {
    pub fn empty(delegator: impl Into<String>) -> Self {
        DelegatorIntent {
            delegator: delegator.into(),
            intents: IntentVector::new(),
        }
    }

    pub fn ordinalize(self, multiplier: Dec) -> Result<Self> {
        Ok(DelegatorIntent {
            delegator: self.delegator,
            intents: self.intents.ordinalize(multiplier)?,
        })
    }

    pub fn normalize(self) -> Result<Self> {
        Ok(DelegatorIntent {
            delegator: self.delegator,
            intents: self.intents.normalize()?,
        })
    }

    pub fn add_ordinal(self, multiplier: Dec, incoming: &IntentVector) -> Result<Self> {
        Ok(DelegatorIntent {
            delegator: self.delegator,
            intents: self.intents.add_ordinal(multiplier, incoming)?,
        })
    }
}
