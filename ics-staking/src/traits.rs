//! Contracts for the collaborators the core consumes but never implements
//! for production: balance queries, address decoding and transaction
//! submission.

use crate::error::{Result, StakingError};
use crate::msgs::Msg;
use crate::zone::IcaAccount;

/// Resolves the current balance of an account.
pub trait BalanceLookup {
    /// Balance of `address` in `denom`. Fails with
    /// [`StakingError::BalanceLookup`] if the account cannot be resolved.
    fn balance(&self, address: &str, denom: &str) -> Result<u128>;
}

/// Checks that an identifier is a well-formed account address.
pub trait AddressValidator {
    fn validate(&self, address: &str) -> Result<()>;
}

/// Accepts a list of outbound instructions for relaying to the remote chain.
///
/// Success only means the batch was accepted for submission, not that it
/// executed.
pub trait MessageSubmitter {
    fn submit_tx(&mut self, msgs: Vec<Msg>, account: &IcaAccount, memo: &str) -> Result<()>;
}

const BECH32_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Structural bech32 check: expected human-readable part, separator and data
/// charset. Checksums are left to the address codec of the host chain.
#[derive(Clone, Debug)]
pub struct Bech32PrefixValidator {
    hrp: String,
}

impl Bech32PrefixValidator {
    pub fn new(hrp: impl Into<String>) -> Self {
        Bech32PrefixValidator { hrp: hrp.into() }
    }

    pub fn hrp(&self) -> &str {
        &self.hrp
    }
}

impl AddressValidator for Bech32PrefixValidator {
    fn validate(&self, address: &str) -> Result<()> {
        let invalid = |reason: String| StakingError::InvalidAddress {
            address: address.to_string(),
            reason,
        };

        if address.trim().is_empty() {
            return Err(invalid("empty address string is not allowed".into()));
        }

        let (hrp, data) = address
            .rsplit_once('1')
            .ok_or_else(|| invalid("missing separator".into()))?;

        if hrp != self.hrp {
            return Err(invalid(format!(
                "unexpected hrp - got {} expected {}",
                hrp, self.hrp
            )));
        }

        // 6 checksum characters at minimum.
        if data.len() < 6 {
            return Err(invalid("data part too short".into()));
        }

        if let Some(c) = data.chars().find(|c| !BECH32_CHARSET.contains(*c)) {
            return Err(invalid(format!("invalid character {c:?}")));
        }

        Ok(())
    }
}
