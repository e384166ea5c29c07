//! Accounting core for cross-chain liquid staking.
//!
//! Depositors state which validators they want their stake delegated to
//! ([`intent`]). Those preferences are weighted by balance and reduced into
//! one zone-wide target ([`aggregate`]). New deposits are split across
//! validators so that holdings drift toward that target ([`allocation`]), and
//! batches of remote operations are tracked until every acknowledgement has
//! come back ([`completion`]).
//!
//! All arithmetic is fixed-point through [`ics_safe_math::Dec`] and truncates
//! toward zero. Storage, balances, address decoding and transaction relay are
//! supplied by the host through the traits in [`store`] and [`traits`]; the
//! [`Keeper`] ties them together.

pub mod aggregate;
pub mod allocation;
pub mod coin;
pub mod completion;
pub mod delegation;
pub mod error;
pub mod intent;
pub mod keeper;
pub mod msgs;
pub mod store;
pub mod traits;
pub mod zone;

pub use allocation::{AllocationMap, AllocationPlan};
pub use coin::{Coin, DecCoin};
pub use completion::{CompletionCounter, DelegationReward, DelegatorRewards};
pub use delegation::Delegation;
pub use error::{Result, StakingError};
pub use intent::{DelegatorIntent, IntentVector, ValidatorIntent};
pub use keeper::Keeper;
pub use msgs::Msg;
pub use store::{KvStore, MemStore};
pub use traits::{AddressValidator, BalanceLookup, Bech32PrefixValidator, MessageSubmitter};
pub use zone::{IcaAccount, Validator, Zone};
