use ics_safe_math::MathError;
use thiserror::Error;

/// Errors surfaced by the staking core.
///
/// Nothing here is retried internally; every variant is handed back to the
/// caller so the surrounding transaction can be aborted as a whole.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakingError {
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("unable to resolve balance for {address}: {reason}")]
    BalanceLookup { address: String, reason: String },

    /// A non-empty set of intents reduced to a zero total weight. Upstream
    /// balances or intent records are corrupt.
    #[error("ordinalized intent sum is zero for zone {chain_id}")]
    DegenerateAggregate { chain_id: String },

    #[error("allocation requested for an empty amount")]
    EmptyAmount,

    #[error("no target validators to allocate across")]
    NoTargetValidators,

    #[error("acknowledgement received for zone {chain_id} with no outstanding operations")]
    UnexpectedAcknowledgement { chain_id: String },

    #[error("invalid intent: {0}")]
    InvalidIntent(String),

    #[error("expected denom {expected}, got {actual}")]
    DenomMismatch { expected: String, actual: String },

    #[error("zone {0} not found")]
    ZoneNotFound(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("failed to decode stored record: {0}")]
    Codec(String),

    #[error("failed to submit transaction: {0}")]
    Submission(String),

    #[error(transparent)]
    Math(#[from] MathError),
}

/// Convenience alias used throughout the crate so functions can simply return
/// `Result<T>` instead of writing out the full type every time.
pub type Result<T> = core::result::Result<T, StakingError>;
