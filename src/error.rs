//! Error types for the vault engine

use thiserror::Error;

/// Every way a vault or farming call can be rejected.
///
/// A call that returns one of these has no observable effect on the
/// engine's own state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum VaultError {
    /// Caller is not the owner
    #[error("caller is not the owner")]
    Unauthorized,

    /// Start block must lie strictly after the construction block
    #[error("start block must have a bigger value")]
    StartBlockNotInFuture,

    /// Pool id out of range
    #[error("pool does not exist")]
    PoolNotFound,

    /// Strategy id out of range
    #[error("strategy does not exist")]
    StrategyNotFound,

    /// Strategy is already bound to a pool
    #[error("strategy is already bound to a pool")]
    StrategyInUse,

    /// Strategy manages a different asset than the pool
    #[error("strategy want asset does not match the pool")]
    StrategyWantMismatch,

    /// Pool 0 must hold the wrapped native asset
    #[error("pool 0 is reserved for the wrapped native asset")]
    InvalidNativePool,

    /// Current strategy still holds funds
    #[error("strategy not empty")]
    StrategyNotEmpty,

    /// Migration target already holds funds
    #[error("new strategy not empty")]
    NewStrategyNotEmpty,

    /// Referrer id is not registered
    #[error("unknown referrer")]
    UnknownReferrer,

    /// Nothing to deposit
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Native value sent to a non-native pool, or alongside a token amount
    #[error("native value is only accepted alone on the native pool")]
    UnexpectedNativeValue,

    /// Block timestamp is past the caller's deadline
    #[error("deadline expired")]
    DeadlineExpired,

    /// Caller has no shares in the pool
    #[error("user has no position in this pool")]
    NoPosition,

    /// Requested more than the position holds
    #[error("insufficient balance")]
    InsufficientBalance,

    /// Strategy asked to redeem more shares than exist
    #[error("insufficient strategy shares")]
    InsufficientShares,

    /// Asset does not match the pool's staking asset
    #[error("asset does not match the pool")]
    AssetMismatch,

    /// Withdraw fee above 100%
    #[error("withdraw fee must not exceed 10000 bps")]
    InvalidFee,

    /// Block number lower than one already processed
    #[error("block number is behind the last processed block")]
    BlockInPast,

    /// Arithmetic overflow
    #[error("arithmetic overflow")]
    Overflow,

    /// Collaborator refused the call
    #[error("rejected: {0}")]
    Rejected(&'static str),
}

pub type Result<T> = core::result::Result<T, VaultError>;

/// Configuration loading and validation failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

impl From<ConfigError> for VaultError {
    /// Only validation failures reach the engine; the message is kept.
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Invalid(msg) => VaultError::Rejected(msg),
            _ => VaultError::Rejected("invalid config"),
        }
    }
}
