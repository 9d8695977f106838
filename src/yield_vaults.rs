//! Multi-pool staking vault engine
//!
//! Users deposit a want asset into a pool; the vault hands custody to a
//! pluggable [`Strategy`] and accrues a decaying per-block reward emission,
//! shared between pools by allocation points and within a pool by strategy
//! shares. [`Farming`] runs the same accrual engine for direct token
//! staking, and [`VaultBank::claim_and_deposit`] re-stakes a vault reward
//! claim into it atomically.
//!
//! Accrual is lazy: each call first brings the touched pool up to the
//! current block, settles the caller against the updated accumulator, then
//! mutates. Accumulators are `u128` scaled by [`math::ACC_SCALE`].
//!
//! Every state-changing call takes the current [`Block`] explicitly. There
//! is no ambient clock.

pub mod assets;
pub mod bank;
pub mod collaborators;
pub mod config;
pub mod emission;
pub mod error;
pub mod events;
pub mod farming;
pub mod ledger;
pub mod math;
pub mod pipeline;
pub mod registry;
pub mod rewards;
pub mod strategy;

#[cfg(test)]
mod tests;

#[cfg(kani)]
mod kani_proofs;

pub use assets::{AssetBook, Payout};
pub use bank::{RewardPoolInfo, VaultBank};
pub use collaborators::{
    BurnOrder, BuyBack, BuyBackQueue, FarmingDeposit, MemberRegistry, NativeWrapper, OneToOneWrapper,
    ReferralRegistry,
};
pub use config::{BankConfig, EmissionConfig, FarmingConfig, SplitConfig};
pub use emission::EmissionSchedule;
pub use error::{ConfigError, Result, VaultError};
pub use events::VaultEvent;
pub use farming::Farming;
pub use ledger::{UserLedger, UserPosition};
pub use math::DepositSplit;
pub use pipeline::{DepositOutcome, DepositRequest, WithdrawOutcome};
pub use registry::{PoolInfo, PoolRegistry};
pub use strategy::{ShareStrategy, Strategy};

// ============================================================================
// Core identifiers
// ============================================================================

/// 32-byte account identifier
pub type Address = [u8; 32];

/// Assets are identified by their token account address
pub type AssetId = Address;

/// Index into the append-only pool list
pub type PoolId = usize;

/// Index into a vault's strategy list
pub type StrategyId = usize;

/// Pool reserved for the wrapped native asset
pub const NATIVE_POOL: PoolId = 0;

/// Block context of a call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block {
    pub number: u64,
    /// Unix seconds; compared against deposit deadlines
    pub timestamp: u64,
}

impl Block {
    pub fn new(number: u64, timestamp: u64) -> Self {
        Self { number, timestamp }
    }

    /// Block `number` with a zero timestamp
    pub fn at(number: u64) -> Self {
        Self { number, timestamp: 0 }
    }
}
