//! Event records emitted by the vault and the farm

use serde::Serialize;

use crate::{Address, AssetId, PoolId, StrategyId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VaultEvent {
    PoolAdded {
        pid: PoolId,
        want: AssetId,
        alloc_point: u64,
    },
    AllocPointSet {
        pid: PoolId,
        alloc_point: u64,
    },
    StrategyReset {
        pid: PoolId,
        strategy: StrategyId,
    },
    StrategyMigrated {
        pid: PoolId,
        from: StrategyId,
        to: StrategyId,
        want_locked: u128,
        shares_total: u128,
    },
    /// `amount` is the savings cut forwarded to custody, not the gross input
    Deposit {
        user: Address,
        pid: PoolId,
        amount: u128,
    },
    /// `amount` is the want released by custody, before the fee
    Withdraw {
        user: Address,
        pid: PoolId,
        amount: u128,
    },
    RewardPaid {
        asset: AssetId,
        user: Address,
        amount: u128,
    },
    WithdrawFeeCollected {
        pid: PoolId,
        treasury: Address,
        amount: u128,
    },
    RewardPerBlockDecayed {
        reward_per_block: u128,
        decays_applied: u32,
    },
    RewardPoolInfoSet {
        asset: AssetId,
        reward_per_block: u128,
    },
    WithdrawFeeSet {
        fee_bps: u16,
    },
    EmergencyWithdraw {
        user: Address,
        pid: PoolId,
        amount: u128,
    },
    OwnershipTransferred {
        previous: Address,
        owner: Address,
    },
    TreasurySet {
        treasury: Address,
    },
}

/// Append-only event buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<VaultEvent>,
}

impl EventLog {
    pub fn push(&mut self, event: VaultEvent) {
        self.events.push(event);
    }

    pub fn all(&self) -> &[VaultEvent] {
        &self.events
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    /// Drop every event recorded after the first `len`
    pub(crate) fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// Remove and return every buffered event
    pub fn drain(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }
}
