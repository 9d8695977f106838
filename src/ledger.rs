//! Per (pool, user) share and reward-debt bookkeeping

use std::collections::BTreeMap;

use crate::error::{Result, VaultError};
use crate::math;
use crate::{Address, PoolId};

/// A depositor's stake in one pool.
///
/// `reward_debt` is the pool accumulator at the last settlement, on the same
/// 1e12 scale as `acc_reward_per_share`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UserPosition {
    pub shares: u128,
    pub reward_debt: u128,
}

impl UserPosition {
    /// Reward accrued since the last settlement.
    pub fn pending(&self, acc_reward_per_share: u128) -> Result<u128> {
        math::pending_reward(self.shares, acc_reward_per_share, self.reward_debt).ok_or(VaultError::Overflow)
    }
}

/// All positions, plus a running share total per pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserLedger {
    positions: BTreeMap<(PoolId, Address), UserPosition>,
    pool_shares: BTreeMap<PoolId, u128>,
}

impl UserLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self, pid: PoolId, user: &Address) -> UserPosition {
        self.positions.get(&(pid, *user)).copied().unwrap_or_default()
    }

    /// Sum of every user's shares in `pid`
    pub fn pool_shares(&self, pid: PoolId) -> u128 {
        self.pool_shares.get(&pid).copied().unwrap_or(0)
    }

    /// Pools in which `user` holds a non-zero position
    pub fn pools_of(&self, user: &Address) -> Vec<PoolId> {
        self.positions
            .iter()
            .filter(|((_, addr), pos)| addr == user && pos.shares > 0)
            .map(|((pid, _), _)| *pid)
            .collect()
    }

    /// Pending reward for `user` at accumulator `acc`.
    pub fn pending(&self, pid: PoolId, user: &Address, acc: u128) -> Result<u128> {
        self.position(pid, user).pending(acc)
    }

    /// Settle `user` at `acc`: returns the pending reward and moves the debt
    /// up to `acc`.
    pub fn settle(&mut self, pid: PoolId, user: &Address, acc: u128) -> Result<u128> {
        let mut pos = self.position(pid, user);
        let pending = pos.pending(acc)?;
        pos.reward_debt = acc;
        self.store(pid, user, pos);
        Ok(pending)
    }

    /// Add shares and rebase the debt on `acc`.
    pub fn credit(&mut self, pid: PoolId, user: &Address, shares: u128, acc: u128) -> Result<()> {
        let mut pos = self.position(pid, user);
        pos.shares = pos.shares.checked_add(shares).ok_or(VaultError::Overflow)?;
        pos.reward_debt = acc;
        let total = self
            .pool_shares(pid)
            .checked_add(shares)
            .ok_or(VaultError::Overflow)?;
        self.pool_shares.insert(pid, total);
        self.store(pid, user, pos);
        Ok(())
    }

    /// Remove shares and rebase the debt on `acc`.
    pub fn debit(&mut self, pid: PoolId, user: &Address, shares: u128, acc: u128) -> Result<()> {
        let mut pos = self.position(pid, user);
        pos.shares = pos
            .shares
            .checked_sub(shares)
            .ok_or(VaultError::InsufficientBalance)?;
        pos.reward_debt = acc;
        let total = self
            .pool_shares(pid)
            .checked_sub(shares)
            .ok_or(VaultError::InsufficientBalance)?;
        self.pool_shares.insert(pid, total);
        self.store(pid, user, pos);
        Ok(())
    }

    /// Zero a position without paying its reward. Returns the shares removed.
    pub fn clear(&mut self, pid: PoolId, user: &Address) -> u128 {
        let pos = self.positions.remove(&(pid, *user)).unwrap_or_default();
        let total = self.pool_shares(pid).saturating_sub(pos.shares);
        self.pool_shares.insert(pid, total);
        pos.shares
    }

    fn store(&mut self, pid: PoolId, user: &Address, pos: UserPosition) {
        if pos == UserPosition::default() {
            self.positions.remove(&(pid, *user));
        } else {
            self.positions.insert((pid, *user), pos);
        }
    }
}
