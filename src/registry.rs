//! Pool table with allocation weights and lazy accrual

use crate::error::{Result, VaultError};
use crate::math;
use crate::{Address, PoolId};

/// One pool. `binding` is the custody handle: a strategy id for the vault,
/// `()` for direct-custody farming.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolInfo<B> {
    pub want: Address,
    pub alloc_point: u64,
    pub last_reward_block: u64,
    pub acc_reward_per_share: u128,
    pub binding: B,
}

/// Append-only list of pools plus the global weight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolRegistry<B> {
    pools: Vec<PoolInfo<B>>,
    total_alloc_point: u64,
    start_block: u64,
}

impl<B> PoolRegistry<B> {
    pub fn new(start_block: u64) -> Self {
        Self {
            pools: Vec::new(),
            total_alloc_point: 0,
            start_block,
        }
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn start_block(&self) -> u64 {
        self.start_block
    }

    pub fn total_alloc_point(&self) -> u64 {
        self.total_alloc_point
    }

    pub fn pool(&self, pid: PoolId) -> Result<&PoolInfo<B>> {
        self.pools.get(pid).ok_or(VaultError::PoolNotFound)
    }

    pub fn pool_mut(&mut self, pid: PoolId) -> Result<&mut PoolInfo<B>> {
        self.pools.get_mut(pid).ok_or(VaultError::PoolNotFound)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoolId, &PoolInfo<B>)> {
        self.pools.iter().enumerate()
    }

    /// Append a pool. Accrual starts at `max(now_block, start_block)`.
    pub fn add_pool(&mut self, want: Address, alloc_point: u64, binding: B, now_block: u64) -> Result<PoolId> {
        let total = self
            .total_alloc_point
            .checked_add(alloc_point)
            .ok_or(VaultError::Overflow)?;
        let pid = self.pools.len();
        self.pools.push(PoolInfo {
            want,
            alloc_point,
            last_reward_block: now_block.max(self.start_block),
            acc_reward_per_share: 0,
            binding,
        });
        self.total_alloc_point = total;
        Ok(pid)
    }

    /// Replace a pool's weight and move the global total by the delta.
    pub fn set_alloc_point(&mut self, pid: PoolId, alloc_point: u64) -> Result<()> {
        let old = self.pool(pid)?.alloc_point;
        let total = (self.total_alloc_point - old)
            .checked_add(alloc_point)
            .ok_or(VaultError::Overflow)?;
        self.pool_mut(pid)?.alloc_point = alloc_point;
        self.total_alloc_point = total;
        Ok(())
    }

    /// Accrue the pool up to `now_block`.
    ///
    /// # Arguments
    /// * `reward_per_block` - emission rate in force over the elapsed span
    /// * `total_shares` - current share total of the pool's custody
    ///
    /// # Returns
    /// * the reward booked to the pool by this call
    pub fn update_pool(
        &mut self,
        pid: PoolId,
        now_block: u64,
        reward_per_block: u128,
        total_shares: u128,
    ) -> Result<u128> {
        let total_alloc = self.total_alloc_point;
        let pool = self.pool_mut(pid)?;
        if now_block <= pool.last_reward_block {
            return Ok(0);
        }
        if total_shares == 0 {
            pool.last_reward_block = now_block;
            return Ok(0);
        }
        let blocks = now_block - pool.last_reward_block;
        let reward = math::pool_reward(reward_per_block, blocks, pool.alloc_point, total_alloc)
            .ok_or(VaultError::Overflow)?;
        let inc = math::acc_increment(reward, total_shares).ok_or(VaultError::Overflow)?;
        pool.acc_reward_per_share = pool
            .acc_reward_per_share
            .checked_add(inc)
            .ok_or(VaultError::Overflow)?;
        pool.last_reward_block = now_block;
        log::debug!(
            "pool {} accrued {} over {} blocks, acc_reward_per_share={}",
            pid,
            reward,
            blocks,
            pool.acc_reward_per_share
        );
        Ok(reward)
    }

    /// Accumulator value `update_pool` would produce, without mutating.
    pub fn projected_acc(
        &self,
        pid: PoolId,
        now_block: u64,
        reward_per_block: u128,
        total_shares: u128,
    ) -> Result<u128> {
        let pool = self.pool(pid)?;
        if now_block <= pool.last_reward_block || total_shares == 0 {
            return Ok(pool.acc_reward_per_share);
        }
        let blocks = now_block - pool.last_reward_block;
        let reward = math::pool_reward(reward_per_block, blocks, pool.alloc_point, self.total_alloc_point)
            .ok_or(VaultError::Overflow)?;
        let inc = math::acc_increment(reward, total_shares).ok_or(VaultError::Overflow)?;
        pool.acc_reward_per_share
            .checked_add(inc)
            .ok_or(VaultError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WANT: Address = [1u8; 32];

    #[test]
    fn test_add_pool_starts_at_start_block() {
        let mut reg: PoolRegistry<()> = PoolRegistry::new(50);
        let pid = reg.add_pool(WANT, 30, (), 10).unwrap();
        assert_eq!(pid, 0);
        assert_eq!(reg.pool(0).unwrap().last_reward_block, 50);
        let pid = reg.add_pool(WANT, 10, (), 70).unwrap();
        assert_eq!(reg.pool(pid).unwrap().last_reward_block, 70);
        assert_eq!(reg.total_alloc_point(), 40);
    }

    #[test]
    fn test_set_alloc_point_moves_total_by_delta() {
        let mut reg: PoolRegistry<()> = PoolRegistry::new(0);
        reg.add_pool(WANT, 30, (), 0).unwrap();
        reg.add_pool(WANT, 10, (), 0).unwrap();
        reg.set_alloc_point(0, 5).unwrap();
        assert_eq!(reg.total_alloc_point(), 15);
        assert_eq!(reg.set_alloc_point(9, 1), Err(VaultError::PoolNotFound));
    }

    #[test]
    fn test_update_pool_zero_shares_advances_block_only() {
        let mut reg: PoolRegistry<()> = PoolRegistry::new(0);
        reg.add_pool(WANT, 30, (), 0).unwrap();
        assert_eq!(reg.update_pool(0, 10, 100, 0), Ok(0));
        let pool = reg.pool(0).unwrap();
        assert_eq!(pool.acc_reward_per_share, 0);
        assert_eq!(pool.last_reward_block, 10);
    }

    #[test]
    fn test_update_pool_same_block_noop() {
        let mut reg: PoolRegistry<()> = PoolRegistry::new(0);
        reg.add_pool(WANT, 30, (), 0).unwrap();
        reg.update_pool(0, 10, 100, 1_000).unwrap();
        let acc = reg.pool(0).unwrap().acc_reward_per_share;
        assert_eq!(reg.update_pool(0, 10, 100, 1_000), Ok(0));
        assert_eq!(reg.update_pool(0, 5, 100, 1_000), Ok(0));
        assert_eq!(reg.pool(0).unwrap().acc_reward_per_share, acc);
    }

    #[test]
    fn test_projected_matches_update() {
        let mut reg: PoolRegistry<()> = PoolRegistry::new(0);
        reg.add_pool(WANT, 30, (), 0).unwrap();
        reg.add_pool(WANT, 70, (), 0).unwrap();
        let projected = reg.projected_acc(1, 17, 1_000, 333).unwrap();
        reg.update_pool(1, 17, 1_000, 333).unwrap();
        assert_eq!(reg.pool(1).unwrap().acc_reward_per_share, projected);
    }
}
