//! Direct-custody staking ledger on the same accrual engine
//!
//! A farm pool holds its staking token itself, so a pool's share total is
//! simply the amount staked. Rewards come from a separately funded reserve.

use crate::assets::AssetBook;
use crate::collaborators::FarmingDeposit;
use crate::config::FarmingConfig;
use crate::emission::EmissionSchedule;
use crate::error::{Result, VaultError};
use crate::events::{EventLog, VaultEvent};
use crate::ledger::{UserLedger, UserPosition};
use crate::registry::{PoolInfo, PoolRegistry};
use crate::{Address, AssetId, Block, PoolId};

#[derive(Clone, Debug)]
pub struct Farming {
    owner: Address,
    reward_asset: AssetId,
    pools: PoolRegistry<()>,
    ledger: UserLedger,
    emission: EmissionSchedule,
    stakes: AssetBook,
    reserve: AssetBook,
    events: EventLog,
    last_block: u64,
}

impl Farming {
    /// Create a farm at `block`.
    ///
    /// # Errors
    /// * `StartBlockNotInFuture` unless `config.start_block > block.number`
    /// * `Rejected` if the emission parameters are invalid
    pub fn new(config: FarmingConfig, block: Block) -> Result<Self> {
        config.validate()?;
        if config.start_block <= block.number {
            return Err(VaultError::StartBlockNotInFuture);
        }
        let emission = EmissionSchedule::new(
            config.reward_per_block,
            config.start_block,
            config.emission.decay_interval_blocks,
            config.emission.coefficient,
            config.emission.max_decay_steps,
        );
        log::info!(
            "farming created: start_block={} reward_per_block={}",
            config.start_block,
            config.reward_per_block
        );
        Ok(Self {
            owner: config.owner,
            reward_asset: config.reward_asset,
            pools: PoolRegistry::new(config.start_block),
            ledger: UserLedger::new(),
            emission,
            stakes: AssetBook::new(),
            reserve: AssetBook::new(),
            events: EventLog::default(),
            last_block: block.number,
        })
    }

    fn atomically<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        // The event log stays out of the snapshot; a failed call only cuts
        // it back to its length on entry.
        let events = std::mem::take(&mut self.events);
        let mark = events.len();
        let snapshot = self.clone();
        self.events = events;
        let res = op(self);
        if let Err(e) = &res {
            log::debug!("call rejected, state restored: {}", e);
            let mut events = std::mem::take(&mut self.events);
            events.truncate(mark);
            *self = snapshot;
            self.events = events;
        }
        res
    }

    fn advance(&mut self, block: Block) -> Result<u64> {
        if block.number < self.last_block {
            return Err(VaultError::BlockInPast);
        }
        self.last_block = block.number;
        Ok(block.number)
    }

    fn only_owner(&self, caller: &Address) -> Result<()> {
        if caller != &self.owner {
            return Err(VaultError::Unauthorized);
        }
        Ok(())
    }

    fn update_pool_at(&mut self, pid: PoolId, now: u64) -> Result<u128> {
        let staked = self.ledger.pool_shares(pid);
        self.pools
            .update_pool(pid, now, self.emission.reward_per_block, staked)
    }

    fn mass_update_at(&mut self, now: u64) -> Result<()> {
        for pid in 0..self.pools.len() {
            self.update_pool_at(pid, now)?;
        }
        Ok(())
    }

    fn pay_reward(&mut self, user: &Address, amount: u128) -> Result<u128> {
        if amount == 0 {
            return Ok(0);
        }
        let asset = self.reward_asset;
        let payout = self.reserve.safe_transfer(&asset, user, amount)?;
        self.events.push(VaultEvent::RewardPaid {
            asset,
            user: *user,
            amount: payout.sent,
        });
        Ok(payout.sent)
    }

    fn settle_and_pay(&mut self, pid: PoolId, user: &Address, now: u64) -> Result<u128> {
        self.update_pool_at(pid, now)?;
        let acc = self.pools.pool(pid)?.acc_reward_per_share;
        let pending = self.ledger.settle(pid, user, acc)?;
        self.pay_reward(user, pending)
    }

    fn stake(&mut self, pid: PoolId, user: &Address, amount: u128, now: u64) -> Result<u128> {
        let want = self.pools.pool(pid)?.want;
        let reward = self.settle_and_pay(pid, user, now)?;
        if amount > 0 {
            self.stakes.credit(&want, amount)?;
            let acc = self.pools.pool(pid)?.acc_reward_per_share;
            self.ledger.credit(pid, user, amount, acc)?;
        }
        self.events.push(VaultEvent::Deposit {
            user: *user,
            pid,
            amount,
        });
        Ok(reward)
    }

    // ========================================================================
    // Administration
    // ========================================================================

    pub fn add_pool(
        &mut self,
        caller: &Address,
        want: AssetId,
        alloc_point: u64,
        with_update: bool,
        block: Block,
    ) -> Result<PoolId> {
        self.atomically(|farm| {
            farm.only_owner(caller)?;
            let now = farm.advance(block)?;
            if with_update {
                farm.mass_update_at(now)?;
            }
            let pid = farm.pools.add_pool(want, alloc_point, (), now)?;
            log::info!("farm pool {} added: alloc_point={}", pid, alloc_point);
            farm.events.push(VaultEvent::PoolAdded { pid, want, alloc_point });
            Ok(pid)
        })
    }

    pub fn set_alloc_point(
        &mut self,
        caller: &Address,
        pid: PoolId,
        alloc_point: u64,
        with_update: bool,
        block: Block,
    ) -> Result<()> {
        self.atomically(|farm| {
            farm.only_owner(caller)?;
            let now = farm.advance(block)?;
            if with_update {
                farm.mass_update_at(now)?;
            }
            farm.pools.set_alloc_point(pid, alloc_point)?;
            farm.events.push(VaultEvent::AllocPointSet { pid, alloc_point });
            Ok(())
        })
    }

    /// Owner override of the rate. Pools are settled at the old rate first.
    pub fn set_reward_per_block(&mut self, caller: &Address, reward_per_block: u128, block: Block) -> Result<()> {
        self.atomically(|farm| {
            farm.only_owner(caller)?;
            let now = farm.advance(block)?;
            farm.mass_update_at(now)?;
            farm.emission.set_reward_per_block(reward_per_block);
            log::info!("farm reward per block set to {}", reward_per_block);
            farm.events.push(VaultEvent::RewardPoolInfoSet {
                asset: farm.reward_asset,
                reward_per_block,
            });
            Ok(())
        })
    }

    /// Apply one decay step if due. Callable by anyone.
    pub fn update_reward_per_block(&mut self, block: Block) -> Result<bool> {
        self.atomically(|farm| {
            let now = farm.advance(block)?;
            if !farm.emission.is_due(now) {
                return Ok(false);
            }
            farm.mass_update_at(now)?;
            let changed = farm.emission.update(now)?;
            if changed {
                farm.events.push(VaultEvent::RewardPerBlockDecayed {
                    reward_per_block: farm.emission.reward_per_block,
                    decays_applied: farm.emission.decays_applied,
                });
            }
            Ok(changed)
        })
    }

    /// Add `amount` of the reward asset to the reserve.
    pub fn fund_rewards(&mut self, amount: u128) -> Result<()> {
        let asset = self.reward_asset;
        self.reserve.credit(&asset, amount)
    }

    pub fn update_pool(&mut self, pid: PoolId, block: Block) -> Result<()> {
        self.atomically(|farm| {
            let now = farm.advance(block)?;
            farm.update_pool_at(pid, now).map(|_| ())
        })
    }

    pub fn mass_update_pools(&mut self, block: Block) -> Result<()> {
        self.atomically(|farm| {
            let now = farm.advance(block)?;
            farm.mass_update_at(now)
        })
    }

    // ========================================================================
    // User operations
    // ========================================================================

    /// Stake `amount` in `pid`, claiming pending reward first.
    ///
    /// A zero amount only harvests. Returns the reward paid.
    pub fn deposit(&mut self, user: &Address, pid: PoolId, amount: u128, block: Block) -> Result<u128> {
        self.atomically(|farm| {
            let now = farm.advance(block)?;
            farm.stake(pid, user, amount, now)
        })
    }

    /// Unstake `amount`, claiming pending reward first.
    ///
    /// # Returns
    /// * `(reward_paid, amount_returned)`
    pub fn withdraw(&mut self, user: &Address, pid: PoolId, amount: u128, block: Block) -> Result<(u128, u128)> {
        self.atomically(|farm| {
            let now = farm.advance(block)?;
            let want = farm.pools.pool(pid)?.want;
            if amount > farm.ledger.position(pid, user).shares {
                return Err(VaultError::InsufficientBalance);
            }
            let reward = farm.settle_and_pay(pid, user, now)?;
            let mut returned = 0;
            if amount > 0 {
                let acc = farm.pools.pool(pid)?.acc_reward_per_share;
                farm.ledger.debit(pid, user, amount, acc)?;
                returned = farm.stakes.safe_transfer(&want, user, amount)?.sent;
            }
            farm.events.push(VaultEvent::Withdraw {
                user: *user,
                pid,
                amount,
            });
            Ok((reward, returned))
        })
    }

    pub fn claim(&mut self, user: &Address, pid: PoolId, block: Block) -> Result<u128> {
        self.atomically(|farm| {
            let now = farm.advance(block)?;
            farm.settle_and_pay(pid, user, now)
        })
    }

    /// Claim every pool `user` stakes in as one transfer.
    pub fn claim_all(&mut self, user: &Address, block: Block) -> Result<u128> {
        self.atomically(|farm| {
            let now = farm.advance(block)?;
            let mut owed = 0u128;
            for pid in farm.ledger.pools_of(user) {
                farm.update_pool_at(pid, now)?;
                let acc = farm.pools.pool(pid)?.acc_reward_per_share;
                let pending = farm.ledger.settle(pid, user, acc)?;
                owed = owed.checked_add(pending).ok_or(VaultError::Overflow)?;
            }
            farm.pay_reward(user, owed)
        })
    }

    /// Return the whole stake without paying rewards.
    pub fn emergency_withdraw(&mut self, user: &Address, pid: PoolId) -> Result<u128> {
        self.atomically(|farm| {
            let want = farm.pools.pool(pid)?.want;
            let amount = farm.ledger.clear(pid, user);
            let sent = farm.stakes.safe_transfer(&want, user, amount)?.sent;
            log::warn!("emergency withdraw from farm pool {}: {}", pid, sent);
            farm.events.push(VaultEvent::EmergencyWithdraw {
                user: *user,
                pid,
                amount: sent,
            });
            Ok(sent)
        })
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn pending_reward(&self, pid: PoolId, user: &Address, block_number: u64) -> Result<u128> {
        let staked = self.ledger.pool_shares(pid);
        let acc = self
            .pools
            .projected_acc(pid, block_number, self.emission.reward_per_block, staked)?;
        self.ledger.pending(pid, user, acc)
    }

    pub fn pool_length(&self) -> usize {
        self.pools.len()
    }

    pub fn pool(&self, pid: PoolId) -> Result<&PoolInfo<()>> {
        self.pools.pool(pid)
    }

    pub fn user_info(&self, pid: PoolId, user: &Address) -> UserPosition {
        self.ledger.position(pid, user)
    }

    pub fn total_staked(&self, pid: PoolId) -> u128 {
        self.ledger.pool_shares(pid)
    }

    pub fn total_alloc_point(&self) -> u64 {
        self.pools.total_alloc_point()
    }

    pub fn reward_per_block(&self) -> u128 {
        self.emission.reward_per_block
    }

    pub fn emission(&self) -> &EmissionSchedule {
        &self.emission
    }

    pub fn stakes(&self) -> &AssetBook {
        &self.stakes
    }

    pub fn reserve(&self) -> &AssetBook {
        &self.reserve
    }

    pub fn events(&self) -> &[VaultEvent] {
        self.events.all()
    }
}

impl FarmingDeposit for Farming {
    /// Stake reward claimed from a vault. The asset must be the pool's
    /// staking token.
    fn deposit_from_vault(
        &mut self,
        pid: PoolId,
        user: &Address,
        asset: &AssetId,
        amount: u128,
        block: Block,
    ) -> Result<()> {
        self.atomically(|farm| {
            let now = farm.advance(block)?;
            if &farm.pools.pool(pid)?.want != asset {
                return Err(VaultError::AssetMismatch);
            }
            if amount == 0 {
                return Err(VaultError::ZeroAmount);
            }
            farm.stake(pid, user, amount, now).map(|_| ())
        })
    }
}
