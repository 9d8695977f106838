//! Reward accrual views, claims and emission control

use crate::bank::VaultBank;
use crate::collaborators::{BuyBack, FarmingDeposit, NativeWrapper, ReferralRegistry};
use crate::error::{Result, VaultError};
use crate::events::VaultEvent;
use crate::{Address, AssetId, Block, PoolId, NATIVE_POOL};

impl<R, B, W> VaultBank<R, B, W>
where
    R: ReferralRegistry + Clone,
    B: BuyBack + Clone,
    W: NativeWrapper + Clone,
{
    /// Settle `user` in an already updated pool and pay what is owed.
    ///
    /// The debt moves up to the accumulator whether or not the reserve covers
    /// the full amount; an unfunded remainder is forfeited.
    pub(crate) fn settle_and_pay(&mut self, pid: PoolId, user: &Address) -> Result<u128> {
        let acc = self.pools.pool(pid)?.acc_reward_per_share;
        let pending = self.ledger.settle(pid, user, acc)?;
        self.pay_reward(user, pending)
    }

    fn pay_reward(&mut self, user: &Address, amount: u128) -> Result<u128> {
        if amount == 0 {
            return Ok(0);
        }
        let asset = self.reward_asset;
        let payout = self.reserve.safe_transfer(&asset, user, amount)?;
        log::debug!("reward paid: requested={} sent={}", amount, payout.sent);
        self.events.push(VaultEvent::RewardPaid {
            asset,
            user: *user,
            amount: payout.sent,
        });
        Ok(payout.sent)
    }

    /// Reward `user` could claim from `pid` at `block_number`.
    pub fn pending_reward(&self, pid: PoolId, user: &Address, block_number: u64) -> Result<u128> {
        let shares_total = self.strategy_of(pid)?.shares_total();
        let acc = self
            .pools
            .projected_acc(pid, block_number, self.emission.reward_per_block, shares_total)?;
        self.ledger.pending(pid, user, acc)
    }

    /// Pending reward summed over every pool `user` is in
    pub fn pending_reward_all(&self, user: &Address, block_number: u64) -> Result<u128> {
        let mut total = 0u128;
        for pid in self.ledger.pools_of(user) {
            let pending = self.pending_reward(pid, user, block_number)?;
            total = total.checked_add(pending).ok_or(VaultError::Overflow)?;
        }
        Ok(total)
    }

    /// Claim the reward of one pool. Returns the amount transferred.
    pub fn claim(&mut self, user: &Address, pid: PoolId, block: Block) -> Result<u128> {
        self.atomically(|bank| {
            let now = bank.advance(block)?;
            bank.update_pool_at(pid, now)?;
            bank.settle_and_pay(pid, user)
        })
    }

    /// Claim across every pool `user` holds shares in, paid as one transfer.
    pub fn claim_all(&mut self, user: &Address, block: Block) -> Result<u128> {
        self.atomically(|bank| {
            let now = bank.advance(block)?;
            let owed = bank.settle_all(user, now)?;
            bank.pay_reward(user, owed)
        })
    }

    fn settle_all(&mut self, user: &Address, now: u64) -> Result<u128> {
        let mut owed = 0u128;
        for pid in self.ledger.pools_of(user) {
            self.update_pool_at(pid, now)?;
            let acc = self.pools.pool(pid)?.acc_reward_per_share;
            let pending = self.ledger.settle(pid, user, acc)?;
            owed = owed.checked_add(pending).ok_or(VaultError::Overflow)?;
        }
        Ok(owed)
    }

    /// Claim the reward of `pid` and stake it in `farming` pool 0 for `user`.
    ///
    /// Both halves succeed or neither does: a rejected farming deposit
    /// restores the claim.
    pub fn claim_and_deposit<F: FarmingDeposit>(
        &mut self,
        user: &Address,
        pid: PoolId,
        farming: &mut F,
        block: Block,
    ) -> Result<u128> {
        self.atomically(|bank| {
            let now = bank.advance(block)?;
            bank.update_pool_at(pid, now)?;
            let acc = bank.pools.pool(pid)?.acc_reward_per_share;
            let pending = bank.ledger.settle(pid, user, acc)?;
            let asset = bank.reward_asset;
            let claimed = bank.reserve.take_capped(&asset, pending);
            if claimed == 0 {
                return Ok(0);
            }
            bank.events.push(VaultEvent::RewardPaid {
                asset,
                user: *user,
                amount: claimed,
            });
            farming.deposit_from_vault(NATIVE_POOL, user, &asset, claimed, block)?;
            log::debug!("claimed {} from pool {} into farming", claimed, pid);
            Ok(claimed)
        })
    }

    // ========================================================================
    // Emission control
    // ========================================================================

    /// Apply one decay step if due. Callable by anyone.
    ///
    /// Pools are settled at the old rate first.
    pub fn update_reward_per_block(&mut self, block: Block) -> Result<bool> {
        self.atomically(|bank| {
            let now = bank.advance(block)?;
            if !bank.emission.is_due(now) {
                return Ok(false);
            }
            bank.mass_update_at(now)?;
            let changed = bank.emission.update(now)?;
            if changed {
                log::info!(
                    "reward per block decayed to {} (step {})",
                    bank.emission.reward_per_block,
                    bank.emission.decays_applied
                );
                bank.events.push(VaultEvent::RewardPerBlockDecayed {
                    reward_per_block: bank.emission.reward_per_block,
                    decays_applied: bank.emission.decays_applied,
                });
            }
            Ok(changed)
        })
    }

    /// Replace the reward asset and rate.
    ///
    /// Pools are settled at the old rate first. Reward already accrued but
    /// not yet claimed is paid in whatever asset is configured at claim time.
    pub fn set_reward_pool_info(
        &mut self,
        caller: &Address,
        reward_asset: AssetId,
        reward_per_block: u128,
        block: Block,
    ) -> Result<()> {
        self.atomically(|bank| {
            bank.only_owner(caller)?;
            let now = bank.advance(block)?;
            bank.mass_update_at(now)?;
            if reward_asset != bank.reward_asset {
                log::warn!("reward asset replaced; unclaimed rewards will be paid in the new asset");
            }
            bank.reward_asset = reward_asset;
            bank.emission.set_reward_per_block(reward_per_block);
            log::info!("reward pool info set: reward_per_block={}", reward_per_block);
            bank.events.push(VaultEvent::RewardPoolInfoSet {
                asset: reward_asset,
                reward_per_block,
            });
            Ok(())
        })
    }

    /// Add `amount` of `asset` to the reward reserve.
    pub fn fund_rewards(&mut self, asset: &AssetId, amount: u128) -> Result<()> {
        self.reserve.credit(asset, amount)
    }
}
