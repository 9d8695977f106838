//! Vault bank aggregate: construction, administration and strategy binding
//!
//! `VaultBank` owns every piece of vault state. Each public mutating call
//! runs through [`VaultBank::atomically`], which restores a snapshot of the
//! whole bank (strategies and collaborators included) when the call fails.
//! Deposit and withdraw live in `pipeline`, reward payment in `rewards`.

use crate::assets::AssetBook;
use crate::collaborators::{BuyBack, NativeWrapper, ReferralRegistry};
use crate::config::{BankConfig, SplitConfig};
use crate::emission::EmissionSchedule;
use crate::error::{Result, VaultError};
use crate::events::{EventLog, VaultEvent};
use crate::ledger::{UserLedger, UserPosition};
use crate::math;
use crate::registry::{PoolInfo, PoolRegistry};
use crate::strategy::Strategy;
use crate::{Address, AssetId, Block, PoolId, StrategyId};

/// Asset paid as reward and its current rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewardPoolInfo {
    pub reward_asset: AssetId,
    pub reward_per_block: u128,
}

/// Multi-pool staking vault.
///
/// Generic over the referral tree `R`, the buy-back sink `B` and the native
/// wrapper `W`.
#[derive(Clone, Debug)]
pub struct VaultBank<R, B, W> {
    pub(crate) owner: Address,
    pub(crate) treasury: Address,
    pub(crate) wrapped_native: AssetId,
    pub(crate) split: SplitConfig,
    pub(crate) withdraw_fee_bps: u16,

    pub(crate) pools: PoolRegistry<StrategyId>,
    pub(crate) ledger: UserLedger,
    pub(crate) reward_asset: AssetId,
    pub(crate) emission: EmissionSchedule,

    /// Want held between accepting funds and forwarding them
    pub(crate) custody: AssetBook,
    /// Reward reserve
    pub(crate) reserve: AssetBook,
    pub(crate) events: EventLog,
    pub(crate) last_block: u64,

    pub(crate) strategies: Vec<Box<dyn Strategy>>,
    /// Pool each strategy is bound to
    pub(crate) strategy_pool: Vec<Option<PoolId>>,

    pub(crate) referral: R,
    pub(crate) buy_back: B,
    pub(crate) wrapper: W,
}

impl<R, B, W> VaultBank<R, B, W>
where
    R: ReferralRegistry + Clone,
    B: BuyBack + Clone,
    W: NativeWrapper + Clone,
{
    /// Create a bank at `block`.
    ///
    /// # Errors
    /// * `StartBlockNotInFuture` unless `config.start_block > block.number`
    /// * `InvalidFee` if the withdraw fee is above 10 000 bps
    /// * `Rejected` if the split does not sum to 100 or the emission
    ///   parameters are invalid
    /// * `InvalidNativePool` if `wrapper` does not wrap `config.wrapped_native`
    pub fn new(config: BankConfig, block: Block, referral: R, buy_back: B, wrapper: W) -> Result<Self> {
        if config.start_block <= block.number {
            return Err(VaultError::StartBlockNotInFuture);
        }
        if config.withdraw_fee_bps as u128 > math::BPS_DENOMINATOR {
            return Err(VaultError::InvalidFee);
        }
        config.validate()?;
        let split = config.split;
        if wrapper.wrapped_asset() != config.wrapped_native {
            return Err(VaultError::InvalidNativePool);
        }

        let emission = EmissionSchedule::new(
            config.reward_per_block,
            config.start_block,
            config.emission.decay_interval_blocks,
            config.emission.coefficient,
            config.emission.max_decay_steps,
        );

        log::info!(
            "vault bank created: start_block={} reward_per_block={} fee_bps={}",
            config.start_block,
            config.reward_per_block,
            config.withdraw_fee_bps
        );

        Ok(Self {
            owner: config.owner,
            treasury: config.treasury,
            wrapped_native: config.wrapped_native,
            split,
            withdraw_fee_bps: config.withdraw_fee_bps,
            pools: PoolRegistry::new(config.start_block),
            ledger: UserLedger::new(),
            reward_asset: config.reward_asset,
            emission,
            custody: AssetBook::new(),
            reserve: AssetBook::new(),
            events: EventLog::default(),
            last_block: block.number,
            strategies: Vec::new(),
            strategy_pool: Vec::new(),
            referral,
            buy_back,
            wrapper,
        })
    }

    // ========================================================================
    // Internal plumbing
    // ========================================================================

    /// Run `op` with all-or-nothing semantics.
    pub(crate) fn atomically<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
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

    /// Record `block` as the current block. Blocks never move backwards.
    pub(crate) fn advance(&mut self, block: Block) -> Result<u64> {
        if block.number < self.last_block {
            return Err(VaultError::BlockInPast);
        }
        self.last_block = block.number;
        Ok(block.number)
    }

    pub(crate) fn only_owner(&self, caller: &Address) -> Result<()> {
        if caller != &self.owner {
            return Err(VaultError::Unauthorized);
        }
        Ok(())
    }

    pub(crate) fn strategy_of(&self, pid: PoolId) -> Result<&dyn Strategy> {
        let sid = self.pools.pool(pid)?.binding;
        self.strategies
            .get(sid)
            .map(|s| &**s)
            .ok_or(VaultError::StrategyNotFound)
    }

    pub(crate) fn strategy_of_mut(&mut self, pid: PoolId) -> Result<&mut Box<dyn Strategy>> {
        let sid = self.pools.pool(pid)?.binding;
        self.strategies.get_mut(sid).ok_or(VaultError::StrategyNotFound)
    }

    /// Accrue one pool up to `now`.
    pub(crate) fn update_pool_at(&mut self, pid: PoolId, now: u64) -> Result<u128> {
        let shares = self.strategy_of(pid)?.shares_total();
        self.pools
            .update_pool(pid, now, self.emission.reward_per_block, shares)
    }

    pub(crate) fn mass_update_at(&mut self, now: u64) -> Result<()> {
        for pid in 0..self.pools.len() {
            self.update_pool_at(pid, now)?;
        }
        Ok(())
    }

    /// Check that `sid` exists, is free and manages `want`.
    fn check_bindable(&self, sid: StrategyId, want: &AssetId) -> Result<()> {
        let strategy = self.strategies.get(sid).ok_or(VaultError::StrategyNotFound)?;
        if self.strategy_pool.get(sid).copied().flatten().is_some() {
            return Err(VaultError::StrategyInUse);
        }
        if &strategy.want() != want {
            return Err(VaultError::StrategyWantMismatch);
        }
        Ok(())
    }

    // ========================================================================
    // Pool administration
    // ========================================================================

    /// Register a strategy instance so it can be bound to a pool.
    pub fn add_strategy(&mut self, caller: &Address, strategy: Box<dyn Strategy>) -> Result<StrategyId> {
        self.only_owner(caller)?;
        let sid = self.strategies.len();
        log::info!("strategy {} registered", sid);
        self.strategies.push(strategy);
        self.strategy_pool.push(None);
        Ok(sid)
    }

    /// Append a pool bound to strategy `sid`.
    ///
    /// Pool 0 is the native pool and must take the wrapped native asset.
    pub fn add_pool(
        &mut self,
        caller: &Address,
        want: AssetId,
        alloc_point: u64,
        sid: StrategyId,
        with_update: bool,
        block: Block,
    ) -> Result<PoolId> {
        self.atomically(|bank| {
            bank.only_owner(caller)?;
            let now = bank.advance(block)?;
            if bank.pools.is_empty() && want != bank.wrapped_native {
                return Err(VaultError::InvalidNativePool);
            }
            bank.check_bindable(sid, &want)?;
            if with_update {
                bank.mass_update_at(now)?;
            }
            let pid = bank.pools.add_pool(want, alloc_point, sid, now)?;
            bank.strategy_pool[sid] = Some(pid);
            log::info!("pool {} added: alloc_point={} strategy={}", pid, alloc_point, sid);
            bank.events.push(VaultEvent::PoolAdded { pid, want, alloc_point });
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
        self.atomically(|bank| {
            bank.only_owner(caller)?;
            let now = bank.advance(block)?;
            if with_update {
                bank.mass_update_at(now)?;
            }
            bank.pools.set_alloc_point(pid, alloc_point)?;
            log::info!("pool {} alloc_point set to {}", pid, alloc_point);
            bank.events.push(VaultEvent::AllocPointSet { pid, alloc_point });
            Ok(())
        })
    }

    /// Rebind `pid` to `sid`. The current strategy must hold nothing.
    pub fn reset_strategy(&mut self, caller: &Address, pid: PoolId, sid: StrategyId) -> Result<()> {
        self.atomically(|bank| {
            bank.only_owner(caller)?;
            if !bank.strategy_of(pid)?.is_empty() {
                return Err(VaultError::StrategyNotEmpty);
            }
            let want = bank.pools.pool(pid)?.want;
            bank.check_bindable(sid, &want)?;
            let old = bank.pools.pool(pid)?.binding;
            bank.strategy_pool[old] = None;
            bank.strategy_pool[sid] = Some(pid);
            bank.pools.pool_mut(pid)?.binding = sid;
            log::info!("pool {} strategy reset {} -> {}", pid, old, sid);
            bank.events.push(VaultEvent::StrategyReset { pid, strategy: sid });
            Ok(())
        })
    }

    /// Move every share and all want of `pid` to the empty strategy `sid`.
    ///
    /// User positions are untouched; the new strategy adopts the exact
    /// `(want_locked, shares_total)` pair released by the old one.
    pub fn migrate_strategy(&mut self, caller: &Address, pid: PoolId, sid: StrategyId, block: Block) -> Result<()> {
        self.atomically(|bank| {
            bank.only_owner(caller)?;
            let now = bank.advance(block)?;
            let want = bank.pools.pool(pid)?.want;
            bank.check_bindable(sid, &want)?;
            if !bank.strategies[sid].is_empty() {
                return Err(VaultError::NewStrategyNotEmpty);
            }
            bank.update_pool_at(pid, now)?;

            let old = bank.pools.pool(pid)?.binding;
            let shares_total = bank.strategies[old].shares_total();
            let want_locked = bank.strategies[old].withdraw(shares_total)?;
            bank.strategies[sid].migrate_from(want_locked, shares_total)?;

            bank.strategy_pool[old] = None;
            bank.strategy_pool[sid] = Some(pid);
            bank.pools.pool_mut(pid)?.binding = sid;
            log::info!(
                "pool {} migrated {} -> {}: want_locked={} shares_total={}",
                pid,
                old,
                sid,
                want_locked,
                shares_total
            );
            bank.events.push(VaultEvent::StrategyMigrated {
                pid,
                from: old,
                to: sid,
                want_locked,
                shares_total,
            });
            Ok(())
        })
    }

    /// Accrue one pool. Callable by anyone.
    pub fn update_pool(&mut self, pid: PoolId, block: Block) -> Result<()> {
        self.atomically(|bank| {
            let now = bank.advance(block)?;
            bank.update_pool_at(pid, now).map(|_| ())
        })
    }

    /// Accrue every pool. Callable by anyone.
    pub fn mass_update_pools(&mut self, block: Block) -> Result<()> {
        self.atomically(|bank| {
            let now = bank.advance(block)?;
            bank.mass_update_at(now)
        })
    }

    // ========================================================================
    // Owner / treasury
    // ========================================================================

    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<()> {
        self.only_owner(caller)?;
        let previous = self.owner;
        self.owner = new_owner;
        log::info!("ownership transferred");
        self.events.push(VaultEvent::OwnershipTransferred { previous, owner: new_owner });
        Ok(())
    }

    pub fn set_treasury(&mut self, caller: &Address, treasury: Address) -> Result<()> {
        self.only_owner(caller)?;
        self.treasury = treasury;
        log::info!("treasury updated");
        self.events.push(VaultEvent::TreasurySet { treasury });
        Ok(())
    }

    pub fn set_withdraw_fee(&mut self, caller: &Address, fee_bps: u16) -> Result<()> {
        self.only_owner(caller)?;
        if fee_bps as u128 > math::BPS_DENOMINATOR {
            return Err(VaultError::InvalidFee);
        }
        self.withdraw_fee_bps = fee_bps;
        log::info!("withdraw fee set to {} bps", fee_bps);
        self.events.push(VaultEvent::WithdrawFeeSet { fee_bps });
        Ok(())
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn treasury(&self) -> Address {
        self.treasury
    }

    pub fn pool_length(&self) -> usize {
        self.pools.len()
    }

    pub fn pool(&self, pid: PoolId) -> Result<&PoolInfo<StrategyId>> {
        self.pools.pool(pid)
    }

    pub fn total_alloc_point(&self) -> u64 {
        self.pools.total_alloc_point()
    }

    pub fn start_block(&self) -> u64 {
        self.pools.start_block()
    }

    pub fn withdraw_fee_bps(&self) -> u16 {
        self.withdraw_fee_bps
    }

    pub fn user_info(&self, pid: PoolId, user: &Address) -> UserPosition {
        self.ledger.position(pid, user)
    }

    /// Sum of every user's shares in `pid`
    pub fn pool_user_shares(&self, pid: PoolId) -> u128 {
        self.ledger.pool_shares(pid)
    }

    /// `user`'s shares valued at the strategy's current exchange rate
    pub fn staked_want_tokens(&self, pid: PoolId, user: &Address) -> Result<u128> {
        let strategy = self.strategy_of(pid)?;
        let shares = self.ledger.position(pid, user).shares;
        Ok(math::shares_to_want(
            shares,
            strategy.want_locked_total(),
            strategy.shares_total(),
        ))
    }

    pub fn reward_pool_info(&self) -> RewardPoolInfo {
        RewardPoolInfo {
            reward_asset: self.reward_asset,
            reward_per_block: self.emission.reward_per_block,
        }
    }

    pub fn emission(&self) -> &EmissionSchedule {
        &self.emission
    }

    pub fn strategy(&self, sid: StrategyId) -> Result<&dyn Strategy> {
        self.strategies
            .get(sid)
            .map(|s| &**s)
            .ok_or(VaultError::StrategyNotFound)
    }

    /// Direct handle on a strategy, for driving its yield outside the vault.
    pub fn strategy_mut(&mut self, sid: StrategyId) -> Result<&mut Box<dyn Strategy>> {
        self.strategies.get_mut(sid).ok_or(VaultError::StrategyNotFound)
    }

    pub fn strategy_pool(&self, sid: StrategyId) -> Option<PoolId> {
        self.strategy_pool.get(sid).copied().flatten()
    }

    /// Want and native funds passing through the vault
    pub fn custody(&self) -> &AssetBook {
        &self.custody
    }

    /// Reward reserve
    pub fn reserve(&self) -> &AssetBook {
        &self.reserve
    }

    pub fn events(&self) -> &[VaultEvent] {
        self.events.all()
    }

    pub fn take_events(&mut self) -> Vec<VaultEvent> {
        self.events.drain()
    }

    pub fn referral(&self) -> &R {
        &self.referral
    }

    pub fn buy_back(&self) -> &B {
        &self.buy_back
    }

    pub fn wrapper(&self) -> &W {
        &self.wrapper
    }

    pub fn last_block(&self) -> u64 {
        self.last_block
    }
}
