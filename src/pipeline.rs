//! Deposit and withdraw pipeline
//!
//! Deposit: settle the pool, auto-claim, accept funds (wrapping native value
//! for pool 0), split into buy-and-burn, referral and savings cuts, forward
//! the savings to the strategy and credit the shares it issues.
//!
//! Withdraw: settle the pool, auto-claim, redeem shares from the strategy,
//! take the withdraw fee and pay the rest with a capped transfer.

use crate::bank::VaultBank;
use crate::collaborators::{BuyBack, NativeWrapper, ReferralRegistry};
use crate::error::{Result, VaultError};
use crate::events::VaultEvent;
use crate::math::{self, DepositSplit};
use crate::{Address, Block, PoolId, NATIVE_POOL};

/// Arguments of a vault deposit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DepositRequest {
    pub pid: PoolId,
    /// Token amount pulled from the caller
    pub want_amt: u128,
    /// Member id of the caller's referrer
    pub referrer_id: u64,
    /// Minimum burn output passed to the buy-back
    pub min_burn_out: u128,
    /// Latest block timestamp at which the call may execute
    pub deadline: Option<u64>,
    /// Native value attached to the call; pool 0 only
    pub native_value: u128,
}

impl DepositRequest {
    /// Token deposit into `pid`
    pub fn tokens(pid: PoolId, want_amt: u128, referrer_id: u64) -> Self {
        Self {
            pid,
            want_amt,
            referrer_id,
            ..Self::default()
        }
    }

    /// Native deposit into pool 0
    pub fn native(native_value: u128, referrer_id: u64) -> Self {
        Self {
            pid: NATIVE_POOL,
            native_value,
            referrer_id,
            ..Self::default()
        }
    }

    pub fn with_deadline(mut self, deadline: u64) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_min_burn_out(mut self, min_burn_out: u128) -> Self {
        self.min_burn_out = min_burn_out;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DepositOutcome {
    /// Reward auto-claimed before the deposit
    pub reward_paid: u128,
    pub split: DepositSplit,
    pub shares_issued: u128,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WithdrawOutcome {
    /// Reward auto-claimed before the withdrawal
    pub reward_paid: u128,
    pub shares_redeemed: u128,
    /// Want released by the strategy
    pub want_withdrawn: u128,
    pub fee: u128,
    /// Amount that reached the user after the fee and the balance cap
    pub amount_paid: u128,
}

impl<R, B, W> VaultBank<R, B, W>
where
    R: ReferralRegistry + Clone,
    B: BuyBack + Clone,
    W: NativeWrapper + Clone,
{
    /// Deposit into a pool on behalf of `user`.
    ///
    /// # Errors
    /// * `DeadlineExpired` if `block.timestamp` is past the deadline
    /// * `UnexpectedNativeValue` for native value outside pool 0 or next to a token amount
    /// * `ZeroAmount` if nothing would reach the strategy
    /// * `UnknownReferrer` if `referrer_id` is not registered
    pub fn deposit(&mut self, user: &Address, req: DepositRequest, block: Block) -> Result<DepositOutcome> {
        self.atomically(|bank| bank.deposit_inner(user, &req, block))
    }

    fn deposit_inner(&mut self, user: &Address, req: &DepositRequest, block: Block) -> Result<DepositOutcome> {
        if let Some(deadline) = req.deadline {
            if block.timestamp > deadline {
                return Err(VaultError::DeadlineExpired);
            }
        }
        let now = self.advance(block)?;
        let pid = req.pid;
        let want = self.pools.pool(pid)?.want;

        let native = req.native_value > 0;
        if native && (pid != NATIVE_POOL || req.want_amt > 0) {
            return Err(VaultError::UnexpectedNativeValue);
        }
        let gross = if native { req.native_value } else { req.want_amt };
        if gross == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if self.referral.id_to_address(req.referrer_id).is_none() {
            return Err(VaultError::UnknownReferrer);
        }
        // Checked up front so no collaborator is touched for a deposit that
        // would forward nothing
        let preview = self.split_of(gross)?;
        if preview.savings == 0 {
            return Err(VaultError::ZeroAmount);
        }

        self.update_pool_at(pid, now)?;
        let reward_paid = self.settle_and_pay(pid, user)?;

        let accepted = if native {
            self.wrapper.wrap(req.native_value)?
        } else {
            req.want_amt
        };
        self.custody.credit(&want, accepted)?;
        let split = self.split_of(accepted)?;

        if self.referral.address_to_id(user).is_none() {
            self.referral.add_member(user, req.referrer_id)?;
        }
        if split.buy_and_burn > 0 {
            self.custody.debit(&want, split.buy_and_burn)?;
            self.buy_back
                .buy_and_burn(&want, split.buy_and_burn, req.min_burn_out, req.deadline)?;
        }
        if split.referral > 0 {
            self.custody.debit(&want, split.referral)?;
            self.referral.distribute_rewards(&want, split.referral, user)?;
        }

        self.custody.debit(&want, split.savings)?;
        let shares_issued = self.strategy_of_mut(pid)?.deposit(split.savings)?;
        let acc = self.pools.pool(pid)?.acc_reward_per_share;
        self.ledger.credit(pid, user, shares_issued, acc)?;

        log::debug!(
            "deposit pool={} gross={} burn={} referral={} savings={} shares={}",
            pid,
            accepted,
            split.buy_and_burn,
            split.referral,
            split.savings,
            shares_issued
        );
        self.events.push(VaultEvent::Deposit {
            user: *user,
            pid,
            amount: split.savings,
        });
        Ok(DepositOutcome {
            reward_paid,
            split,
            shares_issued,
        })
    }

    fn split_of(&self, amount: u128) -> Result<DepositSplit> {
        math::split_deposit(
            amount,
            self.split.buy_and_burn_pct,
            self.split.relationship_reward_pct,
            self.split.vaults_saving_pct,
        )
        .ok_or(VaultError::Overflow)
    }

    /// Redeem up to `shares` of `user`'s position in `pid`.
    ///
    /// Requests above the position are clamped to it. Zero shares only
    /// harvests the pending reward.
    ///
    /// # Errors
    /// * `NoPosition` if `user` holds no shares in `pid`
    pub fn withdraw(&mut self, user: &Address, pid: PoolId, shares: u128, block: Block) -> Result<WithdrawOutcome> {
        self.atomically(|bank| bank.withdraw_inner(user, pid, shares, block))
    }

    fn withdraw_inner(&mut self, user: &Address, pid: PoolId, shares: u128, block: Block) -> Result<WithdrawOutcome> {
        let now = self.advance(block)?;
        let want = self.pools.pool(pid)?.want;
        let held = self.ledger.position(pid, user).shares;
        if held == 0 {
            return Err(VaultError::NoPosition);
        }

        self.update_pool_at(pid, now)?;
        let reward_paid = self.settle_and_pay(pid, user)?;

        let shares_redeemed = shares.min(held);
        let want_withdrawn = if shares_redeemed > 0 {
            self.strategy_of_mut(pid)?.withdraw(shares_redeemed)?
        } else {
            0
        };
        let (to_user, fee) = math::apply_withdraw_fee(want_withdrawn, self.withdraw_fee_bps).ok_or(VaultError::InvalidFee)?;
        self.custody.credit(&want, want_withdrawn)?;

        if fee > 0 {
            let treasury = self.treasury;
            let payout = self.custody.safe_transfer(&want, &treasury, fee)?;
            self.events.push(VaultEvent::WithdrawFeeCollected {
                pid,
                treasury,
                amount: payout.sent,
            });
        }

        let amount_paid = if to_user == 0 {
            0
        } else if pid == NATIVE_POOL {
            let taken = self.custody.take_capped(&want, to_user);
            self.wrapper.unwrap(user, taken)?
        } else {
            self.custody.safe_transfer(&want, user, to_user)?.sent
        };

        let acc = self.pools.pool(pid)?.acc_reward_per_share;
        self.ledger.debit(pid, user, shares_redeemed, acc)?;

        log::debug!(
            "withdraw pool={} shares={} want={} fee={} paid={}",
            pid,
            shares_redeemed,
            want_withdrawn,
            fee,
            amount_paid
        );
        self.events.push(VaultEvent::Withdraw {
            user: *user,
            pid,
            amount: want_withdrawn,
        });
        Ok(WithdrawOutcome {
            reward_paid,
            shares_redeemed,
            want_withdrawn,
            fee,
            amount_paid,
        })
    }
}
