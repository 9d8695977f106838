//! Custody delegation: the strategy seam and a reference implementation
//!
//! The vault never assumes one share is worth one unit of want. Every
//! conversion between the two goes through [`Strategy::deposit`] and
//! [`Strategy::withdraw`], so a strategy that compounds can grow
//! `want_locked_total` without the vault's ledger changing.

use crate::error::{Result, VaultError};
use crate::math;
use crate::AssetId;

/// Yield strategy a pool delegates custody to.
///
/// Implementations that return `Err` must leave their state untouched.
pub trait Strategy: std::fmt::Debug {
    /// Asset this strategy manages
    fn want(&self) -> AssetId;

    /// Want held by the strategy, including compounded yield
    fn want_locked_total(&self) -> u128;

    /// Shares outstanding
    fn shares_total(&self) -> u128;

    /// Take `amount` of want into custody.
    ///
    /// # Returns
    /// * shares issued for the deposit
    fn deposit(&mut self, amount: u128) -> Result<u128>;

    /// Redeem `shares`.
    ///
    /// # Returns
    /// * want released to the vault
    fn withdraw(&mut self, shares: u128) -> Result<u128>;

    /// Adopt the full book of a strategy being retired.
    fn migrate_from(&mut self, want_locked: u128, shares_total: u128) -> Result<()>;

    fn is_empty(&self) -> bool {
        self.shares_total() == 0 && self.want_locked_total() == 0
    }

    /// Fold externally earned yield into the exchange rate.
    fn compound(&mut self, _earned: u128) -> Result<()> {
        Err(VaultError::Rejected("strategy does not compound"))
    }

    /// Clone into a box so a vault can snapshot its strategies
    fn box_clone(&self) -> Box<dyn Strategy>;
}

impl Clone for Box<dyn Strategy> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

// ============================================================================
// Reference strategy
// ============================================================================

/// Pro-rata share strategy.
///
/// The first deposit mints shares 1:1. Later deposits mint
/// `amount * shares_total / want_locked_total`, redemptions pay
/// `shares * want_locked_total / shares_total`, both floored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareStrategy {
    want: AssetId,
    want_locked_total: u128,
    shares_total: u128,
}

impl ShareStrategy {
    pub fn new(want: AssetId) -> Self {
        Self {
            want,
            want_locked_total: 0,
            shares_total: 0,
        }
    }

    /// Shares `amount` would mint right now
    pub fn shares_for_deposit(&self, amount: u128) -> Result<u128> {
        match (self.shares_total, self.want_locked_total) {
            (0, 0) => Ok(amount),
            // Value without shares would be captured by the next depositor
            (0, _) => Err(VaultError::Rejected("strategy holds orphaned value")),
            (_, 0) => Err(VaultError::Rejected("strategy shares have no backing")),
            (shares, locked) => math::mul_div(amount, shares, locked).ok_or(VaultError::Overflow),
        }
    }
}

impl Strategy for ShareStrategy {
    fn want(&self) -> AssetId {
        self.want
    }

    fn want_locked_total(&self) -> u128 {
        self.want_locked_total
    }

    fn shares_total(&self) -> u128 {
        self.shares_total
    }

    fn deposit(&mut self, amount: u128) -> Result<u128> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let shares = self.shares_for_deposit(amount)?;
        if shares == 0 {
            return Err(VaultError::Rejected("deposit too small to mint a share"));
        }
        let locked = self
            .want_locked_total
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;
        let total = self.shares_total.checked_add(shares).ok_or(VaultError::Overflow)?;
        self.want_locked_total = locked;
        self.shares_total = total;
        Ok(shares)
    }

    fn withdraw(&mut self, shares: u128) -> Result<u128> {
        if shares > self.shares_total {
            return Err(VaultError::InsufficientShares);
        }
        if shares == 0 {
            return Ok(0);
        }
        let amount = math::mul_div(shares, self.want_locked_total, self.shares_total).ok_or(VaultError::Overflow)?;
        self.shares_total -= shares;
        self.want_locked_total -= amount;
        Ok(amount)
    }

    fn migrate_from(&mut self, want_locked: u128, shares_total: u128) -> Result<()> {
        if !Strategy::is_empty(self) {
            return Err(VaultError::NewStrategyNotEmpty);
        }
        self.want_locked_total = want_locked;
        self.shares_total = shares_total;
        Ok(())
    }

    fn compound(&mut self, earned: u128) -> Result<()> {
        if self.shares_total == 0 {
            return Err(VaultError::Rejected("nothing to compound into"));
        }
        self.want_locked_total = self
            .want_locked_total
            .checked_add(earned)
            .ok_or(VaultError::Overflow)?;
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn Strategy> {
        Box::new(self.clone())
    }
}
