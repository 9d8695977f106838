//! Balances held in custody by a vault or farm

use std::collections::BTreeMap;

use crate::error::{Result, VaultError};
use crate::{Address, AssetId};

/// One transfer leaving custody, recorded for callers and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payout {
    pub asset: AssetId,
    pub to: Address,
    pub requested: u128,
    pub sent: u128,
}

/// Asset balances owned by the engine plus per-recipient totals sent out.
///
/// Outgoing transfers to users go through [`AssetBook::safe_transfer`],
/// which sends at most what the book holds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetBook {
    balances: BTreeMap<AssetId, u128>,
    paid_out: BTreeMap<(AssetId, Address), u128>,
}

impl AssetBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, asset: &AssetId) -> u128 {
        self.balances.get(asset).copied().unwrap_or(0)
    }

    /// Cumulative amount of `asset` sent to `to`
    pub fn paid_to(&self, asset: &AssetId, to: &Address) -> u128 {
        self.paid_out.get(&(*asset, *to)).copied().unwrap_or(0)
    }

    pub fn credit(&mut self, asset: &AssetId, amount: u128) -> Result<()> {
        let bal = self.balance(asset).checked_add(amount).ok_or(VaultError::Overflow)?;
        self.balances.insert(*asset, bal);
        Ok(())
    }

    /// Exact debit; fails if the book holds less than `amount`.
    pub fn debit(&mut self, asset: &AssetId, amount: u128) -> Result<()> {
        let bal = self
            .balance(asset)
            .checked_sub(amount)
            .ok_or(VaultError::InsufficientBalance)?;
        self.balances.insert(*asset, bal);
        Ok(())
    }

    /// Debit `min(amount, balance)` and return what was taken.
    pub fn take_capped(&mut self, asset: &AssetId, amount: u128) -> u128 {
        let bal = self.balance(asset);
        let taken = amount.min(bal);
        if taken < amount {
            log::warn!(
                "transfer clamped to custody balance: requested={} sent={}",
                amount,
                taken
            );
        }
        self.balances.insert(*asset, bal - taken);
        taken
    }

    /// Send `min(amount, balance)` of `asset` to `to`.
    pub fn safe_transfer(&mut self, asset: &AssetId, to: &Address, amount: u128) -> Result<Payout> {
        let sent = self.take_capped(asset, amount);
        if sent > 0 {
            let total = self
                .paid_to(asset, to)
                .checked_add(sent)
                .ok_or(VaultError::Overflow)?;
            self.paid_out.insert((*asset, *to), total);
        }
        Ok(Payout {
            asset: *asset,
            to: *to,
            requested: amount,
            sent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: AssetId = [7u8; 32];
    const USER: Address = [9u8; 32];

    #[test]
    fn test_safe_transfer_clamps_to_balance() {
        let mut book = AssetBook::new();
        book.credit(&TOKEN, 40).unwrap();
        let p = book.safe_transfer(&TOKEN, &USER, 100).unwrap();
        assert_eq!(p.sent, 40);
        assert_eq!(book.balance(&TOKEN), 0);
        assert_eq!(book.paid_to(&TOKEN, &USER), 40);
    }

    #[test]
    fn test_debit_is_exact() {
        let mut book = AssetBook::new();
        book.credit(&TOKEN, 10).unwrap();
        assert_eq!(book.debit(&TOKEN, 11), Err(VaultError::InsufficientBalance));
        book.debit(&TOKEN, 10).unwrap();
        assert_eq!(book.balance(&TOKEN), 0);
    }
}
