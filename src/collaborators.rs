//! External collaborators the vault calls into
//!
//! Each collaborator is a trait the vault is generic over, with a small
//! in-memory implementation used by tests and local simulations. All of
//! them must leave their own state untouched when they return `Err`.

use std::collections::BTreeMap;

use crate::error::{Result, VaultError};
use crate::math;
use crate::{Address, AssetId, Block, PoolId};

// ============================================================================
// Traits
// ============================================================================

/// Referral (member) tree.
pub trait ReferralRegistry {
    /// Member id of `user`, if registered
    fn address_to_id(&self, user: &Address) -> Option<u64>;

    /// Address registered under `id`
    fn id_to_address(&self, id: u64) -> Option<Address>;

    /// Register `user` below the member `referrer_id`.
    fn add_member(&mut self, user: &Address, referrer_id: u64) -> Result<u64>;

    /// Hand the referral cut of a deposit made by `user` to the tree.
    fn distribute_rewards(&mut self, asset: &AssetId, amount: u128, user: &Address) -> Result<()>;
}

/// Buy-and-burn sink for the first cut of every deposit.
pub trait BuyBack {
    fn buy_and_burn(&mut self, asset: &AssetId, amount: u128, min_burn_out: u128, deadline: Option<u64>) -> Result<()>;
}

/// Native currency wrapper backing pool 0.
pub trait NativeWrapper {
    /// Asset id of the wrapped token
    fn wrapped_asset(&self) -> AssetId;

    /// Wrap `amount` of native value, returning wrapped units received.
    fn wrap(&mut self, amount: u128) -> Result<u128>;

    /// Unwrap `amount` and pay the native value to `to`.
    fn unwrap(&mut self, to: &Address, amount: u128) -> Result<u128>;
}

/// Entry point a sibling ledger exposes for vault-forwarded deposits.
pub trait FarmingDeposit {
    fn deposit_from_vault(
        &mut self,
        pid: PoolId,
        user: &Address,
        asset: &AssetId,
        amount: u128,
        block: Block,
    ) -> Result<()>;
}

// ============================================================================
// In-memory implementations
// ============================================================================

/// Flat member registry. Ids start at 1; the root is registered on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemberRegistry {
    ids: BTreeMap<Address, u64>,
    members: Vec<Address>,
    upline: BTreeMap<Address, Address>,
    /// Referral rewards received per (asset, member)
    rewards: BTreeMap<(AssetId, Address), u128>,
    /// Referral value that found no upline
    undistributed: BTreeMap<AssetId, u128>,
}

impl MemberRegistry {
    pub fn new(root: Address) -> Self {
        let mut reg = Self::default();
        reg.ids.insert(root, 1);
        reg.members.push(root);
        reg
    }

    pub fn upline(&self, user: &Address) -> Option<Address> {
        self.upline.get(user).copied()
    }

    pub fn reward_of(&self, asset: &AssetId, member: &Address) -> u128 {
        self.rewards.get(&(*asset, *member)).copied().unwrap_or(0)
    }

    pub fn undistributed(&self, asset: &AssetId) -> u128 {
        self.undistributed.get(asset).copied().unwrap_or(0)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

impl ReferralRegistry for MemberRegistry {
    fn address_to_id(&self, user: &Address) -> Option<u64> {
        self.ids.get(user).copied()
    }

    fn id_to_address(&self, id: u64) -> Option<Address> {
        let idx = usize::try_from(id).ok()?.checked_sub(1)?;
        self.members.get(idx).copied()
    }

    fn add_member(&mut self, user: &Address, referrer_id: u64) -> Result<u64> {
        if let Some(id) = self.address_to_id(user) {
            return Ok(id);
        }
        let referrer = self.id_to_address(referrer_id).ok_or(VaultError::UnknownReferrer)?;
        self.members.push(*user);
        let id = self.members.len() as u64;
        self.ids.insert(*user, id);
        self.upline.insert(*user, referrer);
        Ok(id)
    }

    fn distribute_rewards(&mut self, asset: &AssetId, amount: u128, user: &Address) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        match self.upline(user) {
            Some(referrer) => {
                let total = self
                    .reward_of(asset, &referrer)
                    .checked_add(amount)
                    .ok_or(VaultError::Overflow)?;
                self.rewards.insert((*asset, referrer), total);
            }
            None => {
                let total = self
                    .undistributed(asset)
                    .checked_add(amount)
                    .ok_or(VaultError::Overflow)?;
                self.undistributed.insert(*asset, total);
            }
        }
        Ok(())
    }
}

/// One queued buy-and-burn order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BurnOrder {
    pub asset: AssetId,
    pub amount: u128,
    pub min_burn_out: u128,
    pub deadline: Option<u64>,
}

/// Buy-back that records orders and quotes at a fixed price.
///
/// `price_bps` converts input into burn output (10 000 == 1:1); an order
/// whose quote is below `min_burn_out` is refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuyBackQueue {
    pub price_bps: u16,
    orders: Vec<BurnOrder>,
}

impl Default for BuyBackQueue {
    fn default() -> Self {
        Self {
            price_bps: 10_000,
            orders: Vec::new(),
        }
    }
}

impl BuyBackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> &[BurnOrder] {
        &self.orders
    }

    pub fn total_for(&self, asset: &AssetId) -> u128 {
        self.orders
            .iter()
            .filter(|o| &o.asset == asset)
            .map(|o| o.amount)
            .sum()
    }
}

impl BuyBack for BuyBackQueue {
    fn buy_and_burn(&mut self, asset: &AssetId, amount: u128, min_burn_out: u128, deadline: Option<u64>) -> Result<()> {
        let quote = math::mul_div(amount, self.price_bps as u128, math::BPS_DENOMINATOR).ok_or(VaultError::Overflow)?;
        if quote < min_burn_out {
            return Err(VaultError::Rejected("insufficient burn output"));
        }
        self.orders.push(BurnOrder {
            asset: *asset,
            amount,
            min_burn_out,
            deadline,
        });
        Ok(())
    }
}

/// Wrapper with a fixed 1:1 rate between native and wrapped units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OneToOneWrapper {
    asset: AssetId,
    wrapped_supply: u128,
    native_sent: BTreeMap<Address, u128>,
}

impl OneToOneWrapper {
    pub fn new(asset: AssetId) -> Self {
        Self {
            asset,
            wrapped_supply: 0,
            native_sent: BTreeMap::new(),
        }
    }

    pub fn wrapped_supply(&self) -> u128 {
        self.wrapped_supply
    }

    /// Native value paid out to `to` so far
    pub fn native_sent(&self, to: &Address) -> u128 {
        self.native_sent.get(to).copied().unwrap_or(0)
    }
}

impl NativeWrapper for OneToOneWrapper {
    fn wrapped_asset(&self) -> AssetId {
        self.asset
    }

    fn wrap(&mut self, amount: u128) -> Result<u128> {
        self.wrapped_supply = self.wrapped_supply.checked_add(amount).ok_or(VaultError::Overflow)?;
        Ok(amount)
    }

    fn unwrap(&mut self, to: &Address, amount: u128) -> Result<u128> {
        let supply = self
            .wrapped_supply
            .checked_sub(amount)
            .ok_or(VaultError::Rejected("unwrap exceeds wrapped supply"))?;
        let sent = self
            .native_sent(to)
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;
        self.wrapped_supply = supply;
        self.native_sent.insert(*to, sent);
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: Address = [1u8; 32];
    const USER: Address = [2u8; 32];
    const ASSET: AssetId = [5u8; 32];

    #[test]
    fn test_member_ids_round_trip() {
        let mut reg = MemberRegistry::new(ROOT);
        assert_eq!(reg.address_to_id(&ROOT), Some(1));
        assert_eq!(reg.add_member(&USER, 1), Ok(2));
        assert_eq!(reg.id_to_address(2), Some(USER));
        assert_eq!(reg.id_to_address(0), None);
        // Re-registration keeps the first id
        assert_eq!(reg.add_member(&USER, 1), Ok(2));
        assert_eq!(reg.add_member(&[3u8; 32], 42), Err(VaultError::UnknownReferrer));
    }

    #[test]
    fn test_referral_reward_goes_upline() {
        let mut reg = MemberRegistry::new(ROOT);
        reg.add_member(&USER, 1).unwrap();
        reg.distribute_rewards(&ASSET, 39, &USER).unwrap();
        assert_eq!(reg.reward_of(&ASSET, &ROOT), 39);
        reg.distribute_rewards(&ASSET, 10, &ROOT).unwrap();
        assert_eq!(reg.undistributed(&ASSET), 10);
    }

    #[test]
    fn test_buy_back_min_out() {
        let mut bb = BuyBackQueue::new();
        bb.price_bps = 9_000;
        assert_eq!(
            bb.buy_and_burn(&ASSET, 100, 91, None),
            Err(VaultError::Rejected("insufficient burn output"))
        );
        bb.buy_and_burn(&ASSET, 100, 90, Some(5)).unwrap();
        assert_eq!(bb.total_for(&ASSET), 100);
        assert_eq!(bb.orders().len(), 1);
    }

    #[test]
    fn test_wrapper_unwrap_bounded_by_supply() {
        let mut w = OneToOneWrapper::new(ASSET);
        w.wrap(50).unwrap();
        assert!(w.unwrap(&USER, 51).is_err());
        assert_eq!(w.unwrap(&USER, 20), Ok(20));
        assert_eq!(w.native_sent(&USER), 20);
        assert_eq!(w.wrapped_supply(), 30);
    }
}
