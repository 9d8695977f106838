//! Fixed-point accrual arithmetic
//!
//! Reward-per-share accumulators are stored as `u128` scaled by
//! [`ACC_SCALE`]. Every product that can exceed 128 bits goes through
//! [`mul_div`], which keeps a 256-bit intermediate and truncates toward zero.
//!
//! Rounding always favours the vault: shares issued, rewards accrued and
//! amounts paid are floored, never rounded up.

/// Scale of `acc_reward_per_share` and `reward_debt` (1e12)
pub const ACC_SCALE: u128 = 1_000_000_000_000;

/// Scale of the emission decay coefficient (1e12 == 1.0)
pub const COEFFICIENT_SCALE: u128 = 1_000_000_000_000;

/// Basis-point denominator for the withdraw fee
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Denominator for the deposit split percentages
pub const PERCENT_DENOMINATOR: u128 = 100;

const LO_MASK: u128 = (1u128 << 64) - 1;

/// Full 256-bit product of two u128 values, returned as (hi, lo).
///
/// a = a_hi * 2^64 + a_lo
/// b = b_hi * 2^64 + b_lo
///
/// a * b = a_hi * b_hi * 2^128
///       + (a_hi * b_lo + a_lo * b_hi) * 2^64
///       + a_lo * b_lo
#[inline]
fn wide_mul(a: u128, b: u128) -> (u128, u128) {
    let a_hi = a >> 64;
    let a_lo = a & LO_MASK;
    let b_hi = b >> 64;
    let b_lo = b & LO_MASK;

    // Each partial product is < 2^128
    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    // Middle column: < 3 * 2^64, never overflows
    let mid = (ll >> 64) + (lh & LO_MASK) + (hl & LO_MASK);

    let lo = (ll & LO_MASK) | ((mid & LO_MASK) << 64);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}

/// Divide the 256-bit value (hi, lo) by `d` with shift-subtract long division.
///
/// Returns `None` when `d == 0` or the quotient does not fit in u128.
#[inline]
fn wide_div(hi: u128, lo: u128, d: u128) -> Option<u128> {
    if d == 0 || hi >= d {
        return None;
    }
    if hi == 0 {
        return Some(lo / d);
    }

    // Invariant: rem < d before each step
    let mut rem = hi;
    let mut quot = 0u128;
    for i in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> i) & 1);
        // With the carry bit set the true remainder is rem + 2^128 >= d
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quot |= 1u128 << i;
        }
    }
    Some(quot)
}

/// floor(a * b / d) with a 256-bit intermediate.
///
/// # Returns
/// * `None` if `d == 0` or the result exceeds `u128::MAX`
#[inline]
pub fn mul_div(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    if let Some(p) = a.checked_mul(b) {
        return Some(p / d);
    }
    let (hi, lo) = wide_mul(a, b);
    wide_div(hi, lo, d)
}

/// Reward emitted to one pool over `blocks` blocks.
///
/// `rate * blocks * alloc_point / total_alloc_point`, or 0 when no weight has
/// been registered yet.
pub fn pool_reward(
    reward_per_block: u128,
    blocks: u64,
    alloc_point: u64,
    total_alloc_point: u64,
) -> Option<u128> {
    if total_alloc_point == 0 || alloc_point == 0 || blocks == 0 {
        return Some(0);
    }
    let emitted = reward_per_block.checked_mul(blocks as u128)?;
    mul_div(emitted, alloc_point as u128, total_alloc_point as u128)
}

/// Accumulator increment for `reward` spread over `total_shares`.
///
/// Returns 0 when nobody holds shares; the reward for that span is simply
/// not distributed.
pub fn acc_increment(reward: u128, total_shares: u128) -> Option<u128> {
    if total_shares == 0 {
        return Some(0);
    }
    mul_div(reward, ACC_SCALE, total_shares)
}

/// shares * (acc - debt) / ACC_SCALE
///
/// A debt above the accumulator (never produced by the engine) yields 0.
pub fn pending_reward(shares: u128, acc_reward_per_share: u128, reward_debt: u128) -> Option<u128> {
    let delta = acc_reward_per_share.saturating_sub(reward_debt);
    if delta == 0 || shares == 0 {
        return Some(0);
    }
    mul_div(shares, delta, ACC_SCALE)
}

/// Apply a decay coefficient: rate * coefficient / 1e12
pub fn decay(rate: u128, coefficient: u128) -> Option<u128> {
    mul_div(rate, coefficient, COEFFICIENT_SCALE)
}

/// floor(amount * pct / 100)
pub fn percent_of(amount: u128, pct: u8) -> Option<u128> {
    mul_div(amount, pct as u128, PERCENT_DENOMINATOR)
}

/// How a deposit is divided between the buy-back, the referral tree and the
/// strategy. `dust` is the truncation remainder kept by the vault.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DepositSplit {
    pub buy_and_burn: u128,
    pub referral: u128,
    pub savings: u128,
    pub dust: u128,
}

impl DepositSplit {
    pub fn total(&self) -> u128 {
        self.buy_and_burn + self.referral + self.savings + self.dust
    }
}

/// Split `amount` by truncating percentages.
///
/// The three percentages must sum to at most 100 (enforced by config
/// validation); whatever truncation leaves over lands in `dust`.
pub fn split_deposit(
    amount: u128,
    buy_and_burn_pct: u8,
    referral_pct: u8,
    saving_pct: u8,
) -> Option<DepositSplit> {
    let buy_and_burn = percent_of(amount, buy_and_burn_pct)?;
    let referral = percent_of(amount, referral_pct)?;
    let savings = percent_of(amount, saving_pct)?;
    let dust = amount
        .checked_sub(buy_and_burn)?
        .checked_sub(referral)?
        .checked_sub(savings)?;
    Some(DepositSplit {
        buy_and_burn,
        referral,
        savings,
        dust,
    })
}

/// Split a withdrawn amount into (paid to user, fee).
///
/// The user side is floor(amount * (10000 - fee) / 10000); the fee is the
/// remainder so nothing is created or lost.
pub fn apply_withdraw_fee(amount: u128, fee_bps: u16) -> Option<(u128, u128)> {
    let fee_bps = fee_bps as u128;
    if fee_bps > BPS_DENOMINATOR {
        return None;
    }
    let to_user = mul_div(amount, BPS_DENOMINATOR - fee_bps, BPS_DENOMINATOR)?;
    Some((to_user, amount - to_user))
}

/// Want value of `shares` at the strategy's current exchange rate.
pub fn shares_to_want(shares: u128, want_locked_total: u128, shares_total: u128) -> u128 {
    if shares_total == 0 {
        return 0;
    }
    mul_div(shares, want_locked_total, shares_total).unwrap_or(u128::MAX)
}
