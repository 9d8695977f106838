use super::*;

#[kani::proof]
fn kani_mul_div_matches_native_when_product_fits() {
    let a: u64 = kani::any();
    let b: u64 = kani::any();
    let d: u64 = kani::any();
    kani::assume(d > 0);

    let expected = (a as u128) * (b as u128) / (d as u128);
    assert_eq!(math::mul_div(a as u128, b as u128, d as u128), Some(expected));
}

#[kani::proof]
fn kani_withdraw_fee_conserves_amount() {
    let amount: u64 = kani::any();
    let fee: u16 = kani::any();
    kani::assume(fee <= 10_000);

    let (to_user, fee_amt) = math::apply_withdraw_fee(amount as u128, fee).unwrap();
    assert_eq!(to_user + fee_amt, amount as u128);
    assert!(to_user <= amount as u128);
    if fee == 0 {
        assert_eq!(fee_amt, 0);
    }
}

#[kani::proof]
fn kani_split_conserves_amount() {
    let amount: u64 = kani::any();
    let split = math::split_deposit(amount as u128, 16, 39, 45).unwrap();
    assert_eq!(split.total(), amount as u128);
    assert!(split.dust < 3);
}

#[kani::proof]
fn kani_pending_never_exceeds_pool_reward() {
    let reward: u32 = kani::any();
    let shares: u32 = kani::any();
    kani::assume(shares > 0);

    let acc = math::acc_increment(reward as u128, shares as u128).unwrap();
    let pending = math::pending_reward(shares as u128, acc, 0).unwrap();
    assert!(pending <= reward as u128);
}

#[kani::proof]
#[kani::unwind(3)]
fn kani_decay_applies_at_most_once_per_call() {
    let now: u64 = kani::any();
    let mut schedule = EmissionSchedule::new(1_000_000, 0, 20, 985_000_000_000, Some(3));

    let changed = schedule.update(now).unwrap();
    assert_eq!(changed, now >= 20);
    if changed {
        assert_eq!(schedule.decays_applied, 1);
        assert_eq!(schedule.last_decay_block, 20);
        assert_eq!(schedule.reward_per_block, 985_000);
    }
}
