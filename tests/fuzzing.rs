//! Property tests for the vault engine
//!
//! These tests use proptest to generate random inputs and verify invariants hold.

use proptest::prelude::*;
use yield_vaults::math;
use yield_vaults::strategy::Strategy as _;
use yield_vaults::{
    Address, AssetId, BankConfig, Block, BuyBackQueue, DepositRequest, MemberRegistry, OneToOneWrapper,
    ShareStrategy, VaultBank,
};

const OWNER: Address = [1u8; 32];
const TREASURY: Address = [2u8; 32];
const REWARD: AssetId = [3u8; 32];
const WNATIVE: AssetId = [4u8; 32];
const TOKEN: AssetId = [5u8; 32];
const USERS: [Address; 3] = [[0xA1; 32], [0xB0; 32], [0xC0; 32]];
const START: u64 = 10;

type Bank = VaultBank<MemberRegistry, BuyBackQueue, OneToOneWrapper>;

fn bank(rate: u128, fee_bps: u16) -> Bank {
    let mut cfg = BankConfig::new(OWNER, TREASURY, REWARD, WNATIVE, START, rate);
    cfg.withdraw_fee_bps = fee_bps;
    let mut bank = VaultBank::new(
        cfg,
        Block::at(1),
        MemberRegistry::new(OWNER),
        BuyBackQueue::new(),
        OneToOneWrapper::new(WNATIVE),
    )
    .unwrap();
    let s0 = bank.add_strategy(&OWNER, Box::new(ShareStrategy::new(WNATIVE))).unwrap();
    let s1 = bank.add_strategy(&OWNER, Box::new(ShareStrategy::new(TOKEN))).unwrap();
    bank.add_pool(&OWNER, WNATIVE, 10, s0, false, Block::at(2)).unwrap();
    bank.add_pool(&OWNER, TOKEN, 30, s1, false, Block::at(2)).unwrap();
    bank.fund_rewards(&REWARD, u128::MAX / 4).unwrap();
    bank
}

#[derive(Clone, Debug)]
enum Op {
    Deposit { user: usize, amount: u128 },
    Withdraw { user: usize, shares: u128 },
    Claim { user: usize },
    Compound { earned: u128 },
    SetAlloc { alloc: u64 },
    Decay,
}

// Strategy for generating reasonable amounts
fn amount_strategy() -> impl Strategy<Value = u128> {
    1u128..10_000_000
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..3, amount_strategy()).prop_map(|(user, amount)| Op::Deposit { user, amount }),
        (0usize..3, 0u128..10_000_000).prop_map(|(user, shares)| Op::Withdraw { user, shares }),
        (0usize..3).prop_map(|user| Op::Claim { user }),
        (0u128..1_000_000).prop_map(|earned| Op::Compound { earned }),
        (0u64..100).prop_map(|alloc| Op::SetAlloc { alloc }),
        Just(Op::Decay),
    ]
}

fn apply(bank: &mut Bank, op: &Op, block: u64) {
    let b = Block::at(block);
    // Rejections are fine; the properties must hold either way
    let _ = match *op {
        Op::Deposit { user, amount } => bank
            .deposit(&USERS[user], DepositRequest::tokens(1, amount, 1), b)
            .map(|_| ()),
        Op::Withdraw { user, shares } => bank.withdraw(&USERS[user], 1, shares, b).map(|_| ()),
        Op::Claim { user } => bank.claim(&USERS[user], 1, b).map(|_| ()),
        Op::Compound { earned } => {
            let sid = bank.pool(1).unwrap().binding;
            bank.strategy_mut(sid).unwrap().compound(earned)
        }
        Op::SetAlloc { alloc } => bank.set_alloc_point(&OWNER, 1, alloc, true, b),
        Op::Decay => bank.update_reward_per_block(b).map(|_| ()),
    };
}

proptest! {
    #[test]
    fn fuzz_share_conservation(ops in prop::collection::vec((op_strategy(), 0u64..5), 1..40)) {
        let mut bank = bank(1_000_000_000, 500);
        let mut block = START;
        for (op, step) in &ops {
            block += step;
            apply(&mut bank, op, block);

            let sid = bank.pool(1).unwrap().binding;
            let ledger_sum: u128 = USERS.iter().map(|u| bank.user_info(1, u).shares).sum();
            prop_assert_eq!(ledger_sum, bank.pool_user_shares(1));
            prop_assert_eq!(ledger_sum, bank.strategy(sid).unwrap().shares_total());
        }
    }

    #[test]
    fn fuzz_accumulator_monotonic(ops in prop::collection::vec((op_strategy(), 0u64..5), 1..40)) {
        let mut bank = bank(25_728_640_000_000_000_000, 0);
        let mut block = START;
        let mut last_acc = 0u128;
        let mut last_reward_block = 0u64;
        for (op, step) in &ops {
            block += step;
            apply(&mut bank, op, block);

            let pool = bank.pool(1).unwrap();
            prop_assert!(pool.acc_reward_per_share >= last_acc);
            prop_assert!(pool.last_reward_block >= last_reward_block);
            prop_assert!(pool.last_reward_block <= block.max(START));
            last_acc = pool.acc_reward_per_share;
            last_reward_block = pool.last_reward_block;
        }
    }

    #[test]
    fn fuzz_no_double_payment(amount in amount_strategy(), blocks in 1u64..1_000) {
        let mut bank = bank(1_000_000_000, 0);
        let user = USERS[0];
        bank.deposit(&user, DepositRequest::tokens(1, amount.max(3), 1), Block::at(START)).unwrap();

        let first = bank.claim(&user, 1, Block::at(START + blocks)).unwrap();
        let second = bank.claim(&user, 1, Block::at(START + blocks)).unwrap();
        prop_assert!(first > 0);
        prop_assert_eq!(second, 0);
    }

    #[test]
    fn fuzz_deposit_split_exact(amount in 1u128..u128::MAX / 100) {
        let split = math::split_deposit(amount, 16, 39, 45).unwrap();
        prop_assert_eq!(split.savings, amount * 45 / 100);
        prop_assert_eq!(split.buy_and_burn, amount * 16 / 100);
        prop_assert_eq!(split.referral, amount * 39 / 100);
        prop_assert_eq!(split.total(), amount);
    }

    #[test]
    fn fuzz_strategy_receives_saving_cut(amount in 3u128..1_000_000_000_000) {
        let mut bank = bank(1, 0);
        let out = bank
            .deposit(&USERS[1], DepositRequest::tokens(1, amount, 1), Block::at(START))
            .unwrap();
        let sid = bank.pool(1).unwrap().binding;
        prop_assert_eq!(out.split.savings, amount * 45 / 100);
        prop_assert_eq!(bank.strategy(sid).unwrap().want_locked_total(), amount * 45 / 100);
    }

    #[test]
    fn fuzz_withdraw_fee_exact(amount in 3u128..1_000_000_000_000, fee in 0u16..=10_000) {
        let mut bank = bank(1, fee);
        let user = USERS[2];
        let out = bank
            .deposit(&user, DepositRequest::tokens(1, amount, 1), Block::at(START))
            .unwrap();
        let w = bank
            .withdraw(&user, 1, out.shares_issued, Block::at(START + 1))
            .unwrap();
        let expected = w.want_withdrawn * (10_000 - fee as u128) / 10_000;
        prop_assert_eq!(w.amount_paid, expected);
        prop_assert_eq!(w.fee, w.want_withdrawn - expected);
    }

    #[test]
    fn fuzz_mul_div_matches_native(a in 0u128..(1u128 << 64), b in 0u128..(1u128 << 64), d in 1u128..u128::MAX) {
        prop_assert_eq!(math::mul_div(a, b, d), Some(a * b / d));
    }

    #[test]
    fn fuzz_mul_div_wide_inverse(a in 1u128..u128::MAX, b in 1u128..u128::MAX) {
        // floor(a * b / b) == a whenever the quotient fits
        prop_assert_eq!(math::mul_div(a, b, b), Some(a));
    }
}
