use super::*;

const OWNER: Address = [1u8; 32];
const TREASURY: Address = [2u8; 32];
const REWARD: AssetId = [3u8; 32];
const WNATIVE: AssetId = [4u8; 32];
const TOKEN: AssetId = [5u8; 32];
const ALICE: Address = [0xA1; 32];
const BOB: Address = [0xB0; 32];

const START: u64 = 100;
const RATE: u128 = 1_000_000;
const ROOT_ID: u64 = 1;

type TestBank = VaultBank<MemberRegistry, BuyBackQueue, OneToOneWrapper>;

fn new_bank() -> TestBank {
    let cfg = BankConfig::new(OWNER, TREASURY, REWARD, WNATIVE, START, RATE);
    VaultBank::new(
        cfg,
        Block::at(1),
        MemberRegistry::new(OWNER),
        BuyBackQueue::new(),
        OneToOneWrapper::new(WNATIVE),
    )
    .unwrap()
}

/// Native pool 0 (alloc 10) and token pool 1 (alloc 30)
fn bank_with_pools() -> TestBank {
    let mut bank = new_bank();
    let s0 = bank.add_strategy(&OWNER, Box::new(ShareStrategy::new(WNATIVE))).unwrap();
    let s1 = bank.add_strategy(&OWNER, Box::new(ShareStrategy::new(TOKEN))).unwrap();
    bank.add_pool(&OWNER, WNATIVE, 10, s0, false, Block::at(2)).unwrap();
    bank.add_pool(&OWNER, TOKEN, 30, s1, false, Block::at(2)).unwrap();
    bank
}

fn assert_share_conservation(bank: &TestBank) {
    for pid in 0..bank.pool_length() {
        let sid = bank.pool(pid).unwrap().binding;
        assert_eq!(
            bank.pool_user_shares(pid),
            bank.strategy(sid).unwrap().shares_total(),
            "pool {} ledger shares diverged from strategy",
            pid
        );
    }
}

#[test]
fn test_failed_deposit_restores_everything() {
    let mut bank = bank_with_pools();
    bank.fund_rewards(&REWARD, 1_000_000_000).unwrap();
    bank.deposit(&ALICE, DepositRequest::tokens(1, 1_000, ROOT_ID), Block::at(START))
        .unwrap();

    let before_pool = bank.pool(1).unwrap().clone();
    let before_pos = bank.user_info(1, &ALICE);
    let before_reserve = bank.reserve().balance(&REWARD);
    let before_events = bank.events().len();

    // Buy-back refuses after the auto-claim already ran inside the call
    let req = DepositRequest::tokens(1, 1_000, ROOT_ID).with_min_burn_out(u128::MAX);
    let res = bank.deposit(&ALICE, req, Block::at(START + 10));
    assert_eq!(res, Err(VaultError::Rejected("insufficient burn output")));

    assert_eq!(bank.pool(1).unwrap(), &before_pool);
    assert_eq!(bank.user_info(1, &ALICE), before_pos);
    assert_eq!(bank.reserve().balance(&REWARD), before_reserve);
    assert_eq!(bank.events().len(), before_events);
    assert_eq!(bank.last_block(), START);
    assert_share_conservation(&bank);
}

#[test]
fn test_block_cannot_move_backwards() {
    let mut bank = bank_with_pools();
    bank.deposit(&ALICE, DepositRequest::tokens(1, 1_000, ROOT_ID), Block::at(START + 5))
        .unwrap();
    let res = bank.claim(&ALICE, 1, Block::at(START + 4));
    assert_eq!(res, Err(VaultError::BlockInPast));
}

#[test]
fn test_pending_view_matches_claim() {
    let mut bank = bank_with_pools();
    bank.fund_rewards(&REWARD, u64::MAX as u128).unwrap();
    bank.deposit(&ALICE, DepositRequest::tokens(1, 1_000, ROOT_ID), Block::at(START))
        .unwrap();
    bank.deposit(&BOB, DepositRequest::tokens(1, 3_000, ROOT_ID), Block::at(START + 3))
        .unwrap();

    let view = bank.pending_reward(1, &ALICE, START + 17).unwrap();
    let paid = bank.claim(&ALICE, 1, Block::at(START + 17)).unwrap();
    assert_eq!(view, paid);
    assert!(paid > 0);
}

#[test]
fn test_strategy_binding_is_exclusive() {
    let mut bank = bank_with_pools();
    // Strategy 1 already backs pool 1
    let res = bank.add_pool(&OWNER, TOKEN, 5, 1, false, Block::at(3));
    assert_eq!(res, Err(VaultError::StrategyInUse));

    let wrong = bank.add_strategy(&OWNER, Box::new(ShareStrategy::new(REWARD))).unwrap();
    let res = bank.add_pool(&OWNER, TOKEN, 5, wrong, false, Block::at(3));
    assert_eq!(res, Err(VaultError::StrategyWantMismatch));
    assert_eq!(bank.pool_length(), 2);
    assert_eq!(bank.strategy_pool(wrong), None);
}

#[test]
fn test_first_pool_must_be_native() {
    let mut bank = new_bank();
    let sid = bank.add_strategy(&OWNER, Box::new(ShareStrategy::new(TOKEN))).unwrap();
    let res = bank.add_pool(&OWNER, TOKEN, 10, sid, false, Block::at(2));
    assert_eq!(res, Err(VaultError::InvalidNativePool));
    assert_eq!(bank.total_alloc_point(), 0);
}

#[test]
fn test_migration_rebinds_and_frees_old_strategy() {
    let mut bank = bank_with_pools();
    bank.deposit(&ALICE, DepositRequest::tokens(1, 1_000, ROOT_ID), Block::at(START))
        .unwrap();
    let fresh = bank.add_strategy(&OWNER, Box::new(ShareStrategy::new(TOKEN))).unwrap();
    bank.migrate_strategy(&OWNER, 1, fresh, Block::at(START + 1)).unwrap();

    assert_eq!(bank.pool(1).unwrap().binding, fresh);
    assert_eq!(bank.strategy_pool(fresh), Some(1));
    assert_eq!(bank.strategy_pool(1), None);
    assert!(bank.strategy(1).unwrap().is_empty());
    assert_share_conservation(&bank);
}

#[test]
fn test_referrer_checked_before_any_mutation() {
    let mut bank = bank_with_pools();
    let res = bank.deposit(&ALICE, DepositRequest::tokens(1, 1_000, 99), Block::at(START));
    assert_eq!(res, Err(VaultError::UnknownReferrer));
    assert_eq!(bank.referral().member_count(), 1);
    assert!(bank.buy_back().orders().is_empty());
}

#[test]
fn test_native_deposit_wraps_and_unwraps() {
    let mut bank = bank_with_pools();
    let out = bank
        .deposit(&ALICE, DepositRequest::native(1_000, ROOT_ID), Block::at(START))
        .unwrap();
    assert_eq!(out.shares_issued, 450);
    assert_eq!(bank.wrapper().wrapped_supply(), 1_000);

    let out = bank.withdraw(&ALICE, 0, 450, Block::at(START + 1)).unwrap();
    assert_eq!(out.amount_paid, 450);
    assert_eq!(bank.wrapper().native_sent(&ALICE), 450);
    assert_share_conservation(&bank);
}

#[test]
fn test_native_value_rejected_outside_pool_zero() {
    let mut bank = bank_with_pools();
    let mut req = DepositRequest::native(1_000, ROOT_ID);
    req.pid = 1;
    assert_eq!(
        bank.deposit(&ALICE, req, Block::at(START)),
        Err(VaultError::UnexpectedNativeValue)
    );
    let mut req = DepositRequest::native(1_000, ROOT_ID);
    req.want_amt = 5;
    assert_eq!(
        bank.deposit(&ALICE, req, Block::at(START)),
        Err(VaultError::UnexpectedNativeValue)
    );
}

#[test]
fn test_decay_settles_pools_at_old_rate() {
    let mut bank = bank_with_pools();
    bank.fund_rewards(&REWARD, u64::MAX as u128).unwrap();
    bank.deposit(&ALICE, DepositRequest::tokens(1, 1_000, ROOT_ID), Block::at(START))
        .unwrap();

    let owed_at_old_rate = bank.pending_reward(1, &ALICE, START + 20).unwrap();
    assert!(bank.update_reward_per_block(Block::at(START + 20)).unwrap());
    assert_eq!(bank.pending_reward(1, &ALICE, START + 20).unwrap(), owed_at_old_rate);
    assert_eq!(bank.pool(1).unwrap().last_reward_block, START + 20);
}

#[test]
fn test_owner_gates() {
    let mut bank = bank_with_pools();
    assert_eq!(bank.set_withdraw_fee(&ALICE, 10), Err(VaultError::Unauthorized));
    assert_eq!(bank.set_withdraw_fee(&OWNER, 10_001), Err(VaultError::InvalidFee));
    assert_eq!(
        bank.set_alloc_point(&ALICE, 1, 1, true, Block::at(3)),
        Err(VaultError::Unauthorized)
    );
    bank.transfer_ownership(&OWNER, ALICE).unwrap();
    bank.set_withdraw_fee(&ALICE, 10).unwrap();
    assert_eq!(bank.withdraw_fee_bps(), 10);
}

#[test]
fn test_withdraw_fee_follows_treasury() {
    const NEW_TREASURY: Address = [9u8; 32];
    let mut bank = bank_with_pools();
    assert_eq!(bank.set_treasury(&ALICE, NEW_TREASURY), Err(VaultError::Unauthorized));
    bank.set_treasury(&OWNER, NEW_TREASURY).unwrap();
    bank.set_withdraw_fee(&OWNER, 1_000).unwrap();

    let out = bank
        .deposit(&ALICE, DepositRequest::tokens(1, 1_000, ROOT_ID), Block::at(START))
        .unwrap();
    let w = bank.withdraw(&ALICE, 1, out.shares_issued, Block::at(START)).unwrap();

    assert_eq!(w.fee, 45);
    assert_eq!(bank.custody().paid_to(&TOKEN, &NEW_TREASURY), 45);
    assert_eq!(bank.custody().paid_to(&TOKEN, &TREASURY), 0);
    assert_eq!(bank.treasury(), NEW_TREASURY);
}

#[test]
fn test_public_pool_updates() {
    let mut bank = bank_with_pools();
    bank.deposit(&ALICE, DepositRequest::tokens(1, 1_000, ROOT_ID), Block::at(START))
        .unwrap();

    bank.update_pool(1, Block::at(START + 10)).unwrap();
    let reward = math::pool_reward(RATE, 10, 30, 40).unwrap();
    let expected = math::acc_increment(reward, 450).unwrap();
    assert_eq!(bank.pool(1).unwrap().acc_reward_per_share, expected);
    assert_eq!(bank.pool(1).unwrap().last_reward_block, START + 10);

    // Same block again changes nothing
    bank.update_pool(1, Block::at(START + 10)).unwrap();
    assert_eq!(bank.pool(1).unwrap().acc_reward_per_share, expected);

    bank.mass_update_pools(Block::at(START + 20)).unwrap();
    // Empty pool only moves its block
    assert_eq!(bank.pool(0).unwrap().acc_reward_per_share, 0);
    assert_eq!(bank.pool(0).unwrap().last_reward_block, START + 20);
    assert!(bank.pool(1).unwrap().acc_reward_per_share > expected);
    assert_eq!(bank.update_pool(7, Block::at(START + 20)), Err(VaultError::PoolNotFound));
}
