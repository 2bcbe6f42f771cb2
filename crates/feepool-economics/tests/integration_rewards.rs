//! Integration tests for liquidation reward streaming
//!
//! Stake changes go through the in-memory debt share ledger, which invokes
//! the pool's stake-change hook before touching any balance.

use feepool_core::decimal::units;
use feepool_core::{AccountId, Asset, FeePoolError};
use feepool_economics::testing::InMemoryCollaborators;
use feepool_economics::{FeePool, FeePoolConfig, FeePoolEvent, Notified};

fn alice() -> AccountId {
    AccountId::new([1u8; 32])
}

fn bob() -> AccountId {
    AccountId::new([2u8; 32])
}

fn create_pool() -> (FeePool, InMemoryCollaborators) {
    let env = InMemoryCollaborators::new(0);
    let pool = FeePool::new(FeePoolConfig::default(), env.collaborators(), 0).unwrap();
    (pool, env)
}

#[test]
fn test_late_staker_shares_only_later_inflow() {
    let (mut pool, env) = create_pool();
    env.shares.mint(&mut pool, alice(), units(100)).unwrap();

    let r1 = units(60);
    let r2 = units(40);
    pool.notify_reward_amount(r1).unwrap();
    env.shares.mint(&mut pool, bob(), units(100)).unwrap();
    pool.notify_reward_amount(r2).unwrap();

    assert_eq!(pool.earned(&alice()).unwrap(), r1 + r2 / 2);
    assert_eq!(pool.earned(&bob()).unwrap(), r2 / 2);
}

#[test]
fn test_burn_checkpoints_before_reducing_stake() {
    let (mut pool, env) = create_pool();
    env.shares.mint(&mut pool, alice(), units(10)).unwrap();
    env.shares.mint(&mut pool, bob(), units(10)).unwrap();
    pool.notify_reward_amount(units(20)).unwrap();

    env.shares.burn(&mut pool, alice(), units(10)).unwrap();
    pool.notify_reward_amount(units(20)).unwrap();

    assert_eq!(pool.earned(&alice()).unwrap(), units(10));
    assert_eq!(pool.earned(&bob()).unwrap(), units(30));

    assert!(matches!(
        env.shares.burn(&mut pool, alice(), 1),
        Err(FeePoolError::InvalidInput(_))
    ));
}

#[test]
fn test_settle_is_idempotent() {
    let (mut pool, env) = create_pool();
    env.shares.mint(&mut pool, alice(), units(3)).unwrap();
    pool.notify_reward_amount(units(9)).unwrap();

    assert_eq!(pool.settle_rewards(&alice()).unwrap(), units(9));
    assert_eq!(pool.settle_rewards(&alice()).unwrap(), 0);
    assert_eq!(
        env.transfer.paid_to(&alice(), Asset::LiquidationRewards),
        units(9)
    );
    assert_eq!(pool.accumulator().total_paid(), units(9));

    let paid: Vec<_> = pool
        .events()
        .iter()
        .filter(|e| matches!(e, FeePoolEvent::RewardPaid { .. }))
        .collect();
    assert_eq!(paid.len(), 1);
}

#[test]
fn test_inflow_without_stake_waits_for_stakers() {
    let (mut pool, env) = create_pool();
    assert_eq!(
        pool.notify_reward_amount(units(5)).unwrap(),
        Notified::Pending { pending: units(5) }
    );
    assert_eq!(
        pool.drain_events(),
        vec![FeePoolEvent::RewardsNotified {
            amount: units(5),
            distributed: false
        }]
    );

    env.shares.mint(&mut pool, alice(), units(1)).unwrap();
    pool.distribute_pending_rewards().unwrap();
    assert_eq!(pool.earned(&alice()).unwrap(), units(5));
}

#[test]
fn test_rewards_sum_to_inflow() {
    let (mut pool, env) = create_pool();
    env.shares.mint(&mut pool, alice(), units(1)).unwrap();
    env.shares.mint(&mut pool, bob(), units(3)).unwrap();
    pool.notify_reward_amount(units(8)).unwrap();
    env.shares.mint(&mut pool, alice(), units(4)).unwrap();
    pool.notify_reward_amount(units(16)).unwrap();

    let a = pool.settle_rewards(&alice()).unwrap();
    let b = pool.settle_rewards(&bob()).unwrap();
    // alice: 2 + 16 * 5/8 = 12; bob: 6 + 16 * 3/8 = 12
    assert_eq!((a, b), (units(12), units(12)));
    assert_eq!(a + b, pool.accumulator().total_notified());
}

#[test]
fn test_uneven_stake_pays_exact_sum() {
    let (mut pool, env) = create_pool();
    env.shares.mint(&mut pool, alice(), units(3)).unwrap();
    pool.notify_reward_amount(units(1)).unwrap();
    pool.notify_reward_amount(units(1)).unwrap();

    assert_eq!(pool.settle_rewards(&alice()).unwrap(), units(2));
    assert_eq!(
        env.transfer.paid_to(&alice(), Asset::LiquidationRewards),
        units(2)
    );
    assert_eq!(pool.settle_rewards(&alice()).unwrap(), 0);
}
