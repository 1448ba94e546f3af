//! Clear: destroy order, hook-less clearing and reuse afterwards.

mod common;

use common::{Probe, pool, pool_with};
use nebula_pool::{ObjectPool, OverflowMode, PoolConfig, Released};
use pretty_assertions::assert_eq;

const MAX_POOL_SIZE: usize = 5;

#[test]
fn clear_destroys_inactive_then_active() {
    let config = PoolConfig::new(MAX_POOL_SIZE, OverflowMode::HardLimit).with_starting_count(3);
    let (mut pool, probe) = pool_with(config);
    let first = pool.get().unwrap().unwrap();
    let second = pool.get().unwrap().unwrap();

    pool.clear();

    assert_eq!(probe.destroy_order(), vec![2, 0, 1]);
    assert!(first.is_destroyed());
    assert!(second.is_destroyed());
    assert_eq!(pool.count_all(), 0);
    assert_eq!(pool.max_size(), MAX_POOL_SIZE);
}

#[test]
fn clear_destroys_every_inactive_item() {
    let config = PoolConfig::new(MAX_POOL_SIZE, OverflowMode::HardLimit)
        .with_starting_count(MAX_POOL_SIZE);
    let (mut pool, probe) = pool_with(config);

    pool.clear();

    assert_eq!(probe.destroyed(), MAX_POOL_SIZE);
    assert_eq!(pool.count_all(), 0);
}

#[test]
fn clear_destroys_every_active_item() {
    let (mut pool, probe) = pool(MAX_POOL_SIZE, OverflowMode::HardLimit);
    pool.get_many(MAX_POOL_SIZE).for_each(drop);
    assert_eq!(pool.count_active(), MAX_POOL_SIZE);

    pool.clear();

    assert_eq!(probe.destroyed(), MAX_POOL_SIZE);
    assert_eq!(pool.count_all(), 0);
}

#[test]
fn clear_on_empty_pool_is_a_no_op() {
    let (mut pool, probe) = pool(MAX_POOL_SIZE, OverflowMode::HardLimit);
    pool.clear();
    assert_eq!(pool.count_all(), 0);
    assert_eq!(probe.destroyed(), 0);
}

#[test]
fn clear_without_destroy_hook_empties_pool() {
    let probe = Probe::new();
    let config = PoolConfig::new(MAX_POOL_SIZE, OverflowMode::HardLimit).with_starting_count(2);
    let mut pool = ObjectPool::new(config, probe.lifecycle_without_destroy()).unwrap();
    let entity = pool.get().unwrap().unwrap();

    pool.clear();

    assert_eq!(pool.count_all(), 0);
    assert!(!entity.is_destroyed());
}

#[test]
fn items_held_across_clear_are_no_longer_tracked() {
    let (mut pool, _) = pool(MAX_POOL_SIZE, OverflowMode::HardLimit);
    let entity = pool.get().unwrap().unwrap();

    pool.clear();

    assert_eq!(pool.release(&entity), Released::Ignored);
    assert_eq!(pool.count_all(), 0);
}

#[test]
fn pool_is_usable_after_clear() {
    let (mut pool, probe) = pool(MAX_POOL_SIZE, OverflowMode::HardLimit);
    pool.get_many(MAX_POOL_SIZE).for_each(drop);
    pool.clear();

    let fresh = pool.get().unwrap().unwrap();

    assert_eq!(fresh.id(), MAX_POOL_SIZE);
    assert_eq!(probe.created(), MAX_POOL_SIZE + 1);
    assert_eq!(pool.count_active(), 1);
}
