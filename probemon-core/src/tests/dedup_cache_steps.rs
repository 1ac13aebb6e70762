//! Step definitions for the dedup cache scenarios.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::LruCache;

#[derive(Debug)]
struct CacheWorld {
    cache: RefCell<LruCache<String, i64>>,
}

impl CacheWorld {
    fn put(&self, key: &str, value: i64) {
        self.cache.borrow_mut().put(key.to_owned(), value);
    }

    fn contains(&self, key: &str) -> bool {
        self.cache.borrow().contains(&key.to_owned())
    }
}

#[fixture]
fn world() -> CacheWorld {
    CacheWorld {
        cache: RefCell::new(LruCache::new(1)),
    }
}

#[given("a cache of capacity 3 holding A, B and C in that order")]
fn given_abc(world: &CacheWorld) {
    world.cache.replace(LruCache::new(3));
    world.put("A", 1);
    world.put("B", 2);
    world.put("C", 3);
}

#[when("A is read and D is inserted")]
fn when_read_then_insert(world: &CacheWorld) {
    assert_eq!(world.cache.borrow_mut().get(&"A".to_owned()), Some(&1));
    world.put("D", 4);
}

#[when("D is inserted")]
fn when_insert(world: &CacheWorld) {
    world.put("D", 4);
}

#[then("B has been evicted")]
fn then_b_evicted(world: &CacheWorld) {
    assert!(!world.contains("B"));
}

#[then("A has been evicted")]
fn then_a_evicted(world: &CacheWorld) {
    assert!(!world.contains("A"));
}

#[then("A, C and D remain cached")]
fn then_acd(world: &CacheWorld) {
    assert!(["A", "C", "D"].iter().all(|key| world.contains(key)));
    assert_eq!(world.cache.borrow().len(), 3);
}

#[then("B, C and D remain cached")]
fn then_bcd(world: &CacheWorld) {
    assert!(["B", "C", "D"].iter().all(|key| world.contains(key)));
    assert_eq!(world.cache.borrow().len(), 3);
}

#[scenario(path = "tests/features/dedup_cache.feature", index = 0)]
fn read_protects_entry(world: CacheWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/dedup_cache.feature", index = 1)]
fn untouched_entries_leave_in_order(world: CacheWorld) {
    let _ = world;
}
