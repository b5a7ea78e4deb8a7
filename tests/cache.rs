use std::sync::Arc;
use std::thread;
use std::time::Duration;

use htcache::{Cache, DefaultExpiration, Expiration, LruPolicy, NonePolicy, ShardedMap};

/// Installs a `tracing` subscriber for the duration of the test binary so
/// the `debug!`/`warn!` calls in `cache.rs`/`wheel.rs`/`hash.rs` have
/// somewhere to go. `try_init` rather than `init` because every test in
/// this binary calls it and only the first call may succeed.
fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

#[test]
fn set_never_persists_until_next_mutation() {
    init_tracing();
    let cache = Cache::new(
        DefaultExpiration::After(Duration::from_millis(50)),
        None,
        ShardedMap::new(16),
        NonePolicy::new(),
    );
    cache.set("a", 1, Expiration::Never);
    assert_eq!(cache.get("a").map(|v| *v), Some(1));
    cache.set("a", 2, Expiration::Never);
    assert_eq!(cache.get("a").map(|v| *v), Some(2));
    cache.delete("a");
    assert_eq!(cache.get("a"), None);
}

#[test]
fn delete_is_idempotent() {
    init_tracing();
    let cache = Cache::new(
        DefaultExpiration::Never,
        None,
        ShardedMap::new(16),
        NonePolicy::new(),
    );
    cache.set("a", 1, Expiration::Never);
    cache.delete("a");
    cache.delete("a"); // no-op, must not panic
    assert_eq!(cache.get("a"), None);
}

#[test]
fn empty_key_is_valid_and_distinct_from_absent() {
    init_tracing();
    let cache = Cache::new(
        DefaultExpiration::Never,
        None,
        ShardedMap::new(16),
        NonePolicy::new(),
    );
    assert_eq!(cache.get(""), None);
    cache.set("", 42, Expiration::Never);
    assert_eq!(cache.get("").map(|v| *v), Some(42));
}

#[test]
fn capacity_one_evicts_the_first_key_on_second_set() {
    init_tracing();
    let cache = Cache::new(
        DefaultExpiration::Never,
        None,
        ShardedMap::new(16),
        LruPolicy::new(1),
    );
    cache.set("a", 1, Expiration::Never);
    cache.set("b", 2, Expiration::Never);
    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.get("b").map(|v| *v), Some(2));
    assert_eq!(cache.len(), 1);
}

#[test]
fn add_fails_on_existing_key_and_replace_fails_on_missing_key() {
    init_tracing();
    let cache = Cache::new(
        DefaultExpiration::Never,
        None,
        ShardedMap::new(16),
        NonePolicy::new(),
    );
    cache.set("a", 1, Expiration::Never);
    assert!(cache.add("a", 2, Expiration::Never).is_err());
    assert_eq!(cache.get("a").map(|v| *v), Some(1));

    assert!(cache.replace("missing", 1, Expiration::Never).is_err());
    assert_eq!(cache.get("missing"), None);

    assert!(cache.add("b", 1, Expiration::Never).is_ok());
    assert!(cache.replace("b", 2, Expiration::Never).is_ok());
    assert_eq!(cache.get("b").map(|v| *v), Some(2));
}

#[test]
fn shard_count_one_and_sixteen_yield_correct_results() {
    init_tracing();
    for shards in [1usize, 16] {
        let cache = Cache::new(
            DefaultExpiration::Never,
            None,
            ShardedMap::new(shards),
            NonePolicy::new(),
        );
        for i in 0..200 {
            cache.set(&format!("k{i}"), i, Expiration::Never);
        }
        for i in 0..200 {
            assert_eq!(cache.get(&format!("k{i}")).map(|v| *v), Some(i));
        }
    }
}

// Scenario 1 from spec.md §8: mixed default / never / explicit TTL entries
// observed over several wall-clock checkpoints.
#[test]
fn end_to_end_mixed_expirations() {
    init_tracing();
    let cache = Cache::new(
        DefaultExpiration::After(Duration::from_millis(500)),
        Some(Duration::from_millis(50)),
        ShardedMap::new(16),
        NonePolicy::new(),
    );
    cache.set("a", 1, Expiration::Default);
    cache.set("b", 2, Expiration::Never);
    cache.set("c", 3, Expiration::After(Duration::from_millis(200)));
    cache.set("d", 4, Expiration::After(Duration::from_millis(700)));

    thread::sleep(Duration::from_millis(300));
    assert_eq!(cache.get("c"), None, "c should have expired by ~250ms");

    thread::sleep(Duration::from_millis(350));
    assert_eq!(cache.get("a"), None, "a should have expired by ~500ms");
    assert_eq!(cache.get("b").map(|v| *v), Some(2));
    assert_eq!(cache.get("d").map(|v| *v), Some(4));

    thread::sleep(Duration::from_millis(250));
    assert_eq!(cache.get("d"), None, "d should have expired by ~700ms");
}

// Scenario 2 from spec.md §8: LRU(3) eviction order under Get-driven promotion.
#[test]
fn end_to_end_lru_promotion_changes_eviction_order() {
    init_tracing();
    let cache = Cache::new(
        DefaultExpiration::Never,
        None,
        ShardedMap::new(16),
        LruPolicy::new(3),
    );
    cache.set("a", 1, Expiration::Never);
    cache.set("b", 2, Expiration::Never);
    cache.set("c", 3, Expiration::Never);
    assert_eq!(cache.get("a").map(|v| *v), Some(1));
    assert_eq!(cache.get("b").map(|v| *v), Some(2));
    // inserting "e" evicts the current LRU victim, which is now "c"
    // ("a" and "b" were both refreshed by the Gets above).
    cache.set("e", 5, Expiration::Never);
    assert_eq!(cache.get("c"), None);
    assert_eq!(cache.get("a").map(|v| *v), Some(1));
    assert_eq!(cache.get("b").map(|v| *v), Some(2));
    assert_eq!(cache.get("e").map(|v| *v), Some(5));
}

// Scenario 3 from spec.md §8 (scaled down): many concurrent workers hammering
// Set/Get/Delete against a capacity-bounded LRU cache; the map and the
// recency tracking must stay consistent afterwards.
#[test]
fn concurrent_workers_keep_len_within_capacity_bound() {
    init_tracing();
    let capacity = 100;
    let cache = Arc::new(Cache::new(
        DefaultExpiration::Never,
        None,
        ShardedMap::new(16),
        LruPolicy::new(capacity),
    ));
    let workers = 16;
    let ops_per_worker = 2000;

    let mut handles = Vec::new();
    for w in 0..workers {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for i in 0..ops_per_worker {
                let key = format!("k{}", (w * 7 + i) % 500);
                match i % 3 {
                    0 => cache.set(&key, i, Expiration::Never),
                    1 => {
                        cache.get(&key);
                    }
                    _ => cache.delete(&key),
                }
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    // approximate, concurrent inserts may transiently push len a bit over
    // capacity; it must not run away unboundedly.
    assert!(cache.len() <= capacity + workers);
}

// Scenario 4 from spec.md §8: different seeds spread the same key set
// differently across shards.
#[test]
fn different_instances_hash_keys_differently() {
    init_tracing();
    let a: ShardedMap<i32> = ShardedMap::new(64);
    let b: ShardedMap<i32> = ShardedMap::new(64);
    for i in 0..2000 {
        a.put(&format!("key-{i}"), i);
        b.put(&format!("key-{i}"), i);
    }
    // There is no public shard-index accessor; instead, confirm both maps
    // still answer every key correctly despite (almost certainly) differing
    // internal seeds -- a cross-check that seeding does not break lookups.
    for i in 0..2000 {
        let key = format!("key-{i}");
        assert_eq!(a.get(&key).map(|v| *v), Some(i));
        assert_eq!(b.get(&key).map(|v| *v), Some(i));
    }
}

// Scenario 5 from spec.md §8: never-expiring entries get no timer at all.
#[test]
fn never_expiring_entry_persists_with_wheel_enabled() {
    init_tracing();
    let cache = Cache::new(
        DefaultExpiration::After(Duration::from_millis(30)),
        Some(Duration::from_millis(10)),
        ShardedMap::new(16),
        NonePolicy::new(),
    );
    cache.set("a", 1, Expiration::Never);
    thread::sleep(Duration::from_millis(200));
    assert_eq!(cache.get("a").map(|v| *v), Some(1));
}

// Scenario 6 from spec.md §8: two concurrent Sets of the same key converge
// to a single, consistently observed value.
#[test]
fn concurrent_sets_of_same_key_converge() {
    init_tracing();
    let cache = Arc::new(Cache::new(
        DefaultExpiration::Never,
        None,
        ShardedMap::new(16),
        NonePolicy::new(),
    ));
    let c1 = Arc::clone(&cache);
    let c2 = Arc::clone(&cache);
    let h1 = thread::spawn(move || c1.set("k", 1, Expiration::Never));
    let h2 = thread::spawn(move || c2.set("k", 2, Expiration::Never));
    h1.join().unwrap();
    h2.join().unwrap();

    let value = *cache.get("k").unwrap();
    assert!(value == 1 || value == 2);
    // subsequent reads see the same, now-settled value
    assert_eq!(*cache.get("k").unwrap(), value);
}

#[test]
fn re_setting_never_after_a_ttl_cancels_the_old_timer() {
    init_tracing();
    let cache = Cache::new(
        DefaultExpiration::Never,
        Some(Duration::from_millis(10)),
        ShardedMap::new(16),
        NonePolicy::new(),
    );
    cache.set("a", 1, Expiration::After(Duration::from_millis(20)));
    cache.set("a", 2, Expiration::Never);
    thread::sleep(Duration::from_millis(150));
    assert_eq!(cache.get("a").map(|v| *v), Some(2));
}
