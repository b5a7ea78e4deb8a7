//! Lock-striped concurrent key-value storage.
//!
//! `ShardedMap` spreads keys across a fixed, power-of-two number of
//! independent shards, each behind its own `RwLock`. A key is assigned to
//! exactly one shard for its whole lifetime by hashing it with a per-instance
//! seed (see [`crate::hash`]).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use rustc_hash::FxHashMap;

use crate::hash::{random_seed, seeded_hash};

const MIN_SHARDS: usize = 16;
const MAX_SHARDS: usize = 1 << 30;

/// Result of [`ShardedMap::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The key was not present and has been inserted.
    New,
    /// The key was already present and its value has been replaced.
    Replaced,
}

struct Shard<V> {
    data: RwLock<FxHashMap<String, Arc<V>>>,
}

/// A sharded, concurrent hash map from `String` keys to `Arc<V>` values.
///
/// Values are stored behind an `Arc` so that callers, the eviction policy,
/// and the time wheel can all hold a cheap reference to the same entry
/// without the map itself needing to know who else is looking at it.
pub struct ShardedMap<V> {
    shards: Vec<Shard<V>>,
    shard_mask: usize,
    seed: u32,
    len: AtomicUsize,
}

impl<V> ShardedMap<V> {
    /// Creates a new map with at least `requested_shards` shards.
    ///
    /// The actual shard count is rounded up to the next power of two,
    /// clamped to `[16, 2^30]`. The hash seed is drawn from the OS CSPRNG
    /// (see [`crate::hash::random_seed`]).
    pub fn new(requested_shards: usize) -> Self {
        let shard_count = requested_shards
            .max(MIN_SHARDS)
            .min(MAX_SHARDS)
            .next_power_of_two()
            .clamp(MIN_SHARDS, MAX_SHARDS);

        let mut shards = Vec::with_capacity(shard_count);
        for _ in 0..shard_count {
            shards.push(Shard {
                data: RwLock::new(FxHashMap::default()),
            });
        }

        Self {
            shards,
            shard_mask: shard_count - 1,
            seed: random_seed(),
            len: AtomicUsize::new(0),
        }
    }

    fn shard_for(&self, key: &str) -> &Shard<V> {
        let slot = seeded_hash(self.seed, key.as_bytes()) as usize & self.shard_mask;
        &self.shards[slot]
    }

    /// Number of shards backing this map (always a power of two).
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Upserts `key` with `value`.
    pub fn put(&self, key: &str, value: V) -> PutOutcome {
        let shard = self.shard_for(key);
        let mut guard = shard.data.write().unwrap();
        let outcome = if guard.contains_key(key) {
            PutOutcome::Replaced
        } else {
            PutOutcome::New
        };
        guard.insert(key.to_string(), Arc::new(value));
        drop(guard);
        if outcome == PutOutcome::New {
            self.len.fetch_add(1, Ordering::Relaxed);
        }
        outcome
    }

    /// Inserts `value` only if `key` is absent. Returns `true` if stored.
    pub fn put_if_absent(&self, key: &str, value: V) -> bool {
        let shard = self.shard_for(key);
        let mut guard = shard.data.write().unwrap();
        if guard.contains_key(key) {
            return false;
        }
        guard.insert(key.to_string(), Arc::new(value));
        drop(guard);
        self.len.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Replaces the value for `key` only if it is present. Returns `true` if replaced.
    pub fn put_if_exists(&self, key: &str, value: V) -> bool {
        let shard = self.shard_for(key);
        let mut guard = shard.data.write().unwrap();
        if !guard.contains_key(key) {
            return false;
        }
        guard.insert(key.to_string(), Arc::new(value));
        true
    }

    /// Looks up `key`, returning a cloned `Arc` handle to its value if present.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let shard = self.shard_for(key);
        shard.data.read().unwrap().get(key).cloned()
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&self, key: &str) -> Option<Arc<V>> {
        let shard = self.shard_for(key);
        let removed = shard.data.write().unwrap().remove(key);
        if removed.is_some() {
            self.len.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    /// Approximate number of entries currently stored.
    ///
    /// Backed by an atomic counter maintained alongside shard mutations
    /// rather than a sum-of-shard-sizes scan; under concurrent writers this
    /// is an instantaneous approximation, not a snapshot.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// `true` if the map is (approximately) empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visits every entry once, taking a brief read lock per shard.
    ///
    /// `visitor` returns `true` to stop iteration early. Inserting, removing,
    /// or replacing entries of the currently-locked shard from within
    /// `visitor` is forbidden — the read lock is already held and doing so
    /// will deadlock. This is a documented contract, not one the map itself
    /// can enforce.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&str, &V) -> bool,
    {
        for shard in &self.shards {
            let guard = shard.data.read().unwrap();
            for (key, value) in guard.iter() {
                if visitor(key, value) {
                    return;
                }
            }
        }
    }
}
