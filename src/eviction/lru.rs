use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

use super::EvictionPolicy;

/// Recency-ordered (LRU) eviction policy.
///
/// Recency is tracked with a logical clock rather than an intrusive
/// doubly-linked list: each promotion stamps the key with a fresh,
/// monotonically increasing counter, a `key -> counter` index records each
/// key's current stamp, and a `BTreeSet<(counter, key)>` keeps all tracked
/// keys ordered from least-recent (front) to most-recent (back). Promoting,
/// demoting, and evicting are `O(log n)` — no linear scan of a list, at the
/// cost of not being strictly `O(1)`; this avoids the unsafe intrusive list
/// a true `O(1)` implementation would need in safe Rust.
pub struct LruPolicy {
    capacity: AtomicI64,
    counter: AtomicU64,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    index: HashMap<String, u64>,
    order: BTreeSet<(u64, String)>,
}

impl LruPolicy {
    /// Creates a new LRU policy allowing up to `capacity` tracked keys.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: AtomicI64::new(capacity as i64),
            counter: AtomicU64::new(0),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn next_stamp(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }
}

impl EvictionPolicy for LruPolicy {
    fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity as i64, Ordering::SeqCst);
    }

    fn capacity(&self) -> usize {
        self.capacity.load(Ordering::SeqCst).max(0) as usize
    }

    fn promote(&self, key: &str) {
        let stamp = self.next_stamp();
        let mut inner = self.inner.lock().unwrap();
        if let Some(old_stamp) = inner.index.remove(key) {
            inner.order.remove(&(old_stamp, key.to_string()));
        }
        inner.index.insert(key.to_string(), stamp);
        inner.order.insert((stamp, key.to_string()));
    }

    fn promote_if_exists(&self, key: &str) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.index.contains_key(key) {
            return;
        }
        let stamp = self.next_stamp();
        let old_stamp = inner.index.insert(key.to_string(), stamp).unwrap();
        inner.order.remove(&(old_stamp, key.to_string()));
        inner.order.insert((stamp, key.to_string()));
    }

    fn evict(&self, key: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(stamp) = inner.index.remove(key) {
            inner.order.remove(&(stamp, key.to_string()));
        }
    }

    fn now_evict(&self) -> Option<String> {
        let mut inner = self.inner.lock().unwrap();
        let (_, key) = inner.order.pop_first()?;
        inner.index.remove(&key);
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_promoted() {
        let lru = LruPolicy::new(3);
        lru.promote("a");
        lru.promote("b");
        lru.promote("c");
        assert_eq!(lru.now_evict().as_deref(), Some("a"));
        assert_eq!(lru.now_evict().as_deref(), Some("b"));
        assert_eq!(lru.now_evict().as_deref(), Some("c"));
        assert_eq!(lru.now_evict(), None);
    }

    #[test]
    fn promote_if_exists_refreshes_recency_only_when_tracked() {
        let lru = LruPolicy::new(3);
        lru.promote("a");
        lru.promote("b");
        lru.promote_if_exists("a"); // a is now MRU
        assert_eq!(lru.now_evict().as_deref(), Some("b"));

        lru.promote_if_exists("never-tracked"); // no-op
        assert_eq!(lru.now_evict().as_deref(), Some("a"));
        assert_eq!(lru.now_evict(), None);
    }

    #[test]
    fn evict_removes_from_tracking() {
        let lru = LruPolicy::new(3);
        lru.promote("a");
        lru.promote("b");
        lru.evict("a");
        assert_eq!(lru.now_evict().as_deref(), Some("b"));
        assert_eq!(lru.now_evict(), None);
    }

    #[test]
    fn re_promoting_an_existing_key_does_not_duplicate_it() {
        let lru = LruPolicy::new(3);
        lru.promote("a");
        lru.promote("b");
        lru.promote("a");
        assert_eq!(lru.now_evict().as_deref(), Some("b"));
        assert_eq!(lru.now_evict().as_deref(), Some("a"));
        assert_eq!(lru.now_evict(), None);
    }

    #[test]
    fn ban_is_equivalent_to_evict() {
        let lru = LruPolicy::new(3);
        lru.promote("a");
        lru.ban("a");
        lru.promote_if_exists("a");
        assert_eq!(lru.now_evict(), None);
    }

    #[test]
    fn scenario_capacity_three_eviction_order() {
        // From spec §8 scenario 2.
        let lru = LruPolicy::new(3);
        lru.promote("a");
        lru.promote("b");
        lru.promote("c");
        // d arrives: capacity full, caller evicts "a" (the LRU victim) first.
        assert_eq!(lru.now_evict().as_deref(), Some("a"));
        lru.promote("d");
        lru.promote_if_exists("b"); // b becomes MRU
        // e arrives: now "c" is LRU (b was refreshed, d and c remain, c older).
        assert_eq!(lru.now_evict().as_deref(), Some("c"));
    }
}
