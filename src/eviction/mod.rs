//! Pluggable eviction policies.
//!
//! The cache façade depends on eviction only through the [`EvictionPolicy`]
//! trait; which key to forget when the map is full, and how "recency" is
//! tracked, is entirely up to the concrete variant.

mod lru;
mod none;

pub use lru::LruPolicy;
pub use none::NonePolicy;

/// Capability set the cache façade relies on to track recency and choose
/// eviction victims.
pub trait EvictionPolicy: Send + Sync {
    /// Updates the maximum number of entries this policy allows. Does not
    /// retroactively evict anything.
    fn set_capacity(&self, capacity: usize);

    /// Current maximum entry count.
    fn capacity(&self) -> usize;

    /// Marks `key` as most-recently-used, inserting it into tracking if it
    /// wasn't already tracked.
    ///
    /// Callers must only invoke this after a successful `Put` on the
    /// backing map — `Promote` does not itself guarantee the key exists
    /// anywhere else, and calling it out of band can introduce duplicate
    /// tracking entries.
    fn promote(&self, key: &str);

    /// Marks `key` as most-recently-used only if it is currently tracked.
    fn promote_if_exists(&self, key: &str);

    /// Stops tracking `key`. No-op if it wasn't tracked.
    fn evict(&self, key: &str);

    /// Stops tracking `key` and guarantees a subsequent `promote_if_exists`
    /// is a no-op. Semantically identical to `evict` in every variant here,
    /// since none of them re-promote an absent key on `promote_if_exists`.
    fn ban(&self, key: &str) {
        self.evict(key);
    }

    /// Removes and returns the victim key chosen by this policy, or `None`
    /// if nothing is tracked.
    fn now_evict(&self) -> Option<String>;
}
