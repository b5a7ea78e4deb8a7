//! The cache façade: composes [`crate::map::ShardedMap`],
//! [`crate::eviction::EvictionPolicy`], and [`crate::wheel::TimeWheel`], and
//! is the only thing responsible for keeping them consistent with each
//! other under concurrent use.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter};

use crate::error::CacheError;
use crate::eviction::EvictionPolicy;
use crate::map::ShardedMap;
use crate::wheel::TimeWheel;

const METRIC_EVICTIONS: &str = "htcache_evictions_total";
const DEFAULT_WHEEL_SLOTS: usize = 3600;

/// How long an entry should live, passed to [`Cache::set`], [`Cache::add`],
/// and [`Cache::replace`].
///
/// This is the typed equivalent of the source design's duration sentinels
/// (`0` = use the cache's default, `-1` = never expire): `Expiration` makes
/// the three cases distinct types instead of magic numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Use the cache's configured default expiration.
    Default,
    /// The entry never expires and is never scheduled on the time wheel.
    Never,
    /// The entry expires after the given duration.
    After(Duration),
}

/// The cache's own default expiration, supplied at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultExpiration {
    /// Entries with `Expiration::Default` never expire.
    Never,
    /// Entries with `Expiration::Default` expire after this duration.
    After(Duration),
}

/// An in-process, concurrent, bounded key-value cache.
///
/// `Cache` composes a [`ShardedMap`] for storage, an [`EvictionPolicy`] for
/// capacity-triggered eviction, and (optionally) a [`TimeWheel`] for timed
/// expiration. See spec.md / SPEC_FULL.md §3 for the cross-subsystem
/// invariants it preserves across the three.
pub struct Cache<P, V> {
    default_expiration: DefaultExpiration,
    map: Arc<ShardedMap<V>>,
    policy: Arc<P>,
    wheel: Option<Arc<TimeWheel>>,
}

impl<P, V> Cache<P, V>
where
    P: EvictionPolicy + 'static,
    V: Send + Sync + 'static,
{
    /// Builds a cache from its parts.
    ///
    /// `cleanup_interval` is the tick `Δ` of the time wheel driving timed
    /// expiration; `None` (or a zero duration) disables the wheel entirely,
    /// so entries never expire regardless of the `Expiration` passed to
    /// `set`/`add`/`replace`. When a wheel is created it gets
    /// `DEFAULT_WHEEL_SLOTS` slots (≈ one hour of coverage at a one-second
    /// tick, per the recommended defaults); use [`Cache::with_wheel_slots`]
    /// for a different slot count.
    pub fn new(
        default_expiration: DefaultExpiration,
        cleanup_interval: Option<Duration>,
        map: ShardedMap<V>,
        policy: P,
    ) -> Self {
        Self::with_wheel_slots(
            default_expiration,
            cleanup_interval,
            DEFAULT_WHEEL_SLOTS,
            map,
            policy,
        )
    }

    /// Like [`Cache::new`], but with an explicit time wheel slot count.
    pub fn with_wheel_slots(
        default_expiration: DefaultExpiration,
        cleanup_interval: Option<Duration>,
        wheel_slots: usize,
        map: ShardedMap<V>,
        policy: P,
    ) -> Self {
        describe_counter!(METRIC_EVICTIONS, "number of entries evicted from the cache");

        let wheel = cleanup_interval.filter(|d| !d.is_zero()).map(|tick| {
            let wheel = Arc::new(
                TimeWheel::new(tick, wheel_slots)
                    .expect("cleanup_interval and wheel_slots must be positive"),
            );
            wheel.start();
            wheel
        });

        Self {
            default_expiration,
            map: Arc::new(map),
            policy: Arc::new(policy),
            wheel,
        }
    }

    /// Resolves an `Expiration` against the cache's own default, returning
    /// `None` for "never expire".
    fn resolve(&self, d: Expiration) -> Option<Duration> {
        match d {
            Expiration::Default => match self.default_expiration {
                DefaultExpiration::Never => None,
                DefaultExpiration::After(dur) => Some(dur),
            },
            Expiration::Never => None,
            Expiration::After(dur) => Some(dur),
        }
    }

    /// Evicts the policy's chosen victim (if any) from both the map and the
    /// wheel. Called before insertion when the map is at or over capacity.
    ///
    /// Matches the source design's ordering for `Add`/`Replace`: this runs
    /// before the presence check, so a failed `Add`/`Replace` may still have
    /// evicted another key. Documented, not "fixed" — see DESIGN.md.
    fn evict_victim_if_full(&self) {
        if self.map.len() >= self.policy.capacity() {
            if let Some(victim) = self.policy.now_evict() {
                if let Some(wheel) = &self.wheel {
                    wheel.remove_job(&victim);
                }
                self.map.remove(&victim);
                tracing::debug!(victim = %victim, "evicted capacity victim");
                counter!(METRIC_EVICTIONS, "reason" => "capacity").increment(1);
            }
        }
    }

    /// Arms (or disarms) the expiration timer for `key` after an insert.
    ///
    /// When `expires_in` is `None` ("never expire"), any previously
    /// scheduled job for `key` is cancelled rather than left armed — a
    /// never-expiring entry must have no `TimerJob` (invariant I4), even if
    /// the key previously held a value with a real TTL.
    fn arm_timer(&self, key: &str, expires_in: Option<Duration>) {
        let Some(wheel) = &self.wheel else {
            return;
        };
        let Some(duration) = expires_in else {
            wheel.remove_job(key);
            return;
        };

        let map = Arc::clone(&self.map);
        let policy = Arc::clone(&self.policy);
        let key = key.to_string();
        wheel.add_job(&key, duration, move || {
            map.remove(&key);
            policy.evict(&key);
            tracing::debug!(%key, "entry expired");
            counter!(METRIC_EVICTIONS, "reason" => "expired").increment(1);
        });
    }

    /// Inserts or updates `key` with `value`, expiring per `d`.
    pub fn set(&self, key: &str, value: V, d: Expiration) {
        let expires_in = self.resolve(d);
        self.evict_victim_if_full();
        self.map.put(key, value);
        self.policy.promote(key);
        self.arm_timer(key, expires_in);
    }

    /// Equivalent to `set(key, value, Expiration::Default)`.
    pub fn set_default(&self, key: &str, value: V) {
        self.set(key, value, Expiration::Default);
    }

    /// Inserts `key` with `value` only if it is absent.
    pub fn add(&self, key: &str, value: V, d: Expiration) -> Result<(), CacheError> {
        let expires_in = self.resolve(d);
        self.evict_victim_if_full();
        if !self.map.put_if_absent(key, value) {
            return Err(CacheError::AlreadyExists(key.to_string()));
        }
        self.policy.promote(key);
        self.arm_timer(key, expires_in);
        Ok(())
    }

    /// Replaces the value for `key` only if it is present.
    pub fn replace(&self, key: &str, value: V, d: Expiration) -> Result<(), CacheError> {
        let expires_in = self.resolve(d);
        self.evict_victim_if_full();
        if !self.map.put_if_exists(key, value) {
            return Err(CacheError::Missing(key.to_string()));
        }
        self.policy.promote(key);
        self.arm_timer(key, expires_in);
        Ok(())
    }

    /// Looks up `key`, refreshing its recency if the policy tracks it.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.policy.promote_if_exists(key);
        self.map.get(key)
    }

    /// Removes `key` from the map, the wheel, and the policy. No-op if
    /// absent.
    ///
    /// The source design's `Delete` calls `NowEvict` (its *capacity* victim
    /// selector) instead of removing the key it was given — a bug. This
    /// removes exactly `key`, the corrected and documented-authoritative
    /// behavior (see SPEC_FULL.md §1 / DESIGN.md).
    pub fn delete(&self, key: &str) {
        if let Some(wheel) = &self.wheel {
            wheel.remove_job(key);
        }
        self.map.remove(key);
        self.policy.evict(key);
    }

    /// Approximate number of entries currently stored.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// `true` if the cache is (approximately) empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
