//! An in-process, concurrent, bounded key-value cache with per-entry
//! time-based expiration and a pluggable eviction policy.
//!
//! Three subsystems compose through [`cache::Cache`]:
//!
//! - [`map::ShardedMap`] — lock-striped key-value storage.
//! - [`eviction`] — recency tracking and victim selection ([`eviction::LruPolicy`],
//!   [`eviction::NonePolicy`]).
//! - [`wheel::TimeWheel`] — a hashed timer scheduling per-key expiration.
//!
//! The crate has no opinion on what a caller does with the cached value, how
//! it's serialized, or how the embedding process is configured — those are
//! left to whatever binary wires this crate up.

pub mod cache;
pub mod error;
pub mod eviction;
pub mod hash;
pub mod map;
mod threadpool;
pub mod wheel;

pub use cache::{Cache, DefaultExpiration, Expiration};
pub use error::{CacheError, ConfigError};
pub use eviction::{EvictionPolicy, LruPolicy, NonePolicy};
pub use map::ShardedMap;
pub use wheel::TimeWheel;
