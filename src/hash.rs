//! Seeded 32-bit hashing for spreading keys across `ShardedMap` shards.
//!
//! The function is a djb2 variant (multiply-then-xor) salted with a
//! per-instance seed so that two `ShardedMap`s never agree on shard
//! placement for the same key set. Without a random seed, an attacker who
//! knows the hash function can craft keys that all land in one shard and
//! turn every operation into a single-lock bottleneck (HashDoS); seeding
//! defeats that.

use rand::rngs::OsRng;
use rand::RngCore;

const SEED_BYTES: usize = 4;

/// Hashes `key` to a 32-bit value using `seed`.
///
/// `d = 5381 + seed + len(key)`, then for every byte `b`: `d = (d * 33) ^ b`,
/// finalized with `d ^ (d >> 16)`.
pub fn seeded_hash(seed: u32, key: &[u8]) -> u32 {
    let mut d: u32 = 5381u32
        .wrapping_add(seed)
        .wrapping_add(key.len() as u32);
    for &b in key {
        d = d.wrapping_mul(33) ^ (b as u32);
    }
    d ^ (d >> 16)
}

/// Draws a fresh hash seed from the OS CSPRNG.
///
/// Falls back to `rand::thread_rng` (not cryptographically secure) if the OS
/// RNG cannot be reached, logging a warning — a cache should never fail to
/// construct purely because a seed couldn't be drawn.
pub fn random_seed() -> u32 {
    let mut buf = [0u8; SEED_BYTES];
    match OsRng.try_fill_bytes(&mut buf) {
        Ok(()) => u32::from_ne_bytes(buf),
        Err(err) => {
            tracing::warn!(
                error = %err,
                "OS RNG unavailable, falling back to a non-cryptographic seed"
            );
            rand::thread_rng().next_u32()
        }
    }
}
