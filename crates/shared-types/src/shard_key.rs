//! The shard-key function: a deterministic mapping from an address to
//! `[0, NumShards)` via SHA-256 modulo.
//!
//! Lives in `shared-types` (not `qc-sharding`) because it is a pure
//! function of an [`Address`] with no sharding-state dependency, and both
//! the pool (admission routing) and the sharding crate (cross-shard
//! detection) need the exact same deterministic answer — the function is
//! total over the address domain and returns the same shard for the same
//! address under a fixed `num_shards`, by every caller, forever.

use crate::primitives::Address;
use sha2::{Digest, Sha256};

/// Map `address` to a shard id in `[0, num_shards)`.
///
/// # Panics
///
/// Panics if `num_shards == 0` — a zero-shard topology is rejected at
/// configuration validation time ([`crate::config::ShardingConfig::validate`]),
/// so this function should never observe it.
pub fn shard_key(address: &Address, num_shards: u32) -> u32 {
    assert!(num_shards > 0, "num_shards must be >= 1");
    let digest = Sha256::digest(address.as_bytes());
    // Take the low 8 bytes as a big-endian u64 before reducing mod N, so the
    // whole digest — not just its last byte — influences the result.
    let mut low8 = [0u8; 8];
    low8.copy_from_slice(&digest[24..32]);
    let value = u64::from_be_bytes(low8);
    (value % num_shards as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let addr = Address([42u8; 20]);
        assert_eq!(shard_key(&addr, 4), shard_key(&addr, 4));
    }

    #[test]
    fn in_range() {
        let addr = Address([1u8; 20]);
        for n in 1..20u32 {
            assert!(shard_key(&addr, n) < n);
        }
    }

    #[test]
    fn distinguishes_addresses() {
        // Not a proof of uniform distribution, just that it's not constant.
        let shards: std::collections::HashSet<u32> =
            (0u8..50).map(|b| shard_key(&Address([b; 20]), 8)).collect();
        assert!(shards.len() > 1);
    }
}
