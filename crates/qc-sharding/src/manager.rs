//! Static shard assignment: a fixed shard count decided at genesis, plus
//! the shard-key function every component uses to route an address.

use shared_types::{shard_key, Address};

/// The static shard topology for a running node. `num_shards` never
/// changes after construction — there is no on-chain reshard mechanism.
pub struct ShardManager {
    num_shards: u32,
}

impl ShardManager {
    /// Build a manager over a fixed `num_shards` shard count.
    pub fn new(num_shards: u32) -> Self {
        assert!(num_shards > 0, "num_shards must be >= 1");
        Self { num_shards }
    }

    /// The fixed shard count.
    pub fn num_shards(&self) -> u32 {
        self.num_shards
    }

    /// Which shard owns `address`.
    pub fn shard_of(&self, address: &Address) -> u32 {
        shard_key(address, self.num_shards)
    }

    /// Whether a transfer from `from` to `to` crosses a shard boundary.
    pub fn is_cross_shard(&self, from: &Address, to: &Address) -> bool {
        self.shard_of(from) != self.shard_of(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_address_always_same_shard() {
        let mgr = ShardManager::new(4);
        let a = Address([3u8; 20]);
        assert_eq!(mgr.shard_of(&a), mgr.shard_of(&a));
    }

    #[test]
    fn detects_cross_shard_by_differing_keys() {
        let mgr = ShardManager::new(8);
        let a = Address([1u8; 20]);
        let b = Address([200u8; 20]);
        assert_eq!(mgr.is_cross_shard(&a, &b), mgr.shard_of(&a) != mgr.shard_of(&b));
    }
}
