//! Genesis bootstrap: seed a fresh [`Store`] with the shard topology,
//! initial validator set, and one genesis block per shard.

use crate::store::Store;
use shared_types::{Address, Block, Shard, StoreError, Validator};

/// A validator to seed at genesis, before shard assignment.
pub struct GenesisValidator {
    /// Validator address.
    pub address: Address,
    /// Ed25519 public key backing `address`.
    pub public_key: [u8; 32],
    /// Initial stake.
    pub stake: u64,
}

/// Bootstrap `store` with `num_shards` shards, genesis blocks timestamped
/// at `genesis_timestamp`, and `validators` assigned round-robin by
/// `shard_id = index mod num_shards`.
///
/// A no-op if the store already has a genesis block for shard 0 — callers
/// can call this unconditionally on startup.
pub fn bootstrap(
    store: &dyn Store,
    num_shards: u32,
    genesis_timestamp: i64,
    validators: &[GenesisValidator],
) -> Result<(), StoreError> {
    if store.get_block_by_index(0, 0)?.is_some() {
        return Ok(());
    }

    let mut by_shard: Vec<Vec<Address>> = vec![Vec::new(); num_shards as usize];
    for (i, gv) in validators.iter().enumerate() {
        let shard_id = (i as u32) % num_shards;
        by_shard[shard_id as usize].push(gv.address);
        store.put_validator(&Validator {
            address: gv.address,
            public_key: gv.public_key,
            stake: gv.stake,
            power: gv.stake,
            status: shared_types::ValidatorStatus::Active,
            last_active: genesis_timestamp,
            shard_id,
            reputation: 1.0,
        })?;
    }

    for shard_id in 0..num_shards {
        let shard_validators = by_shard[shard_id as usize].clone();
        let proposer = shard_validators.first().copied().unwrap_or(Address::ZERO);
        let genesis = Block::genesis(shard_id, genesis_timestamp, proposer);
        store.put_shard(&Shard {
            id: shard_id,
            validators: shard_validators,
            tip_hash: genesis.hash,
            pending_cross_in: 0,
            pending_cross_out: 0,
            health: 1.0,
        })?;
        store.put_block(&genesis)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    #[test]
    fn bootstrap_creates_one_genesis_per_shard() {
        let store = InMemoryStore::new();
        let validators = vec![
            GenesisValidator { address: Address([1u8; 20]), public_key: [0u8; 32], stake: 100 },
            GenesisValidator { address: Address([2u8; 20]), public_key: [0u8; 32], stake: 100 },
        ];
        bootstrap(&store, 2, 1_700_000_000, &validators).unwrap();
        for shard_id in 0..2 {
            let tip = store.get_tip(shard_id).unwrap().unwrap();
            assert_eq!(tip.index, 0);
        }
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let store = InMemoryStore::new();
        bootstrap(&store, 1, 1, &[]).unwrap();
        let first = store.get_tip(0).unwrap().unwrap();
        bootstrap(&store, 1, 999, &[]).unwrap();
        let second = store.get_tip(0).unwrap().unwrap();
        assert_eq!(first.hash, second.hash);
    }
}
