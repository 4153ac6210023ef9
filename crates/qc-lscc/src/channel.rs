//! Phase A: deterministic channel formation.

use qc_consensus_core::EngineError;
use shared_types::{Address, Validator};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// `(layer, shard)` identifies one channel within a round.
pub type ChannelKey = (u32, u32);

/// A channel's minimum membership, per round.
pub const MIN_CHANNEL_SIZE: usize = 3;

fn channel_seed(round: u64, layer: u32, shard: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(round.to_be_bytes());
    hasher.update(layer.to_be_bytes());
    hasher.update(shard.to_be_bytes());
    let digest = hasher.finalize();
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(buf)
}

/// Assign validators to every `(layer, shard)` channel for `round`.
/// Deterministic in `(round, layer, shard, validator_set)` — reassignment
/// happens every round, there are no sticky leaders. Each channel gets at
/// least [`MIN_CHANNEL_SIZE`] members, picked by rotating a per-channel
/// seed through the ascending-address-sorted eligible validator list.
pub fn form_channels(
    round: u64,
    layer_depth: u32,
    channel_count: u32,
    validators: &[Validator],
) -> Result<HashMap<ChannelKey, Vec<Address>>, EngineError> {
    let mut sorted: Vec<Address> = validators.iter().filter(|v| v.is_eligible()).map(|v| v.address).collect();
    sorted.sort_by_key(|a| a.as_bytes().to_vec());
    let n = sorted.len();
    if n < MIN_CHANNEL_SIZE {
        return Err(EngineError::InsufficientValidatorsForChannels { have: n, need: MIN_CHANNEL_SIZE });
    }

    let layers = layer_depth.max(1);
    let shards = channel_count.max(1);
    let target_size = n / (layers as usize * shards as usize);
    let channel_size = target_size.max(MIN_CHANNEL_SIZE).min(n);

    let mut channels = HashMap::with_capacity((layers * shards) as usize);
    for layer in 0..layers {
        for shard in 0..shards {
            let seed = channel_seed(round, layer, shard);
            let start = (seed % n as u64) as usize;
            let members: Vec<Address> = (0..channel_size).map(|i| sorted[(start + i) % n]).collect();
            channels.insert((layer, shard), members);
        }
    }
    Ok(channels)
}

/// Whether `signers` is a strict majority of `members`.
pub fn is_strict_majority(signers: usize, members: usize) -> bool {
    signers * 2 > members
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ValidatorStatus;

    fn validators(n: u8) -> Vec<Validator> {
        (0..n)
            .map(|b| Validator {
                address: Address([b + 1; 20]),
                public_key: [0u8; 32],
                stake: 10,
                power: 10,
                status: ValidatorStatus::Active,
                last_active: 0,
                shard_id: 0,
                reputation: 1.0,
            })
            .collect()
    }

    #[test]
    fn formation_is_deterministic() {
        let vs = validators(9);
        let a = form_channels(1, 3, 2, &vs).unwrap();
        let b = form_channels(1, 3, 2, &vs).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn formation_reassigns_every_round() {
        let vs = validators(9);
        let a = form_channels(1, 3, 2, &vs).unwrap();
        let b = form_channels(2, 3, 2, &vs).unwrap();
        assert_ne!(a, b, "channel membership should not be sticky across rounds");
    }

    #[test]
    fn every_channel_meets_minimum_size() {
        let vs = validators(4);
        let channels = form_channels(3, 3, 2, &vs).unwrap();
        for members in channels.values() {
            assert!(members.len() >= MIN_CHANNEL_SIZE);
        }
    }

    #[test]
    fn rejects_too_few_validators() {
        let vs = validators(2);
        assert!(form_channels(1, 3, 2, &vs).is_err());
    }

    #[test]
    fn strict_majority_requires_more_than_half() {
        assert!(!is_strict_majority(1, 3));
        assert!(is_strict_majority(2, 3));
        assert!(is_strict_majority(3, 4));
    }
}
