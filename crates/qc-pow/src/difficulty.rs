//! Leading-zero-nibble difficulty check.
//!
//! `difficulty` counts hex nibbles, not bits: a difficulty of `4` requires
//! the hash's first two bytes to be zero.

use shared_types::codec::block_header_preimage;
use shared_types::{Address, Hash};
use sha2::{Digest, Sha256};

/// The nonce-search proof hash for a candidate header: `SHA-256(header
/// pre-image || nonce)`. Distinct from [`shared_types::Block::compute_hash`]
/// (the block's identity hash, which is shared by every algorithm and does
/// not vary with a PoW nonce) — this is the value difficulty is checked
/// against.
#[allow(clippy::too_many_arguments)]
pub fn proof_hash(
    index: u64,
    prev_hash: &Hash,
    timestamp: i64,
    validator: &Address,
    merkle_root: &Hash,
    shard_id: u32,
    nonce: u64,
) -> Hash {
    let mut preimage = block_header_preimage(index, prev_hash, timestamp, validator, merkle_root, shard_id);
    preimage.extend_from_slice(&nonce.to_be_bytes());
    let digest = Sha256::digest(&preimage);
    Hash::from_slice(&digest).expect("sha256 digest is 32 bytes")
}

/// Whether `hash` has at least `difficulty` leading zero hex nibbles.
pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
    let bytes = hash.as_bytes();
    let full_bytes = (difficulty / 2) as usize;
    if full_bytes > bytes.len() {
        return false;
    }
    if bytes[..full_bytes].iter().any(|b| *b != 0) {
        return false;
    }
    if difficulty % 2 == 1 {
        let next = bytes.get(full_bytes).copied().unwrap_or(0xff);
        if next & 0xf0 != 0 {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_difficulty_always_passes() {
        assert!(meets_difficulty(&Hash([0xffu8; 32]), 0));
    }

    #[test]
    fn even_difficulty_checks_whole_bytes() {
        let mut bytes = [0xffu8; 32];
        bytes[0] = 0;
        bytes[1] = 0;
        assert!(meets_difficulty(&Hash(bytes), 4));
        bytes[1] = 1;
        assert!(!meets_difficulty(&Hash(bytes), 4));
    }

    #[test]
    fn proof_hash_varies_with_nonce() {
        let validator = Address([1u8; 20]);
        let merkle = Hash::ZERO;
        let a = proof_hash(1, &Hash::ZERO, 0, &validator, &merkle, 0, 0);
        let b = proof_hash(1, &Hash::ZERO, 0, &validator, &merkle, 0, 1);
        assert_ne!(a, b);
    }

    #[test]
    fn odd_difficulty_checks_high_nibble() {
        let mut bytes = [0xffu8; 32];
        bytes[0] = 0;
        bytes[1] = 0x0f;
        assert!(meets_difficulty(&Hash(bytes), 3));
        bytes[1] = 0xf0;
        assert!(!meets_difficulty(&Hash(bytes), 3));
    }
}
