//! Address derivation: `SHA-256 -> RIPEMD-160`, Bitcoin-style.
//!
//! An [`Address`] is the 20-byte `RIPEMD160(SHA256(pubkey))` hash itself —
//! that is the value that gets hex-rendered and compared everywhere in the
//! chain, mempool, and store. [`checksummed_string`] additionally produces
//! a version-prefixed, checksummed *display* encoding (one version byte +
//! the 20-byte hash + a 4-byte double-SHA-256 checksum) for contexts that
//! want a self-verifying external representation, such as a wallet UI —
//! that longer form is never what gets stored or compared as an `Address`.

use crate::hashing::{sha256, sha256d};
use ripemd::Ripemd160;
use sha2::Digest;
use shared_types::Address;

/// Default address-format version byte.
pub const VERSION_BYTE: u8 = 0x00;

/// Derive an [`Address`] from a raw 32-byte Ed25519 public key.
pub fn derive_address(public_key: &[u8; 32]) -> Address {
    let sha = sha256(public_key);
    let ripemd = Ripemd160::digest(sha.as_bytes());
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&ripemd);
    Address(bytes)
}

/// Produce a version-prefixed, checksummed hex encoding of `address`:
/// `hex(version || address || checksum)` where `checksum` is the first 4
/// bytes of `SHA256(SHA256(version || address))`.
pub fn checksummed_string(address: &Address, version: u8) -> String {
    let mut payload = Vec::with_capacity(1 + 20);
    payload.push(version);
    payload.extend_from_slice(address.as_bytes());
    let checksum = sha256d(&payload);
    payload.extend_from_slice(&checksum.as_bytes()[..4]);
    hex::encode(payload)
}

/// Parse and verify a [`checksummed_string`] encoding, returning the
/// address if the checksum matches.
pub fn parse_checksummed(encoded: &str) -> Option<Address> {
    let bytes = hex::decode(encoded).ok()?;
    if bytes.len() != 1 + 20 + 4 {
        return None;
    }
    let (payload, checksum) = bytes.split_at(1 + 20);
    let expected = sha256d(payload);
    if &expected.as_bytes()[..4] != checksum {
        return None;
    }
    Address::from_slice(&payload[1..]).filter(|_| true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let pk = [7u8; 32];
        assert_eq!(derive_address(&pk), derive_address(&pk));
    }

    #[test]
    fn different_keys_different_addresses() {
        assert_ne!(derive_address(&[1u8; 32]), derive_address(&[2u8; 32]));
    }

    #[test]
    fn checksummed_round_trip() {
        let addr = derive_address(&[3u8; 32]);
        let encoded = checksummed_string(&addr, VERSION_BYTE);
        assert_eq!(parse_checksummed(&encoded), Some(addr));
    }

    #[test]
    fn checksummed_rejects_corruption() {
        let addr = derive_address(&[3u8; 32]);
        let mut encoded = checksummed_string(&addr, VERSION_BYTE);
        encoded.replace_range(0..2, "ff");
        assert_eq!(parse_checksummed(&encoded), None);
    }
}
