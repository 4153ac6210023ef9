//! SHA-256 helper shared by address derivation and signing.

use sha2::{Digest, Sha256};
use shared_types::Hash;

/// SHA-256 of `data`, returned as a [`Hash`].
pub fn sha256(data: &[u8]) -> Hash {
    let digest = Sha256::digest(data);
    Hash::from_slice(&digest).expect("sha256 digest is 32 bytes")
}

/// Double SHA-256, used by [`crate::address::checksummed_string`].
pub fn sha256d(data: &[u8]) -> Hash {
    sha256(sha256(data).as_bytes())
}
