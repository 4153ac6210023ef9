//! # Shared Crypto
//!
//! Address derivation and Ed25519 signing/verification.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`address`] | Public key -> [`shared_types::Address`] derivation |
//! | [`signing`] | Ed25519 keypairs, transaction/block signing and verification |
//! | [`hashing`] | SHA-256 helper re-used by both of the above |

pub mod address;
pub mod errors;
pub mod hashing;
pub mod signing;

pub use address::derive_address;
pub use errors::CryptoError;
pub use hashing::sha256;
pub use signing::{Keypair, PublicKey};
