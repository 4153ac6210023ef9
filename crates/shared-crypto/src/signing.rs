//! Ed25519 keypairs and transaction/block signing.

use crate::address::derive_address;
use crate::errors::CryptoError;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use shared_types::{Address, Signature};

/// A 32-byte Ed25519 public key, re-exported so callers don't need to
/// depend on `ed25519-dalek` directly.
pub type PublicKey = [u8; 32];

/// An Ed25519 signing keypair, with its derived [`Address`] cached.
pub struct Keypair {
    signing_key: SigningKey,
    address: Address,
}

impl Keypair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        let signing_key = SigningKey::generate(&mut rng);
        let address = derive_address(signing_key.verifying_key().as_bytes());
        Self { signing_key, address }
    }

    /// Reconstruct a keypair from a 32-byte seed (deterministic; used by
    /// tests and by any future wallet-key-loading path).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let address = derive_address(signing_key.verifying_key().as_bytes());
        Self { signing_key, address }
    }

    /// This keypair's derived address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// This keypair's raw public key bytes.
    pub fn public_key(&self) -> PublicKey {
        *self.signing_key.verifying_key().as_bytes()
    }

    /// The raw 32-byte signing key, for a `keygen` CLI to persist. Callers
    /// are responsible for keeping this secret.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Sign `message`, returning a [`Signature`].
    pub fn sign(&self, message: &[u8]) -> Signature {
        let sig = self.signing_key.sign(message);
        Signature(sig.to_bytes())
    }
}

/// Verify `signature` over `message` under `public_key`.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
    let verifying_key = VerifyingKey::from_bytes(public_key).map_err(|_| CryptoError::InvalidPublicKey)?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key
        .verify(message, &sig)
        .map_err(|_| CryptoError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let kp = Keypair::from_seed([5u8; 32]);
        let msg = b"hello consensus";
        let sig = kp.sign(msg);
        assert!(verify(&kp.public_key(), msg, &sig).is_ok());
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let kp = Keypair::from_seed([5u8; 32]);
        let sig = kp.sign(b"hello");
        assert!(verify(&kp.public_key(), b"goodbye", &sig).is_err());
    }

    #[test]
    fn address_matches_derivation() {
        let kp = Keypair::from_seed([6u8; 32]);
        assert_eq!(kp.address(), derive_address(&kp.public_key()));
    }
}
