//! Crypto error types.

use thiserror::Error;

/// Errors raised by signing/verification.
#[derive(Debug, Clone, Error)]
pub enum CryptoError {
    /// A supplied public key was not a valid Ed25519 point.
    #[error("invalid public key")]
    InvalidPublicKey,
    /// A supplied signature was malformed (wrong length, non-canonical).
    #[error("invalid signature encoding")]
    InvalidSignatureEncoding,
    /// Signature did not verify under the given public key and message.
    #[error("signature verification failed")]
    VerificationFailed,
}
