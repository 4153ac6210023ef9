//! The admission gate: everything `TransactionPool::admit` checks before a
//! transaction is allowed into the pending set.

use shared_crypto::address::derive_address;
use shared_crypto::signing::{verify, PublicKey};
use shared_types::{codec, Address, PoolError, Transaction};

/// Transactions older than this are expired on admission.
pub const MAX_AGE_SECS: i64 = 24 * 3600;
/// Transactions timestamped more than this far in the future are rejected.
pub const MAX_FUTURE_SKEW_SECS: i64 = 300;

/// Run the full validation gate against `tx` at wall-clock `now`, given the
/// public key the pool believes backs `tx.from`.
///
/// The first violated check wins; callers should not depend on more than
/// that when multiple invariants are broken at once.
pub fn validate(tx: &Transaction, now: i64, public_key: &PublicKey) -> Result<(), PoolError> {
    if tx.from == Address::ZERO || tx.to == Address::ZERO {
        return Err(PoolError::BadAddress);
    }
    if derive_address(public_key) != tx.from {
        return Err(PoolError::BadAddress);
    }
    if tx.timestamp < now - MAX_AGE_SECS {
        return Err(PoolError::Expired);
    }
    if tx.timestamp > now + MAX_FUTURE_SKEW_SECS {
        return Err(PoolError::FutureTimestamp);
    }
    if tx.id != tx.compute_id() {
        return Err(PoolError::BadHash);
    }
    let preimage = codec::transaction_preimage(tx);
    verify(public_key, &preimage, &tx.signature).map_err(|_| PoolError::BadSignature)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::signing::Keypair;
    use shared_types::TransactionKind;

    fn signed_tx(kp: &Keypair, now: i64) -> Transaction {
        let mut tx = Transaction::new_unsigned(
            kp.address(),
            Address([2u8; 20]),
            10,
            1,
            vec![],
            now,
            0,
            0,
            TransactionKind::Regular,
        );
        let preimage = codec::transaction_preimage(&tx);
        tx.signature = kp.sign(&preimage);
        tx
    }

    #[test]
    fn accepts_well_formed() {
        let kp = Keypair::from_seed([1u8; 32]);
        let tx = signed_tx(&kp, 1_000);
        assert!(validate(&tx, 1_000, &kp.public_key()).is_ok());
    }

    #[test]
    fn rejects_expired() {
        let kp = Keypair::from_seed([1u8; 32]);
        let tx = signed_tx(&kp, 0);
        assert_eq!(
            validate(&tx, MAX_AGE_SECS + 1_000, &kp.public_key()),
            Err(PoolError::Expired)
        );
    }

    #[test]
    fn rejects_future_timestamp() {
        let kp = Keypair::from_seed([1u8; 32]);
        let tx = signed_tx(&kp, 10_000);
        assert_eq!(validate(&tx, 0, &kp.public_key()), Err(PoolError::FutureTimestamp));
    }

    #[test]
    fn rejects_tampered_hash() {
        let kp = Keypair::from_seed([1u8; 32]);
        let mut tx = signed_tx(&kp, 1_000);
        tx.amount = 999;
        assert_eq!(validate(&tx, 1_000, &kp.public_key()), Err(PoolError::BadHash));
    }

    #[test]
    fn rejects_wrong_key() {
        let kp = Keypair::from_seed([1u8; 32]);
        let other = Keypair::from_seed([2u8; 32]);
        let tx = signed_tx(&kp, 1_000);
        assert_eq!(
            validate(&tx, 1_000, &other.public_key()),
            Err(PoolError::BadAddress)
        );
    }

    #[test]
    fn rejects_tampered_signature() {
        let kp = Keypair::from_seed([1u8; 32]);
        let mut tx = signed_tx(&kp, 1_000);
        tx.signature = shared_types::Signature([9u8; 64]);
        assert_eq!(validate(&tx, 1_000, &kp.public_key()), Err(PoolError::BadSignature));
    }
}
