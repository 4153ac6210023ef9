//! `TransactionPool`: three disjoint sets — pending, confirmed, failed —
//! keyed by transaction id, behind a single mutex per pool.

use crate::validation;
use shared_crypto::signing::PublicKey;
use shared_types::{Hash, PoolError, Transaction};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Ordering key for draining pending transactions deterministically:
/// `(timestamp, id)`, so two nodes with the same pending set always drain
/// in the same order.
type PendingKey = (i64, Hash);

struct PoolState {
    pending: BTreeMap<PendingKey, Transaction>,
    pending_ids: HashMap<Hash, PendingKey>,
    confirmed: HashMap<Hash, Transaction>,
    failed: HashMap<Hash, (Transaction, String)>,
}

impl PoolState {
    fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
            pending_ids: HashMap::new(),
            confirmed: HashMap::new(),
            failed: HashMap::new(),
        }
    }

    fn contains(&self, id: &Hash) -> bool {
        self.pending_ids.contains_key(id) || self.confirmed.contains_key(id) || self.failed.contains_key(id)
    }
}

/// The shard-agnostic transaction pool. One instance serves every shard;
/// [`TransactionPool::take_for_shard`] filters by `shard_id` at drain time.
pub struct TransactionPool {
    max_size: usize,
    state: Mutex<PoolState>,
}

impl TransactionPool {
    /// Build an empty pool bounded at `max_size` pending entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            state: Mutex::new(PoolState::new()),
        }
    }

    /// Number of pending entries.
    pub fn pending_len(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    /// Whether `id` is present in any of the three sets.
    pub fn contains(&self, id: &Hash) -> bool {
        self.state.lock().unwrap().contains(id)
    }

    /// Validate `tx` against `public_key` and, on success, admit it to the
    /// pending set. Admission is idempotent: re-admitting an id already
    /// present in any of the three sets is a no-op success, not an error.
    pub fn admit(&self, tx: Transaction, now: i64, public_key: &PublicKey) -> Result<(), PoolError> {
        let mut state = self.state.lock().unwrap();
        if state.contains(&tx.id) {
            debug!(id = %tx.id, "duplicate admission, ignored");
            return Ok(());
        }
        if let Err(e) = validation::validate(&tx, now, public_key) {
            warn!(id = %tx.id, error = %e, "rejected at admission");
            state.failed.insert(tx.id, (tx, e.to_string()));
            return Err(e);
        }
        if state.pending.len() >= self.max_size {
            return Err(PoolError::PoolFull);
        }
        let key = (tx.timestamp, tx.id);
        state.pending_ids.insert(tx.id, key);
        state.pending.insert(key, tx);
        Ok(())
    }

    /// Drain up to `limit` pending entries targeting `shard_id`, in
    /// `(timestamp, id)` order. Drained entries leave the pending set; the
    /// driver is responsible for calling [`Self::confirm`] or
    /// [`Self::fail`] on each one once the round resolves.
    pub fn take_for_shard(&self, shard_id: u32, limit: usize) -> Vec<Transaction> {
        let mut state = self.state.lock().unwrap();
        let keys: Vec<PendingKey> = state
            .pending
            .iter()
            .filter(|(_, tx)| tx.shard_id == shard_id)
            .map(|(k, _)| *k)
            .take(limit)
            .collect();
        keys.into_iter()
            .filter_map(|k| {
                let tx = state.pending.remove(&k)?;
                state.pending_ids.remove(&tx.id);
                Some(tx)
            })
            .collect()
    }

    /// Return a previously drained batch to the pending set, unchanged
    /// (used when a round is aborted or a competing block is preferred).
    pub fn return_batch(&self, batch: Vec<Transaction>) {
        let mut state = self.state.lock().unwrap();
        for tx in batch {
            if state.contains(&tx.id) {
                continue;
            }
            let key = (tx.timestamp, tx.id);
            state.pending_ids.insert(tx.id, key);
            state.pending.insert(key, tx);
        }
    }

    /// Move `tx` into the confirmed set after it lands in a committed block.
    pub fn confirm(&self, tx: Transaction) {
        let mut state = self.state.lock().unwrap();
        state.pending_ids.remove(&tx.id);
        state.confirmed.insert(tx.id, tx);
    }

    /// Move `tx` into the failed set with `reason` attached.
    pub fn fail(&self, tx: Transaction, reason: impl Into<String>) {
        let mut state = self.state.lock().unwrap();
        state.pending_ids.remove(&tx.id);
        state.failed.insert(tx.id, (tx, reason.into()));
    }

    /// Evict pending entries older than `before_ts`, moving each to the
    /// failed set with reason `"expired"`. Returns the count evicted.
    pub fn gc(&self, before_ts: i64) -> usize {
        let mut state = self.state.lock().unwrap();
        let stale: Vec<PendingKey> = state
            .pending
            .range(..(before_ts, Hash::ZERO))
            .map(|(k, _)| *k)
            .collect();
        let count = stale.len();
        for key in stale {
            if let Some(tx) = state.pending.remove(&key) {
                state.pending_ids.remove(&tx.id);
                state.failed.insert(tx.id, (tx, "expired".to_string()));
            }
        }
        count
    }

    /// Look up a confirmed transaction by id.
    pub fn get_confirmed(&self, id: &Hash) -> Option<Transaction> {
        self.state.lock().unwrap().confirmed.get(id).cloned()
    }

    /// Look up a failed transaction and its reason by id.
    pub fn get_failed(&self, id: &Hash) -> Option<(Transaction, String)> {
        self.state.lock().unwrap().failed.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::signing::Keypair;
    use shared_types::{codec, Address, TransactionKind};

    fn signed_tx(kp: &Keypair, shard_id: u32, timestamp: i64) -> Transaction {
        let mut tx = Transaction::new_unsigned(
            kp.address(),
            Address([9u8; 20]),
            1,
            1,
            vec![],
            timestamp,
            0,
            shard_id,
            TransactionKind::Regular,
        );
        tx.signature = kp.sign(&codec::transaction_preimage(&tx));
        tx
    }

    #[test]
    fn admit_then_take_for_shard_drains_in_order() {
        let pool = TransactionPool::new(10);
        let kp = Keypair::from_seed([1u8; 32]);
        let a = signed_tx(&kp, 0, 100);
        let b = signed_tx(&Keypair::from_seed([2u8; 32]), 0, 50);
        pool.admit(a.clone(), 1_000, &kp.public_key()).unwrap();
        pool.admit(b.clone(), 1_000, &Keypair::from_seed([2u8; 32]).public_key())
            .unwrap();
        let drained = pool.take_for_shard(0, 10);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].id, b.id); // earlier timestamp first
        assert_eq!(pool.pending_len(), 0);
    }

    #[test]
    fn take_for_shard_ignores_other_shards() {
        let pool = TransactionPool::new(10);
        let kp = Keypair::from_seed([1u8; 32]);
        let tx = signed_tx(&kp, 1, 100);
        pool.admit(tx, 1_000, &kp.public_key()).unwrap();
        assert!(pool.take_for_shard(0, 10).is_empty());
        assert_eq!(pool.take_for_shard(1, 10).len(), 1);
    }

    #[test]
    fn pool_full_rejects_admission() {
        let pool = TransactionPool::new(1);
        let kp1 = Keypair::from_seed([1u8; 32]);
        let kp2 = Keypair::from_seed([2u8; 32]);
        pool.admit(signed_tx(&kp1, 0, 1), 1_000, &kp1.public_key()).unwrap();
        let err = pool.admit(signed_tx(&kp2, 0, 2), 1_000, &kp2.public_key()).unwrap_err();
        assert_eq!(err, PoolError::PoolFull);
    }

    #[test]
    fn duplicate_admission_is_idempotent() {
        let pool = TransactionPool::new(10);
        let kp = Keypair::from_seed([1u8; 32]);
        let tx = signed_tx(&kp, 0, 1);
        pool.admit(tx.clone(), 1_000, &kp.public_key()).unwrap();
        pool.admit(tx, 1_000, &kp.public_key()).unwrap();
        assert_eq!(pool.pending_len(), 1);
    }

    #[test]
    fn gc_moves_stale_entries_to_failed() {
        let pool = TransactionPool::new(10);
        let kp = Keypair::from_seed([1u8; 32]);
        let tx = signed_tx(&kp, 0, 10);
        pool.admit(tx.clone(), 10, &kp.public_key()).unwrap();
        let evicted = pool.gc(20);
        assert_eq!(evicted, 1);
        assert_eq!(pool.pending_len(), 0);
        assert!(pool.get_failed(&tx.id).is_some());
    }

    #[test]
    fn return_batch_restores_pending() {
        let pool = TransactionPool::new(10);
        let kp = Keypair::from_seed([1u8; 32]);
        let tx = signed_tx(&kp, 0, 10);
        pool.admit(tx, 10, &kp.public_key()).unwrap();
        let drained = pool.take_for_shard(0, 10);
        assert_eq!(pool.pending_len(), 0);
        pool.return_batch(drained);
        assert_eq!(pool.pending_len(), 1);
    }
}
