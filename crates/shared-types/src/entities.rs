//! Core domain entities.
//!
//! ## Clusters
//!
//! - **Chain**: [`Transaction`], [`TransactionKind`], [`Block`].
//! - **Consensus**: [`Validator`], [`ValidatorStatus`].
//! - **Sharding**: [`Shard`].

use crate::codec::{block_header_preimage, transaction_preimage};
use crate::primitives::{Address, Hash, Signature};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The kind of a transaction.
///
/// `CrossShard` iff `shard_key(from) != shard_key(to)` — see
/// [`Transaction::classify_kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// A same-shard value transfer.
    Regular,
    /// A transfer whose source and destination addresses hash to different
    /// shards.
    CrossShard,
    /// A stake-deposit transaction (PoS bookkeeping).
    Stake,
    /// A stake-withdrawal transaction (PoS bookkeeping).
    Unstake,
}

/// A signed value-transfer transaction.
///
/// `id` is the SHA-256 of [`crate::codec::transaction_preimage`] — a
/// deterministic function of every field except `signature` and `id`
/// itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Deterministic content hash; see [`Transaction::compute_id`].
    pub id: Hash,
    /// Sender address.
    pub from: Address,
    /// Recipient address.
    pub to: Address,
    /// Amount transferred, in base units. Invariant: `amount >= 0` (`u64`
    /// makes this structural).
    pub amount: u64,
    /// Fee paid to the block proposer, in base units.
    pub fee: u64,
    /// Opaque payload (unused by the core; carried for forward
    /// compatibility, never interpreted — there is no contract-execution
    /// layer here).
    pub data: Vec<u8>,
    /// Unix timestamp in seconds when the transaction was created.
    pub timestamp: i64,
    /// Sender-scoped replay-protection counter.
    pub nonce: u64,
    /// Shard that owns this transaction's pool: `shard_key(from)`.
    pub shard_id: u32,
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Ed25519 signature by `from` over [`crate::codec::transaction_preimage`].
    pub signature: Signature,
}

impl Transaction {
    /// Build an unsigned transaction with `shard_id`/`kind` left at the
    /// caller-provided values and `id`/`signature` not yet computed. Used
    /// by tests and by the signing path, which fills in `id` and
    /// `signature` afterward.
    #[allow(clippy::too_many_arguments)]
    pub fn new_unsigned(
        from: Address,
        to: Address,
        amount: u64,
        fee: u64,
        data: Vec<u8>,
        timestamp: i64,
        nonce: u64,
        shard_id: u32,
        kind: TransactionKind,
    ) -> Self {
        let mut tx = Self {
            id: Hash::ZERO,
            from,
            to,
            amount,
            fee,
            data,
            timestamp,
            nonce,
            shard_id,
            kind,
            signature: Signature::ZERO,
        };
        tx.id = tx.compute_id();
        tx
    }

    /// Recompute `id` from the current field values (everything but
    /// `signature`/`id`). Used both to set `id` initially and to verify it
    /// during pool admission — `id` must always equal this recomputed
    /// hash.
    pub fn compute_id(&self) -> Hash {
        let preimage = transaction_preimage(self);
        let digest = Sha256::digest(&preimage);
        Hash::from_slice(&digest).expect("sha256 digest is 32 bytes")
    }

    /// Determine `CrossShard` vs `Regular` from the shard keys of `from`
    /// and `to`: `CrossShard` iff `shard_key(from) != shard_key(to)`.
    /// Stake/Unstake are never reclassified by this helper.
    pub fn classify_kind(from_shard: u32, to_shard: u32, requested: TransactionKind) -> TransactionKind {
        match requested {
            TransactionKind::Stake | TransactionKind::Unstake => requested,
            _ if from_shard != to_shard => TransactionKind::CrossShard,
            _ => TransactionKind::Regular,
        }
    }
}

/// A block: an ordered batch of transactions with a header committing to
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Height within this block's shard chain. Genesis is `0`.
    pub index: u64,
    /// Hash of the previous block in this shard's chain. Genesis uses
    /// [`Hash::ZERO`].
    pub prev_hash: Hash,
    /// Unix timestamp in seconds when the block was proposed.
    pub timestamp: i64,
    /// Transactions included in this block, in order.
    pub transactions: Vec<Transaction>,
    /// Address of the validator (or miner, for PoW) who produced this block.
    pub validator: Address,
    /// Signature over the block header by `validator`. For PoW this is the
    /// nonce-bearing proof rather than a conventional signature; PoW
    /// stores its nonce in the low 8 bytes and zero-fills the rest.
    pub signature: Signature,
    /// Shard this block belongs to.
    pub shard_id: u32,
    /// Merkle root over transaction ids.
    pub merkle_root: Hash,
    /// Header hash — the block's identity. Covers `(index, prev_hash,
    /// timestamp, validator, merkle_root, shard_id)`.
    pub hash: Hash,
    /// BFT commit certificate: `(voter, signature over hash)` pairs from
    /// replicas that cast a commit vote. Empty for algorithms that don't
    /// produce one (PoW, PoS, LSCC); PBFT fills this with its quorum's
    /// signatures before a block is considered committed.
    pub commit_certificate: Vec<(Address, Signature)>,
    /// The driver round this block was produced in. Not part of `hash` —
    /// round advances on every attempt (including skipped/aborted ones),
    /// so it diverges from `index` after a round fails to commit.
    /// Algorithms whose leader/primary rotates by round (PBFT) key off
    /// this field rather than `index` so `validate` rederives the same
    /// primary `propose` used.
    pub round: u64,
}

impl Block {
    /// Compute the header hash for the given fields.
    pub fn compute_hash(
        index: u64,
        prev_hash: &Hash,
        timestamp: i64,
        validator: &Address,
        merkle_root: &Hash,
        shard_id: u32,
    ) -> Hash {
        let preimage = block_header_preimage(index, prev_hash, timestamp, validator, merkle_root, shard_id);
        let digest = Sha256::digest(&preimage);
        Hash::from_slice(&digest).expect("sha256 digest is 32 bytes")
    }

    /// Recompute this block's header hash from its current fields.
    pub fn recompute_hash(&self) -> Hash {
        Self::compute_hash(
            self.index,
            &self.prev_hash,
            self.timestamp,
            &self.validator,
            &self.merkle_root,
            self.shard_id,
        )
    }

    /// Merkle root over the transaction ids, in block order.
    pub fn compute_merkle_root(transactions: &[Transaction]) -> Hash {
        if transactions.is_empty() {
            return Hash::ZERO;
        }
        let mut layer: Vec<[u8; 32]> = transactions.iter().map(|tx| *tx.id.as_bytes()).collect();
        while layer.len() > 1 {
            let mut next = Vec::with_capacity(layer.len().div_ceil(2));
            for pair in layer.chunks(2) {
                let mut hasher = Sha256::new();
                hasher.update(pair[0]);
                hasher.update(pair.get(1).unwrap_or(&pair[0]));
                let digest = hasher.finalize();
                let mut buf = [0u8; 32];
                buf.copy_from_slice(&digest);
                next.push(buf);
            }
            layer = next;
        }
        Hash::from_slice(&layer[0]).expect("sha256 digest is 32 bytes")
    }

    /// Build the genesis block for a shard: `index=0`, `prev_hash=0`, no
    /// transactions.
    pub fn genesis(shard_id: u32, timestamp: i64, validator: Address) -> Self {
        let merkle_root = Self::compute_merkle_root(&[]);
        let hash = Self::compute_hash(0, &Hash::ZERO, timestamp, &validator, &merkle_root, shard_id);
        Self {
            index: 0,
            prev_hash: Hash::ZERO,
            timestamp,
            transactions: Vec::new(),
            validator,
            signature: Signature::ZERO,
            shard_id,
            merkle_root,
            hash,
            commit_certificate: Vec::new(),
            round: 0,
        }
    }
}

/// Validator lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatorStatus {
    /// Eligible to propose/attest.
    Active,
    /// Registered but not currently participating.
    Inactive,
    /// Excluded after provable misbehaviour; append-only for a run.
    Slashed,
}

/// A consensus participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validator {
    /// Validator identity, derived the same way as account addresses.
    pub address: Address,
    /// Ed25519 public key backing `address`.
    pub public_key: [u8; 32],
    /// Staked amount, in base units. Non-negative (`u64`).
    pub stake: u64,
    /// Relative voting power (defaults to `stake` but kept distinct so
    /// callers can apply caps without mutating stake accounting).
    pub power: u64,
    /// Current lifecycle status.
    pub status: ValidatorStatus,
    /// Unix timestamp of last observed activity.
    pub last_active: i64,
    /// Shard this validator is assigned to.
    pub shard_id: u32,
    /// Reputation score in `[0, 1]`.
    pub reputation: f64,
}

impl Validator {
    /// Whether this validator currently counts toward quorum
    /// (`status == Active`, not slashed).
    pub fn is_eligible(&self) -> bool {
        self.status == ValidatorStatus::Active
    }
}

/// A shard: a disjoint partition of account space plus its validator set
/// and chain tip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shard {
    /// Shard identifier in `[0, num_shards)`.
    pub id: u32,
    /// Addresses of validators assigned to this shard.
    pub validators: Vec<Address>,
    /// Hash of this shard's current chain tip.
    pub tip_hash: Hash,
    /// Count of cross-shard envelopes this shard is waiting to receive.
    pub pending_cross_in: u64,
    /// Count of cross-shard envelopes this shard has sent and not yet
    /// seen acknowledged or failed.
    pub pending_cross_out: u64,
    /// Health ratio in `[0, 1]` (e.g. live validators / assigned validators).
    pub health: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address([b; 20])
    }

    #[test]
    fn genesis_has_index_zero_and_zero_prev_hash() {
        let g = Block::genesis(0, 1_700_000_000, addr(1));
        assert_eq!(g.index, 0);
        assert_eq!(g.prev_hash, Hash::ZERO);
        assert_eq!(g.hash, g.recompute_hash());
    }

    #[test]
    fn merkle_root_empty_is_zero() {
        assert_eq!(Block::compute_merkle_root(&[]), Hash::ZERO);
    }

    #[test]
    fn merkle_root_single_tx_is_its_id() {
        let tx = Transaction::new_unsigned(addr(1), addr(2), 10, 1, vec![], 1, 0, 0, TransactionKind::Regular);
        let root = Block::compute_merkle_root(std::slice::from_ref(&tx));
        assert_eq!(root, tx.id);
    }

    #[test]
    fn classify_kind_cross_shard() {
        assert_eq!(
            Transaction::classify_kind(0, 1, TransactionKind::Regular),
            TransactionKind::CrossShard
        );
        assert_eq!(
            Transaction::classify_kind(0, 0, TransactionKind::Regular),
            TransactionKind::Regular
        );
    }

    #[test]
    fn validator_eligibility() {
        let mut v = Validator {
            address: addr(1),
            public_key: [0u8; 32],
            stake: 100,
            power: 100,
            status: ValidatorStatus::Active,
            last_active: 0,
            shard_id: 0,
            reputation: 1.0,
        };
        assert!(v.is_eligible());
        v.status = ValidatorStatus::Slashed;
        assert!(!v.is_eligible());
    }
}
