//! Error kinds shared across crate boundaries.
//!
//! Consensus engine errors (`QuorumNotReached`, `ViewChange`, `PhaseTimeout`,
//! `ForkDetected`, `UnknownValidator`, ...) live in `qc-consensus-core`
//! instead, since they are specific to the `ConsensusEngine` contract.

use thiserror::Error;

/// Errors raised during transaction pool admission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Signature does not verify under `from`'s public key.
    #[error("bad signature")]
    BadSignature,
    /// `id` does not match the recomputed content hash.
    #[error("bad hash")]
    BadHash,
    /// `from`/`to` is not a well-formed address for this chain.
    #[error("bad address")]
    BadAddress,
    /// `amount` or `fee` is negative (structurally unreachable with `u64`,
    /// kept as a named variant for forward compatibility with signed
    /// amount types).
    #[error("negative amount")]
    NegativeAmount,
    /// `timestamp` is older than `now - 24h`.
    #[error("transaction expired")]
    Expired,
    /// `timestamp` is more than 5 minutes in the future.
    #[error("future timestamp")]
    FutureTimestamp,
    /// Pool is at `pool.max_size` and cannot admit more pending transactions.
    #[error("pool full")]
    PoolFull,
    /// A transaction with this id is already in the pool
    /// (pending/confirmed/failed) — admit is idempotent, not an error.
    #[error("duplicate transaction")]
    Duplicate,
    /// Transaction's `shard_id` does not match `shard_key(from)`.
    #[error("shard mismatch: tx targets shard {expected}, admitted to {actual}")]
    ShardMismatch {
        /// The shard the transaction's `from` address actually maps to.
        expected: u32,
        /// The shard the pool that rejected it belongs to.
        actual: u32,
    },
}

/// Errors raised by the durable persistence layer.
///
/// `StoreError` is fatal for the affected shard: the driver halts the shard
/// and emits an alarm rather than retrying indefinitely.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The requested block/transaction/validator/shard does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// A batch commit failed; no partial write occurred.
    #[error("batch commit failed: {0}")]
    CommitFailed(String),
    /// The underlying storage engine returned an I/O or corruption error.
    #[error("storage backend error: {0}")]
    Backend(String),
    /// `append_atomically` was asked to write a block whose `prev_hash`
    /// does not match the stored tip.
    #[error("parent mismatch: expected tip {expected}, block's prev_hash was {actual}")]
    ParentMismatch {
        /// Hex-rendered hash of the stored tip.
        expected: String,
        /// Hex-rendered `prev_hash` carried by the rejected block.
        actual: String,
    },
}

/// Errors raised by the peer transport. Retried with back-off; the peer is
/// eventually dropped if it stays unreachable.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The outbound queue for this peer/destination is full; message dropped.
    #[error("send queue full for peer {0}")]
    QueueFull(String),
    /// The peer is unreachable (no open connection).
    #[error("peer unreachable: {0}")]
    PeerUnreachable(String),
    /// The inbound channel was closed (receiver dropped).
    #[error("channel closed")]
    ChannelClosed,
}
