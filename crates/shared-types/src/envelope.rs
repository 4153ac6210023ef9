//! Cross-shard routing envelope.

use crate::entities::Transaction;
use crate::primitives::Hash;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Delivery state of a [`CrossShardEnvelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvelopeState {
    /// Created by the source shard, not yet included in a block.
    Proposed,
    /// Included in a source-shard block; awaiting destination application.
    CommittedSource,
    /// Applied by the destination shard.
    AppliedDest,
    /// Failed validation or missed its deadline; source-side credit undone.
    Failed,
}

/// A routing record for a `cross_shard` transaction.
///
/// Invariant: every envelope that reaches [`EnvelopeState::CommittedSource`]
/// eventually reaches [`EnvelopeState::AppliedDest`] or
/// [`EnvelopeState::Failed`] before `deadline`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossShardEnvelope {
    /// Idempotence key, derived from the transaction id and direction
    /// (see [`CrossShardEnvelope::derive_message_id`]).
    pub message_id: Hash,
    /// Shard the envelope originates from.
    pub from_shard: u32,
    /// Shard the envelope must be applied on.
    pub to_shard: u32,
    /// The routed transaction.
    pub payload: Transaction,
    /// Current delivery state.
    pub state: EnvelopeState,
    /// Unix timestamp by which the envelope must resolve to
    /// `AppliedDest`/`Failed`.
    pub deadline: i64,
}

impl CrossShardEnvelope {
    /// Derive the envelope's idempotence key from the transaction id and
    /// direction, so duplicate envelopes for the same transaction/route are
    /// discarded at the destination instead of applied twice.
    pub fn derive_message_id(tx_id: &Hash, from_shard: u32, to_shard: u32) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(tx_id.as_bytes());
        hasher.update(from_shard.to_be_bytes());
        hasher.update(to_shard.to_be_bytes());
        let digest = hasher.finalize();
        Hash::from_slice(&digest).expect("sha256 digest is 32 bytes")
    }

    /// Build a new envelope in [`EnvelopeState::Proposed`] for `tx`.
    pub fn new(tx: Transaction, from_shard: u32, to_shard: u32, deadline: i64) -> Self {
        let message_id = Self::derive_message_id(&tx.id, from_shard, to_shard);
        Self {
            message_id,
            from_shard,
            to_shard,
            payload: tx,
            state: EnvelopeState::Proposed,
            deadline,
        }
    }

    /// Whether `now` is past this envelope's deadline without resolution.
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.deadline
            && !matches!(self.state, EnvelopeState::AppliedDest | EnvelopeState::Failed)
    }
}
