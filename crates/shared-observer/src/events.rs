//! Structured events recorded through [`crate::Observer`].
//!
//! One variant per fatal/metric-worthy transition a consensus round or
//! cross-shard envelope can undergo.

use shared_types::Hash;

/// A structured event emitted by the consensus/sharding core.
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    /// A new round started for a shard.
    RoundStarted { shard_id: u32, round: u64, algorithm: &'static str },
    /// A round committed a block.
    RoundCommitted { shard_id: u32, round: u64, algorithm: &'static str, block_hash: Hash, tx_count: usize },
    /// A round was abandoned and will be retried.
    RoundAborted { shard_id: u32, round: u64, reason: String },
    /// PBFT: a quorum of matching votes was not reached before the phase
    /// deadline.
    QuorumNotReached { shard_id: u32, round: u64, phase: &'static str },
    /// PBFT: a view-change was triggered.
    ViewChange { shard_id: u32, round: u64, new_view: u64 },
    /// LSCC: a phase deadline expired for one or more channels.
    PhaseTimeout { shard_id: u32, round: u64, phase: &'static str },
    /// A fork was detected and resolved by the engine's fork-choice rule.
    ForkDetected { shard_id: u32, index: u64, chosen_hash: Hash },
    /// A validator was added to the slashed set.
    ValidatorSlashed { address: String, reason: String },
    /// A cross-shard envelope resolved to `Failed`.
    CrossShardEnvelopeFailed { message_id: Hash, from_shard: u32, to_shard: u32, reason: String },
    /// A cross-shard envelope resolved to `AppliedDest`.
    CrossShardEnvelopeApplied { message_id: Hash, from_shard: u32, to_shard: u32 },
    /// The transaction pool rejected an admission with `PoolFull`.
    PoolFull { shard_id: u32 },
    /// A fatal store error occurred; the affected shard halts.
    StoreFatal { shard_id: u32, error: String },
    /// A transport send failed and will be retried with back-off.
    TransportError { peer: String, error: String },
}

impl ObserverEvent {
    /// Emit this event through `tracing`, at a level matching its severity.
    pub fn emit_tracing(&self) {
        match self {
            ObserverEvent::RoundStarted { shard_id, round, algorithm } => {
                tracing::debug!(shard_id, round, algorithm, "round started");
            }
            ObserverEvent::RoundCommitted { shard_id, round, algorithm, block_hash, tx_count } => {
                tracing::info!(
                    shard_id,
                    round,
                    algorithm,
                    block_hash = %block_hash,
                    tx_count,
                    "round committed"
                );
            }
            ObserverEvent::RoundAborted { shard_id, round, reason } => {
                tracing::warn!(shard_id, round, reason, "round aborted");
            }
            ObserverEvent::QuorumNotReached { shard_id, round, phase } => {
                tracing::warn!(shard_id, round, phase, "quorum not reached");
            }
            ObserverEvent::ViewChange { shard_id, round, new_view } => {
                tracing::warn!(shard_id, round, new_view, "view change");
            }
            ObserverEvent::PhaseTimeout { shard_id, round, phase } => {
                tracing::warn!(shard_id, round, phase, "phase timeout");
            }
            ObserverEvent::ForkDetected { shard_id, index, chosen_hash } => {
                tracing::warn!(shard_id, index, chosen_hash = %chosen_hash, "fork detected");
            }
            ObserverEvent::ValidatorSlashed { address, reason } => {
                tracing::warn!(address, reason, "validator slashed");
            }
            ObserverEvent::CrossShardEnvelopeFailed { message_id, from_shard, to_shard, reason } => {
                tracing::warn!(
                    message_id = %message_id,
                    from_shard,
                    to_shard,
                    reason,
                    "cross-shard envelope failed"
                );
            }
            ObserverEvent::CrossShardEnvelopeApplied { message_id, from_shard, to_shard } => {
                tracing::debug!(message_id = %message_id, from_shard, to_shard, "cross-shard envelope applied");
            }
            ObserverEvent::PoolFull { shard_id } => {
                tracing::debug!(shard_id, "pool full");
            }
            ObserverEvent::StoreFatal { shard_id, error } => {
                tracing::error!(shard_id, error, "fatal store error, halting shard");
            }
            ObserverEvent::TransportError { peer, error } => {
                tracing::debug!(peer, error, "transport send failed, retrying");
            }
        }
    }

    /// Update the relevant [`crate::Metrics`] counters/gauges for this event.
    pub fn update_metrics(&self, metrics: &crate::Metrics) {
        match self {
            ObserverEvent::RoundCommitted { shard_id, algorithm, .. } => {
                metrics
                    .blocks_committed_total
                    .with_label_values(&[&shard_id.to_string(), algorithm])
                    .inc();
            }
            ObserverEvent::RoundAborted { .. } => metrics.rounds_aborted_total.inc(),
            ObserverEvent::QuorumNotReached { .. } => metrics.quorum_failures_total.inc(),
            ObserverEvent::ViewChange { .. } => metrics.view_changes_total.inc(),
            ObserverEvent::PhaseTimeout { .. } => metrics.phase_timeouts_total.inc(),
            ObserverEvent::ValidatorSlashed { .. } => metrics.validators_slashed_total.inc(),
            ObserverEvent::CrossShardEnvelopeFailed { .. } => metrics.cross_shard_envelopes_failed_total.inc(),
            ObserverEvent::StoreFatal { .. } => metrics.store_fatal_total.inc(),
            _ => {}
        }
    }
}
