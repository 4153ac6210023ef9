//! The `ConsensusEngine` contract.
//!
//! Engines are pure with respect to the pool and chain — they never mutate
//! store state directly; they return a decision that the driver (qc-driver)
//! applies. Engines *may* hold private interior-mutable round state (PBFT
//! phase/view, LSCC phase machine) behind `&self` — that state is the
//! engine's own bookkeeping, not chain/pool state.

use crate::error::EngineError;
use async_trait::async_trait;
use shared_types::{Block, Transaction, Validator};
use std::collections::BTreeMap;

/// Everything an engine needs to attempt one round's proposal.
pub struct ProposeContext {
    /// Shard this round is for.
    pub shard_id: u32,
    /// Monotonically increasing round number for this shard.
    pub round: u64,
    /// Transactions drained from the pool for this round.
    pub batch: Vec<Transaction>,
    /// The shard's current chain tip.
    pub chain_tip: Block,
    /// The validator set visible to this round (a registry snapshot).
    pub validators: Vec<Validator>,
}

/// A block an engine has decided to propose, not yet applied by the driver.
pub struct BlockCandidate {
    /// The fully-formed block (hash, signature, merkle root all set).
    pub block: Block,
    /// Name of the algorithm that produced this candidate, for metrics/logs.
    pub algorithm: &'static str,
}

/// A point-in-time snapshot of an engine's internal round state, returned
/// by `snapshot_state` for diagnostics/admin tooling.
#[derive(Debug, Clone, Default)]
pub struct ConsensusState {
    /// Shard this state belongs to.
    pub shard_id: u32,
    /// Current round number.
    pub round: u64,
    /// Human-readable phase name (`"idle"`, `"prepare"`, `"scoring"`, ...).
    pub phase: String,
    /// Free-form algorithm-specific details (view number, channel counts,
    /// last commit score, ...), kept as strings so this struct stays
    /// algorithm-agnostic.
    pub details: BTreeMap<String, String>,
}

/// The common contract every consensus algorithm implements.
#[async_trait]
pub trait ConsensusEngine: Send + Sync {
    /// Stable algorithm name, used in metrics/logs/events (`"pow"`, `"pos"`,
    /// `"pbft"`, `"lscc"`).
    fn name(&self) -> &'static str;

    /// Attempt to produce a block for this round. May internally run a
    /// multi-phase protocol (PBFT/LSCC) or a bounded search (PoW).
    async fn propose(&self, ctx: ProposeContext) -> Result<BlockCandidate, EngineError>;

    /// Validate a block received from a peer or re-validate a locally
    /// produced one, against the given tip and validator set.
    fn validate(&self, block: &Block, tip: &Block, validators: &[Validator]) -> Result<(), EngineError>;

    /// Deterministically select the leader/proposer for `round` from
    /// `validators`. Pure function of its inputs: two honest nodes with
    /// the same validator set always pick the same leader for a given
    /// round.
    fn select_leader(&self, validators: &[Validator], round: u64) -> Result<Validator, EngineError>;

    /// Clear all per-round interior state (used when a shard's driver is
    /// restarted or a round is abandoned).
    fn reset(&self);

    /// Snapshot this engine's current round state.
    fn snapshot_state(&self) -> ConsensusState;

    /// Algorithm-specific metrics as a flat name->value map (merged into
    /// the shared [`shared_observer::Metrics`] registry by the driver).
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Decide between a locally produced candidate and a competing block a
    /// peer delivered first for the same height. The default is
    /// longest-chain by index, ties broken by smallest hash, which is also
    /// a correct race tiebreaker for the leader-based algorithms.
    fn fork_choice(&self, local: &Block, remote: &Block) -> ForkChoice {
        match local.index.cmp(&remote.index) {
            std::cmp::Ordering::Less => ForkChoice::PreferRemote,
            std::cmp::Ordering::Greater => ForkChoice::KeepLocal,
            std::cmp::Ordering::Equal => {
                if remote.hash.as_bytes() < local.hash.as_bytes() {
                    ForkChoice::PreferRemote
                } else {
                    ForkChoice::KeepLocal
                }
            }
        }
    }
}

/// The outcome of [`ConsensusEngine::fork_choice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkChoice {
    /// Keep the locally produced candidate; discard the competing block.
    KeepLocal,
    /// Discard the local candidate (return its batch to the pool); adopt
    /// the peer's block instead.
    PreferRemote,
}
