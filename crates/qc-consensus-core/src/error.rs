//! Consensus engine errors.

use thiserror::Error;

/// Errors an algorithm's `propose`/`validate`/`select_leader` can raise.
///
/// Validator-selection errors trigger local recovery (the round is
/// retried); `QuorumNotReached`/`ViewChange`/`PhaseTimeout` are
/// consensus-timing errors, retryable and invisible to submitters;
/// `ForkDetected` is resolved by the engine's own fork-choice rule.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// `select_leader`/`validate` referenced a validator not present in the
    /// current validator set.
    #[error("unknown validator: {0}")]
    UnknownValidator(String),
    /// The block's claimed validator is in the slashed set.
    #[error("slashed validator: {0}")]
    SlashedValidator(String),
    /// PoS: the eligible set is empty, or the proposer's stake is below
    /// `min_stake`.
    #[error("insufficient stake for leader selection")]
    InsufficientStake,
    /// PBFT/LSCC: a required quorum/majority was not reached before the
    /// phase deadline.
    #[error("quorum not reached in phase {phase}")]
    QuorumNotReached {
        /// Name of the phase that failed to reach quorum.
        phase: &'static str,
    },
    /// PBFT: a view-change was triggered; `new_view` is the view about to
    /// be installed.
    #[error("view change to view {new_view}")]
    ViewChange {
        /// The view number the view-change is moving to.
        new_view: u64,
    },
    /// LSCC: a phase deadline expired before all channels replied.
    #[error("phase timeout in phase {phase}")]
    PhaseTimeout {
        /// Name of the phase whose deadline expired.
        phase: &'static str,
    },
    /// PoW/general: two competing valid blocks existed at the same height;
    /// the engine's fork-choice rule has already selected `chosen_index`.
    #[error("fork detected at index {index}")]
    ForkDetected {
        /// The contested block height.
        index: u64,
    },
    /// A block failed structural or cryptographic validation.
    #[error("invalid block: {0}")]
    InvalidBlock(String),
    /// PBFT: the supplied validator set cannot satisfy `|V| >= 3f+1`.
    #[error("validator set too small for byzantine tolerance f={f}: have {have}, need {need}")]
    InsufficientValidatorsForByzantineTolerance {
        /// The configured Byzantine-fault tolerance.
        f: u32,
        /// The number of validators actually supplied.
        have: usize,
        /// The minimum required (`3f + 1`).
        need: usize,
    },
    /// LSCC: Phase A needs at least 3 validators to form a single channel.
    #[error("insufficient validators to form channels: have {have}, need at least {need}")]
    InsufficientValidatorsForChannels {
        /// The number of eligible validators actually supplied.
        have: usize,
        /// The minimum required (3, a channel's floor size).
        need: usize,
    },
}
