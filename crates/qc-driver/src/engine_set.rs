//! [`EngineSet`]: the tagged union of concrete engine types the driver
//! holds instead of `Box<dyn ConsensusEngine>`, so it can reach each
//! algorithm's extra inherent surface (PBFT's vote recording, LSCC's
//! channel-signature recording) when dispatching gossip messages, not just
//! the common `ConsensusEngine` contract.

use async_trait::async_trait;
use qc_consensus_core::{BlockCandidate, ConsensusEngine, ConsensusState, EngineError, ForkChoice, ProposeContext};
use qc_lscc::LsccEngine;
use qc_pbft::PbftEngine;
use qc_pos::PosEngine;
use qc_pow::PowEngine;
use shared_crypto::signing::Keypair;
use shared_types::config::ConsensusAlgorithm;
use shared_types::{Block, Clock, Validator};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// One per shard. Constructed once at startup from that shard's
/// `consensus.algorithm` choice and held for the shard driver's lifetime.
pub enum EngineSet {
    /// Proof-of-Work.
    Pow(PowEngine),
    /// Proof-of-Stake.
    Pos(PosEngine),
    /// PBFT.
    Pbft(PbftEngine),
    /// LSCC.
    Lscc(LsccEngine),
}

impl EngineSet {
    /// Build the engine named by `config.algorithm`, signing with
    /// `keypair` where the algorithm needs a local identity (PoS/PBFT/
    /// LSCC; PoW has no leader concept and ignores it).
    pub fn new(config: &shared_types::config::ConsensusConfig, keypair: Arc<Keypair>, clock: Arc<dyn Clock>) -> Self {
        let phase_timeout = Duration::from_secs(config.phase_timeout_secs);
        match config.algorithm {
            ConsensusAlgorithm::Pow => {
                let ceiling = Duration::from_millis(config.pow_round_ceiling_millis);
                EngineSet::Pow(PowEngine::with_clock(config.difficulty, ceiling, clock))
            }
            ConsensusAlgorithm::Pos => EngineSet::Pos(PosEngine::with_clock(
                keypair,
                config.min_stake,
                config.inactivity_bound_secs,
                config.epoch_length,
                clock,
            )),
            ConsensusAlgorithm::Pbft => EngineSet::Pbft(PbftEngine::with_clock(keypair, config.byzantine, phase_timeout, clock)),
            ConsensusAlgorithm::Lscc => EngineSet::Lscc(LsccEngine::with_clock(
                keypair,
                config.layer_depth,
                config.channel_count,
                config.commit_threshold,
                config.weights,
                phase_timeout,
                clock,
            )),
        }
    }

    /// The PBFT engine, if this is a PBFT shard — used by the driver's
    /// consensus-message dispatch to reach `record_prepare`/
    /// `record_commit`/`force_view_change`.
    pub fn as_pbft(&self) -> Option<&PbftEngine> {
        match self {
            EngineSet::Pbft(e) => Some(e),
            _ => None,
        }
    }

    /// The LSCC engine, if this is an LSCC shard — used by the driver's
    /// consensus-message dispatch to reach `record_channel_signature`/
    /// `report_inconsistent_signer`/`force_abort`.
    pub fn as_lscc(&self) -> Option<&LsccEngine> {
        match self {
            EngineSet::Lscc(e) => Some(e),
            _ => None,
        }
    }
}

#[async_trait]
impl ConsensusEngine for EngineSet {
    fn name(&self) -> &'static str {
        match self {
            EngineSet::Pow(e) => e.name(),
            EngineSet::Pos(e) => e.name(),
            EngineSet::Pbft(e) => e.name(),
            EngineSet::Lscc(e) => e.name(),
        }
    }

    async fn propose(&self, ctx: ProposeContext) -> Result<BlockCandidate, EngineError> {
        match self {
            EngineSet::Pow(e) => e.propose(ctx).await,
            EngineSet::Pos(e) => e.propose(ctx).await,
            EngineSet::Pbft(e) => e.propose(ctx).await,
            EngineSet::Lscc(e) => e.propose(ctx).await,
        }
    }

    fn validate(&self, block: &Block, tip: &Block, validators: &[Validator]) -> Result<(), EngineError> {
        match self {
            EngineSet::Pow(e) => e.validate(block, tip, validators),
            EngineSet::Pos(e) => e.validate(block, tip, validators),
            EngineSet::Pbft(e) => e.validate(block, tip, validators),
            EngineSet::Lscc(e) => e.validate(block, tip, validators),
        }
    }

    fn select_leader(&self, validators: &[Validator], round: u64) -> Result<Validator, EngineError> {
        match self {
            EngineSet::Pow(e) => e.select_leader(validators, round),
            EngineSet::Pos(e) => e.select_leader(validators, round),
            EngineSet::Pbft(e) => e.select_leader(validators, round),
            EngineSet::Lscc(e) => e.select_leader(validators, round),
        }
    }

    fn reset(&self) {
        match self {
            EngineSet::Pow(e) => e.reset(),
            EngineSet::Pos(e) => e.reset(),
            EngineSet::Pbft(e) => e.reset(),
            EngineSet::Lscc(e) => e.reset(),
        }
    }

    fn snapshot_state(&self) -> ConsensusState {
        match self {
            EngineSet::Pow(e) => e.snapshot_state(),
            EngineSet::Pos(e) => e.snapshot_state(),
            EngineSet::Pbft(e) => e.snapshot_state(),
            EngineSet::Lscc(e) => e.snapshot_state(),
        }
    }

    fn metrics(&self) -> BTreeMap<String, f64> {
        match self {
            EngineSet::Pow(e) => e.metrics(),
            EngineSet::Pos(e) => e.metrics(),
            EngineSet::Pbft(e) => e.metrics(),
            EngineSet::Lscc(e) => e.metrics(),
        }
    }

    fn fork_choice(&self, local: &Block, remote: &Block) -> ForkChoice {
        match self {
            EngineSet::Pow(e) => e.fork_choice(local, remote),
            EngineSet::Pos(e) => e.fork_choice(local, remote),
            EngineSet::Pbft(e) => e.fork_choice(local, remote),
            EngineSet::Lscc(e) => e.fork_choice(local, remote),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::config::ConsensusConfig;
    use shared_types::FixedClock;

    #[test]
    fn builds_the_algorithm_named_in_config() {
        let keypair = Arc::new(Keypair::from_seed([1u8; 32]));
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(0));
        let mut config = ConsensusConfig { algorithm: ConsensusAlgorithm::Pbft, ..ConsensusConfig::default() };
        let set = EngineSet::new(&config, keypair.clone(), clock.clone());
        assert_eq!(set.name(), "pbft");
        assert!(set.as_pbft().is_some());

        config.algorithm = ConsensusAlgorithm::Lscc;
        let set = EngineSet::new(&config, keypair, clock);
        assert_eq!(set.name(), "lscc");
        assert!(set.as_lscc().is_some());
    }
}
