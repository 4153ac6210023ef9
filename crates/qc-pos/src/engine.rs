//! The Proof-of-Stake [`ConsensusEngine`] implementation.

use crate::leader::select_leader;
use async_trait::async_trait;
use qc_consensus_core::{BlockCandidate, ConsensusEngine, ConsensusState, EngineError, ProposeContext};
use shared_crypto::signing::{self, Keypair};
use shared_types::codec::block_header_preimage;
use shared_types::{Block, Clock, SystemClock, Validator};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Stake-weighted Proof-of-Stake engine. Holds the local node's signing
/// keypair — `propose` is only ever called on the node `select_leader`
/// names for that round; the engine does not re-derive leadership from its
/// own key.
pub struct PosEngine {
    keypair: Arc<Keypair>,
    min_stake: u64,
    inactivity_bound_secs: i64,
    epoch_length: u64,
    clock: Arc<dyn Clock>,
    last_round: Mutex<(u32, u64)>,
    last_eligible_count: AtomicU64,
    last_total_stake: AtomicU64,
}

impl PosEngine {
    /// Build an engine signing blocks with `keypair`.
    pub fn new(keypair: Arc<Keypair>, min_stake: u64, inactivity_bound_secs: i64, epoch_length: u64) -> Self {
        Self::with_clock(keypair, min_stake, inactivity_bound_secs, epoch_length, Arc::new(SystemClock))
    }

    /// Build an engine with an injected clock, for deterministic tests.
    pub fn with_clock(
        keypair: Arc<Keypair>,
        min_stake: u64,
        inactivity_bound_secs: i64,
        epoch_length: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            keypair,
            min_stake,
            inactivity_bound_secs,
            epoch_length,
            clock,
            last_round: Mutex::new((0, 0)),
            last_eligible_count: AtomicU64::new(0),
            last_total_stake: AtomicU64::new(0),
        }
    }

    fn record_selection(&self, validators: &[Validator], now: i64) {
        let eligible = crate::leader::eligible_validators(validators, self.min_stake, self.inactivity_bound_secs, now);
        self.last_eligible_count.store(eligible.len() as u64, Ordering::Relaxed);
        self.last_total_stake.store(eligible.iter().map(|v| v.stake).sum(), Ordering::Relaxed);
    }
}

#[async_trait]
impl ConsensusEngine for PosEngine {
    fn name(&self) -> &'static str {
        "pos"
    }

    async fn propose(&self, ctx: ProposeContext) -> Result<BlockCandidate, EngineError> {
        let now = self.clock.now_wall();
        self.record_selection(&ctx.validators, now);

        let index = ctx.chain_tip.index + 1;
        let prev_hash = ctx.chain_tip.hash;
        let merkle_root = Block::compute_merkle_root(&ctx.batch);
        let validator = self.keypair.address();

        let preimage = block_header_preimage(index, &prev_hash, now, &validator, &merkle_root, ctx.shard_id);
        let signature = self.keypair.sign(&preimage);
        let hash = Block::compute_hash(index, &prev_hash, now, &validator, &merkle_root, ctx.shard_id);

        *self.last_round.lock().unwrap() = (ctx.shard_id, ctx.round);

        let block = Block {
            index,
            prev_hash,
            timestamp: now,
            transactions: ctx.batch,
            validator,
            signature,
            shard_id: ctx.shard_id,
            merkle_root,
            hash,
            commit_certificate: Vec::new(),
            round: ctx.round,
        };
        Ok(BlockCandidate { block, algorithm: self.name() })
    }

    fn validate(&self, block: &Block, tip: &Block, validators: &[Validator]) -> Result<(), EngineError> {
        if block.index != tip.index + 1 {
            return Err(EngineError::InvalidBlock(format!("expected index {}, got {}", tip.index + 1, block.index)));
        }
        if block.prev_hash != tip.hash {
            return Err(EngineError::InvalidBlock("prev_hash does not match tip".to_string()));
        }
        if block.hash != block.recompute_hash() {
            return Err(EngineError::InvalidBlock("hash does not match header fields".to_string()));
        }
        if block.merkle_root != Block::compute_merkle_root(&block.transactions) {
            return Err(EngineError::InvalidBlock("merkle root does not match transactions".to_string()));
        }

        let proposer = validators
            .iter()
            .find(|v| v.address == block.validator)
            .ok_or_else(|| EngineError::UnknownValidator(block.validator.to_hex()))?;
        if !proposer.is_eligible() {
            return Err(EngineError::SlashedValidator(block.validator.to_hex()));
        }

        let expected_leader = select_leader(validators, block.index, self.min_stake, self.inactivity_bound_secs, block.timestamp)?;
        if expected_leader.address != block.validator {
            return Err(EngineError::InvalidBlock(format!(
                "block proposer {} is not the selected leader {} for round {}",
                block.validator, expected_leader.address, block.index
            )));
        }

        let preimage = block_header_preimage(block.index, &block.prev_hash, block.timestamp, &block.validator, &block.merkle_root, block.shard_id);
        signing::verify(&proposer.public_key, &preimage, &block.signature)
            .map_err(|e| EngineError::InvalidBlock(format!("signature verification failed: {e}")))?;

        Ok(())
    }

    fn select_leader(&self, validators: &[Validator], round: u64) -> Result<Validator, EngineError> {
        let now = self.clock.now_wall();
        select_leader(validators, round, self.min_stake, self.inactivity_bound_secs, now)
    }

    fn reset(&self) {
        self.last_eligible_count.store(0, Ordering::Relaxed);
        self.last_total_stake.store(0, Ordering::Relaxed);
    }

    fn snapshot_state(&self) -> ConsensusState {
        let (shard_id, round) = *self.last_round.lock().unwrap();
        let mut details = BTreeMap::new();
        details.insert("epoch".to_string(), (round / self.epoch_length.max(1)).to_string());
        details.insert("eligible_count".to_string(), self.last_eligible_count.load(Ordering::Relaxed).to_string());
        details.insert("total_stake".to_string(), self.last_total_stake.load(Ordering::Relaxed).to_string());
        ConsensusState { shard_id, round, phase: "idle".to_string(), details }
    }

    fn metrics(&self) -> BTreeMap<String, f64> {
        let mut m = BTreeMap::new();
        m.insert("pos_last_eligible_count".to_string(), self.last_eligible_count.load(Ordering::Relaxed) as f64);
        m.insert("pos_last_total_stake".to_string(), self.last_total_stake.load(Ordering::Relaxed) as f64);
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Address, FixedClock, ValidatorStatus};

    fn validator(address: Address, public_key: [u8; 32], stake: u64) -> Validator {
        Validator {
            address,
            public_key,
            stake,
            power: stake,
            status: ValidatorStatus::Active,
            last_active: 0,
            shard_id: 0,
            reputation: 1.0,
        }
    }

    #[tokio::test]
    async fn propose_produces_a_validating_block() {
        let keypair = Arc::new(Keypair::from_seed([1u8; 32]));
        let clock = Arc::new(FixedClock::new(1_700_000_000));
        let engine = PosEngine::with_clock(keypair.clone(), 0, 3600, 32, clock);

        let tip = Block::genesis(0, 1_700_000_000, Address::ZERO);
        let leader = validator(keypair.address(), keypair.public_key(), 100);
        let ctx = ProposeContext { shard_id: 0, round: 1, batch: vec![], chain_tip: tip.clone(), validators: vec![leader.clone()] };

        let candidate = engine.propose(ctx).await.unwrap();
        assert!(engine.validate(&candidate.block, &tip, &[leader]).is_ok());
    }

    #[tokio::test]
    async fn validate_rejects_wrong_proposer() {
        let keypair = Arc::new(Keypair::from_seed([1u8; 32]));
        let other = Keypair::from_seed([2u8; 32]);
        let clock = Arc::new(FixedClock::new(1_700_000_000));
        let engine = PosEngine::with_clock(keypair.clone(), 0, 3600, 32, clock);

        let tip = Block::genesis(0, 1_700_000_000, Address::ZERO);
        let leader = validator(keypair.address(), keypair.public_key(), 100);
        // Zero stake: by construction of the accumulate-until-exceeded walk,
        // a zero-stake validator can never be the selected leader, so this
        // test's failure mode is deterministic rather than a 1-in-N draw.
        let impostor = validator(other.address(), other.public_key(), 0);
        let ctx = ProposeContext {
            shard_id: 0,
            round: 1,
            batch: vec![],
            chain_tip: tip.clone(),
            validators: vec![leader.clone(), impostor.clone()],
        };

        let mut candidate = engine.propose(ctx).await.unwrap();
        // Re-sign as the impostor, who has negligible stake and should
        // never be the selected leader.
        let preimage = block_header_preimage(
            candidate.block.index,
            &candidate.block.prev_hash,
            candidate.block.timestamp,
            &impostor.address,
            &candidate.block.merkle_root,
            candidate.block.shard_id,
        );
        candidate.block.validator = impostor.address;
        candidate.block.signature = other.sign(&preimage);
        candidate.block.hash = candidate.block.recompute_hash();

        let result = engine.validate(&candidate.block, &tip, &[leader, impostor]);
        assert!(result.is_err());
    }

    #[test]
    fn slashed_validator_is_rejected() {
        let keypair = Arc::new(Keypair::from_seed([1u8; 32]));
        let clock = Arc::new(FixedClock::new(0));
        let engine = PosEngine::with_clock(keypair.clone(), 0, 3600, 32, clock);
        let mut v = validator(keypair.address(), keypair.public_key(), 100);
        v.status = ValidatorStatus::Slashed;

        let tip = Block::genesis(0, 0, Address::ZERO);
        let mut block = tip.clone();
        block.index = 1;
        block.prev_hash = tip.hash;
        block.validator = keypair.address();
        block.hash = block.recompute_hash();

        let result = engine.validate(&block, &tip, &[v]);
        assert!(matches!(result, Err(EngineError::SlashedValidator(_))));
    }
}
