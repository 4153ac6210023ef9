//! The PBFT [`ConsensusEngine`] implementation.
//!
//! `propose`/`validate`/`select_leader` satisfy the common contract; the
//! inherent methods ([`PbftEngine::record_prepare`],
//! [`PbftEngine::record_commit`], [`PbftEngine::force_view_change`]) are the
//! extra surface the driver's gossip-message handling calls as prepare/
//! commit votes arrive from peers — `qc-driver` holds a concrete
//! `PbftEngine`, not a `dyn ConsensusEngine`, precisely so it can reach
//! these.

use crate::phase::{min_validators, quorum_size, PbftPhase};
use async_trait::async_trait;
use qc_consensus_core::{BlockCandidate, ConsensusEngine, ConsensusState, EngineError, ProposeContext};
use shared_crypto::signing::{self, Keypair};
use shared_types::codec::block_header_preimage;
use shared_types::{Address, Block, Clock, Signature, SystemClock, Validator};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::timeout;

struct RoundState {
    shard_id: u32,
    round: u64,
    phase: PbftPhase,
    candidate: Option<Block>,
    prepare_votes: HashSet<Address>,
    /// Commit votes keyed by voter, each carrying the voter's signature
    /// over the candidate's hash. Becomes the block's `commit_certificate`
    /// once quorum is reached.
    commit_votes: HashMap<Address, Signature>,
}

impl Default for RoundState {
    fn default() -> Self {
        Self {
            shard_id: 0,
            round: 0,
            phase: PbftPhase::Idle,
            candidate: None,
            prepare_votes: HashSet::new(),
            commit_votes: HashMap::new(),
        }
    }
}

/// Rotating-primary PBFT engine. One instance per shard.
pub struct PbftEngine {
    keypair: Arc<Keypair>,
    byzantine_f: u32,
    phase_timeout: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<RoundState>,
    view: AtomicU64,
    notify: Notify,
}

impl PbftEngine {
    /// Build an engine tolerating `byzantine_f` Byzantine replicas, with
    /// `phase_timeout` allotted to reach each of the prepare/commit
    /// quorums before a view-change is triggered.
    pub fn new(keypair: Arc<Keypair>, byzantine_f: u32, phase_timeout: Duration) -> Self {
        Self::with_clock(keypair, byzantine_f, phase_timeout, Arc::new(SystemClock))
    }

    /// Build an engine with an injected clock, for deterministic tests.
    pub fn with_clock(keypair: Arc<Keypair>, byzantine_f: u32, phase_timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            keypair,
            byzantine_f,
            phase_timeout,
            clock,
            state: Mutex::new(RoundState::default()),
            view: AtomicU64::new(0),
            notify: Notify::new(),
        }
    }

    /// The rotating primary for `round`: validators sorted ascending by
    /// address, indexed by `round % len`. Keyed off the round number, not
    /// the block index — the two coincide only when every round commits
    /// without a view-change; after any abort, indices lag rounds, so
    /// indexing by index would desynchronize primary rotation across
    /// replicas that saw different numbers of aborted rounds.
    fn primary_for<'a>(validators: &'a [Validator], round: u64) -> Option<&'a Validator> {
        if validators.is_empty() {
            return None;
        }
        let mut sorted: Vec<&Validator> = validators.iter().collect();
        sorted.sort_by_key(|v| v.address.as_bytes().to_vec());
        let idx = (round as usize) % sorted.len();
        Some(sorted[idx])
    }

    /// Current view number.
    pub fn view(&self) -> u64 {
        self.view.load(Ordering::SeqCst)
    }

    /// Current phase.
    pub fn phase(&self) -> PbftPhase {
        self.state.lock().unwrap().phase
    }

    /// Record a prepare vote from `voter` for the round currently in
    /// `Prepare` phase. Transitions to `Commit` once quorum is reached.
    /// Returns the new phase, or `None` if there is no matching round in
    /// `Prepare` phase to vote on.
    pub fn record_prepare(&self, voter: Address) -> Option<PbftPhase> {
        let mut state = self.state.lock().unwrap();
        if state.phase != PbftPhase::Prepare {
            return None;
        }
        state.prepare_votes.insert(voter);
        if state.prepare_votes.len() >= quorum_size(self.byzantine_f) {
            state.phase = PbftPhase::Commit;
        }
        let phase = state.phase;
        drop(state);
        self.notify.notify_waiters();
        Some(phase)
    }

    /// Record a commit vote from `voter` for the round currently in
    /// `Commit` phase, carrying `signature` over the candidate block's
    /// hash. The caller (the driver, relaying a gossiped vote) is trusted
    /// to have already checked `signature` against `voter`'s public key —
    /// this engine has no validator registry of its own to check against.
    /// Transitions to `Committed` once quorum is reached, at which point
    /// the accumulated votes become the block's commit certificate.
    pub fn record_commit(&self, voter: Address, signature: Signature) -> Option<PbftPhase> {
        let mut state = self.state.lock().unwrap();
        if state.phase != PbftPhase::Commit {
            return None;
        }
        state.commit_votes.insert(voter, signature);
        if state.commit_votes.len() >= quorum_size(self.byzantine_f) {
            state.phase = PbftPhase::Committed;
        }
        let phase = state.phase;
        drop(state);
        self.notify.notify_waiters();
        Some(phase)
    }

    /// The in-flight round's candidate hash, for a caller (driver or test)
    /// that needs to sign a commit vote over it. `None` before `propose`
    /// has seeded `Prepare` phase.
    pub fn candidate_hash(&self) -> Option<shared_types::Hash> {
        self.state.lock().unwrap().candidate.as_ref().map(|b| b.hash)
    }

    /// Force a view-change: bump the view, abandon the in-flight round.
    /// Called by the driver when a phase deadline expires locally, or a
    /// peer's view-change message reaches quorum.
    pub fn force_view_change(&self) -> u64 {
        let mut state = self.state.lock().unwrap();
        *state = RoundState::default();
        drop(state);
        self.notify.notify_waiters();
        self.view.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn check_byzantine_floor(&self, validators: &[Validator]) -> Result<(), EngineError> {
        let need = min_validators(self.byzantine_f);
        if validators.len() < need {
            return Err(EngineError::InsufficientValidatorsForByzantineTolerance {
                f: self.byzantine_f,
                have: validators.len(),
                need,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ConsensusEngine for PbftEngine {
    fn name(&self) -> &'static str {
        "pbft"
    }

    async fn propose(&self, ctx: ProposeContext) -> Result<BlockCandidate, EngineError> {
        self.check_byzantine_floor(&ctx.validators)?;

        let index = ctx.chain_tip.index + 1;
        let prev_hash = ctx.chain_tip.hash;
        let merkle_root = Block::compute_merkle_root(&ctx.batch);
        let validator = self.keypair.address();
        let now = self.clock.now_wall();

        let preimage = block_header_preimage(index, &prev_hash, now, &validator, &merkle_root, ctx.shard_id);
        let signature = self.keypair.sign(&preimage);
        let hash = Block::compute_hash(index, &prev_hash, now, &validator, &merkle_root, ctx.shard_id);

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

        {
            let mut state = self.state.lock().unwrap();
            *state = RoundState {
                shard_id: ctx.shard_id,
                round: ctx.round,
                phase: PbftPhase::Prepare,
                candidate: Some(block.clone()),
                prepare_votes: HashSet::from([validator]),
                commit_votes: HashMap::new(),
            };
        }

        loop {
            {
                let state = self.state.lock().unwrap();
                if state.phase == PbftPhase::Committed {
                    let mut block = state.candidate.clone().unwrap();
                    block.commit_certificate = state.commit_votes.iter().map(|(addr, sig)| (*addr, *sig)).collect();
                    return Ok(BlockCandidate { block, algorithm: self.name() });
                }
            }
            if timeout(self.phase_timeout, self.notify.notified()).await.is_err() {
                let new_view = self.force_view_change();
                return Err(EngineError::ViewChange { new_view });
            }
        }
    }

    fn validate(&self, block: &Block, tip: &Block, validators: &[Validator]) -> Result<(), EngineError> {
        self.check_byzantine_floor(validators)?;

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

        let primary = Self::primary_for(validators, block.round).ok_or(EngineError::InsufficientStake)?;
        if primary.address != block.validator {
            return Err(EngineError::InvalidBlock(format!(
                "block proposer {} is not round {}'s primary {}",
                block.validator, block.round, primary.address
            )));
        }

        let preimage = block_header_preimage(block.index, &block.prev_hash, block.timestamp, &block.validator, &block.merkle_root, block.shard_id);
        signing::verify(&proposer.public_key, &preimage, &block.signature)
            .map_err(|e| EngineError::InvalidBlock(format!("signature verification failed: {e}")))?;

        let required = quorum_size(self.byzantine_f);
        if block.commit_certificate.len() < required {
            return Err(EngineError::QuorumNotReached { phase: "commit_certificate" });
        }
        let mut signers = HashSet::new();
        for (addr, sig) in &block.commit_certificate {
            let voter = validators.iter().find(|v| v.address == *addr).ok_or_else(|| EngineError::UnknownValidator(addr.to_hex()))?;
            if !voter.is_eligible() {
                return Err(EngineError::SlashedValidator(addr.to_hex()));
            }
            signing::verify(&voter.public_key, block.hash.as_bytes(), sig)
                .map_err(|e| EngineError::InvalidBlock(format!("commit signature verification failed for {addr}: {e}")))?;
            signers.insert(*addr);
        }
        if signers.len() < required {
            return Err(EngineError::InvalidBlock(format!("commit certificate has only {} distinct signers, need {required}", signers.len())));
        }

        Ok(())
    }

    fn select_leader(&self, validators: &[Validator], round: u64) -> Result<Validator, EngineError> {
        Self::primary_for(validators, round).cloned().ok_or(EngineError::InsufficientStake)
    }

    fn reset(&self) {
        *self.state.lock().unwrap() = RoundState::default();
        self.notify.notify_waiters();
    }

    fn snapshot_state(&self) -> ConsensusState {
        let state = self.state.lock().unwrap();
        let mut details = BTreeMap::new();
        details.insert("view".to_string(), self.view().to_string());
        details.insert("prepare_votes".to_string(), state.prepare_votes.len().to_string());
        details.insert("commit_votes".to_string(), state.commit_votes.len().to_string());
        details.insert("byzantine_f".to_string(), self.byzantine_f.to_string());
        ConsensusState {
            shard_id: state.shard_id,
            round: state.round,
            phase: state.phase.as_str().to_string(),
            details,
        }
    }

    fn metrics(&self) -> BTreeMap<String, f64> {
        let state = self.state.lock().unwrap();
        let mut m = BTreeMap::new();
        m.insert("pbft_view".to_string(), self.view() as f64);
        m.insert("pbft_prepare_votes".to_string(), state.prepare_votes.len() as f64);
        m.insert("pbft_commit_votes".to_string(), state.commit_votes.len() as f64);
        m
    }
}
