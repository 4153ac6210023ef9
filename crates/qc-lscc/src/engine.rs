//! The LSCC [`ConsensusEngine`] implementation.
//!
//! `propose`/`validate`/`select_leader` satisfy the common contract; the
//! inherent [`LsccEngine::record_channel_signature`],
//! [`LsccEngine::force_abort`], [`LsccEngine::report_network_health`] and
//! [`LsccEngine::report_shard_sync`] methods are the extra surface the
//! driver's gossip-message handling and periodic health probes call into —
//! `qc-driver` holds a concrete `LsccEngine`, not a `dyn ConsensusEngine`,
//! precisely so it can reach these.
//!
//! A round fans out over `layer_depth * channel_count` channels in Phase B
//! (each needs its own strict-majority signature quorum over the batch's
//! Merkle root), cross-syncs them over a bipartite layer chain in Phase C,
//! then scores the round in Phase D. The reporter that signs the final
//! block is, by convention, the member of channel `(layer=0, shard=0)`
//! with the lowest address — a fixed, attributable block signer rather
//! than an arbitrary member of an approved channel.

use crate::channel::{form_channels, is_strict_majority, ChannelKey};
use crate::phase::{ChannelVerdict, LsccPhase};
use async_trait::async_trait;
use qc_consensus_core::{BlockCandidate, ConsensusEngine, ConsensusState, EngineError, ProposeContext};
use shared_crypto::signing::{self, Keypair};
use shared_types::codec::block_header_preimage;
use shared_types::config::LsccWeights;
use shared_types::{Address, Block, Clock, SystemClock, Validator};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::timeout;

/// Validators flagged as inconsistent by at least this many distinct
/// channels are slashed. LSCC has no natively configured Byzantine
/// tolerance `f`, unlike PBFT; this is a fixed, conservative stand-in for
/// the "f+1 channels" rule.
pub const INCONSISTENCY_SLASH_THRESHOLD: usize = 2;

struct RoundState {
    shard_id: u32,
    round: u64,
    phase: LsccPhase,
    candidate: Option<Block>,
    channels: HashMap<ChannelKey, Vec<Address>>,
    signatures: HashMap<ChannelKey, HashSet<Address>>,
    verdicts: HashMap<ChannelKey, ChannelVerdict>,
    inconsistent_reports: HashMap<Address, HashSet<ChannelKey>>,
}

impl Default for RoundState {
    fn default() -> Self {
        Self {
            shard_id: 0,
            round: 0,
            phase: LsccPhase::Idle,
            candidate: None,
            channels: HashMap::new(),
            signatures: HashMap::new(),
            verdicts: HashMap::new(),
            inconsistent_reports: HashMap::new(),
        }
    }
}

/// Layered, cross-channel consensus engine. One instance per shard.
pub struct LsccEngine {
    keypair: Arc<Keypair>,
    layer_depth: u32,
    channel_count: u32,
    commit_threshold: f64,
    weights: LsccWeights,
    phase_timeout: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<RoundState>,
    notify: Notify,
    network_health: Mutex<(u64, u64)>,
    shard_sync: Mutex<(u64, u64)>,
    slashed: Mutex<HashSet<Address>>,
}

impl LsccEngine {
    /// Build an engine with `layer_depth` layers of `channel_count`
    /// channels each, committing when the Phase D weighted score clears
    /// `commit_threshold`.
    pub fn new(keypair: Arc<Keypair>, layer_depth: u32, channel_count: u32, commit_threshold: f64, weights: LsccWeights, phase_timeout: Duration) -> Self {
        Self::with_clock(keypair, layer_depth, channel_count, commit_threshold, weights, phase_timeout, Arc::new(SystemClock))
    }

    /// Build an engine with an injected clock, for deterministic tests.
    #[allow(clippy::too_many_arguments)]
    pub fn with_clock(
        keypair: Arc<Keypair>,
        layer_depth: u32,
        channel_count: u32,
        commit_threshold: f64,
        weights: LsccWeights,
        phase_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            keypair,
            layer_depth,
            channel_count,
            commit_threshold,
            weights,
            phase_timeout,
            clock,
            state: Mutex::new(RoundState::default()),
            notify: Notify::new(),
            network_health: Mutex::new((1, 1)),
            shard_sync: Mutex::new((1, 1)),
            slashed: Mutex::new(HashSet::new()),
        }
    }

    /// The reporting channel: `(layer=0, shard=0)`. Its lowest-address
    /// member signs and broadcasts the committed block.
    fn reporter_channel(channels: &HashMap<ChannelKey, Vec<Address>>) -> Option<&Vec<Address>> {
        channels.get(&(0, 0))
    }

    fn reporter_address(channels: &HashMap<ChannelKey, Vec<Address>>) -> Option<Address> {
        Self::reporter_channel(channels)?.iter().min_by_key(|a| a.as_bytes().to_vec()).copied()
    }

    /// Record a member's signature over the current round's batch root for
    /// `channel`. Returns the channel's verdict once a strict majority of
    /// its members have signed, or `None` if there is no such channel in
    /// the in-flight round.
    pub fn record_channel_signature(&self, channel: ChannelKey, signer: Address) -> Option<ChannelVerdict> {
        let mut state = self.state.lock().unwrap();
        if state.phase != LsccPhase::Validating {
            return None;
        }
        let members = state.channels.get(&channel)?.clone();
        if !members.contains(&signer) {
            return None;
        }
        let signers = state.signatures.entry(channel).or_default();
        signers.insert(signer);
        let verdict = if is_strict_majority(signers.len(), members.len()) {
            let v = ChannelVerdict::Approved;
            state.verdicts.insert(channel, v);
            Some(v)
        } else {
            None
        };
        let all_decided = state.channels.keys().all(|k| state.verdicts.contains_key(k));
        if all_decided {
            state.phase = LsccPhase::Syncing;
        }
        drop(state);
        self.notify.notify_waiters();
        verdict
    }

    /// Report `signer` as having produced an inconsistent signature for
    /// `channel` (e.g. a signature that fails verification against the
    /// batch root a majority of the channel agreed on). Once reported by
    /// [`INCONSISTENCY_SLASH_THRESHOLD`] distinct channels, the validator
    /// is slashed.
    pub fn report_inconsistent_signer(&self, channel: ChannelKey, signer: Address) -> bool {
        let mut state = self.state.lock().unwrap();
        let reports = state.inconsistent_reports.entry(signer).or_default();
        reports.insert(channel);
        if reports.len() >= INCONSISTENCY_SLASH_THRESHOLD {
            drop(state);
            self.slashed.lock().unwrap().insert(signer);
            return true;
        }
        false
    }

    /// Whether `address` has been slashed for inconsistent signing.
    pub fn is_slashed(&self, address: &Address) -> bool {
        self.slashed.lock().unwrap().contains(address)
    }

    /// Abandon the in-flight round, leaving it `Aborted`. Called by the
    /// driver on a local phase deadline; channels with no verdict yet
    /// default to `Rejected`.
    pub fn force_abort(&self) {
        let mut state = self.state.lock().unwrap();
        for key in state.channels.keys().copied().collect::<Vec<_>>() {
            state.verdicts.entry(key).or_insert(ChannelVerdict::Rejected);
        }
        state.phase = LsccPhase::Aborted;
        drop(state);
        self.notify.notify_waiters();
    }

    /// Feed in an observed `(live_peers, expected_peers)` ratio for Phase
    /// D's `network_health` term. Defaults to `1/1` absent any report.
    pub fn report_network_health(&self, live_peers: u64, expected_peers: u64) {
        *self.network_health.lock().unwrap() = (live_peers, expected_peers.max(1));
    }

    /// Feed in an observed `(synced_shards, total_shards)` ratio for Phase
    /// D's `shard_sync` term. Defaults to `1/1` absent any report.
    pub fn report_shard_sync(&self, synced: u64, total: u64) {
        *self.shard_sync.lock().unwrap() = (synced, total.max(1));
    }

    fn network_health_ratio(&self) -> f64 {
        let (live, expected) = *self.network_health.lock().unwrap();
        live as f64 / expected as f64
    }

    fn shard_sync_ratio(&self) -> f64 {
        let (synced, total) = *self.shard_sync.lock().unwrap();
        synced as f64 / total as f64
    }

    /// Per-layer result: the strict AND of every channel in that layer.
    fn layer_approved(layer: u32, channel_count: u32, verdicts: &HashMap<ChannelKey, ChannelVerdict>) -> bool {
        (0..channel_count).all(|shard| matches!(verdicts.get(&(layer, shard)), Some(ChannelVerdict::Approved)))
    }

    /// Phase C: a bipartite chain `L0 - L1 - ... - L(n-1)`; an edge is
    /// approved iff both endpoint layers are approved.
    fn cross_layer_edges(layer_depth: u32, channel_count: u32, verdicts: &HashMap<ChannelKey, ChannelVerdict>) -> (usize, usize) {
        if layer_depth < 2 {
            return (1, 1);
        }
        let mut approved = 0usize;
        let mut total = 0usize;
        for layer in 0..(layer_depth - 1) {
            total += 1;
            if Self::layer_approved(layer, channel_count, verdicts) && Self::layer_approved(layer + 1, channel_count, verdicts) {
                approved += 1;
            }
        }
        (approved, total)
    }

    fn layer_consensus_ratio(layer_depth: u32, channel_count: u32, verdicts: &HashMap<ChannelKey, ChannelVerdict>) -> f64 {
        let approved = (0..layer_depth).filter(|&l| Self::layer_approved(l, channel_count, verdicts)).count();
        approved as f64 / layer_depth.max(1) as f64
    }

    fn check_floor(&self, validators: &[Validator]) -> Result<(), EngineError> {
        let eligible = validators.iter().filter(|v| v.is_eligible()).count();
        if eligible < 3 {
            return Err(EngineError::InsufficientValidatorsForChannels { have: eligible, need: 3 });
        }
        Ok(())
    }
}

#[async_trait]
impl ConsensusEngine for LsccEngine {
    fn name(&self) -> &'static str {
        "lscc"
    }

    async fn propose(&self, ctx: ProposeContext) -> Result<BlockCandidate, EngineError> {
        self.check_floor(&ctx.validators)?;
        let channels = form_channels(ctx.round, self.layer_depth, self.channel_count, &ctx.validators)?;

        let reporter = Self::reporter_address(&channels).ok_or(EngineError::QuorumNotReached { phase: "forming" })?;
        if reporter != self.keypair.address() {
            return Err(EngineError::InvalidBlock(format!(
                "local validator {} is not the round's reporter {}",
                self.keypair.address(),
                reporter
            )));
        }

        {
            let mut state = self.state.lock().unwrap();
            *state = RoundState {
                shard_id: ctx.shard_id,
                round: ctx.round,
                phase: LsccPhase::Validating,
                candidate: None,
                channels: channels.clone(),
                signatures: HashMap::new(),
                verdicts: HashMap::new(),
                inconsistent_reports: HashMap::new(),
            };
        }
        self.notify.notify_waiters();

        loop {
            {
                let state = self.state.lock().unwrap();
                if state.phase != LsccPhase::Validating {
                    break;
                }
            }
            if timeout(self.phase_timeout, self.notify.notified()).await.is_err() {
                self.force_abort();
                break;
            }
        }

        let verdicts = {
            let mut state = self.state.lock().unwrap();
            state.phase = LsccPhase::Scoring;
            state.verdicts.clone()
        };

        let layer_consensus = Self::layer_consensus_ratio(self.layer_depth, self.channel_count, &verdicts);
        let (edges_approved, edges_total) = Self::cross_layer_edges(self.layer_depth, self.channel_count, &verdicts);
        let channel_approval = edges_approved as f64 / edges_total.max(1) as f64;
        let shard_sync = self.shard_sync_ratio();
        let network_health = self.network_health_ratio();
        let score = self.weights.score(layer_consensus, channel_approval, shard_sync, network_health);

        if score < self.commit_threshold {
            let mut state = self.state.lock().unwrap();
            state.phase = LsccPhase::Aborted;
            return Err(EngineError::QuorumNotReached { phase: "scoring" });
        }

        let index = ctx.chain_tip.index + 1;
        let prev_hash = ctx.chain_tip.hash;
        let merkle_root = Block::compute_merkle_root(&ctx.batch);
        let now = self.clock.now_wall();
        let preimage = block_header_preimage(index, &prev_hash, now, &reporter, &merkle_root, ctx.shard_id);
        let signature = self.keypair.sign(&preimage);
        let hash = Block::compute_hash(index, &prev_hash, now, &reporter, &merkle_root, ctx.shard_id);

        let block = Block {
            index,
            prev_hash,
            timestamp: now,
            transactions: ctx.batch,
            validator: reporter,
            signature,
            shard_id: ctx.shard_id,
            merkle_root,
            hash,
            commit_certificate: Vec::new(),
            round: ctx.round,
        };

        {
            let mut state = self.state.lock().unwrap();
            state.candidate = Some(block.clone());
            state.phase = LsccPhase::Committed;
        }

        Ok(BlockCandidate { block, algorithm: self.name() })
    }

    fn validate(&self, block: &Block, tip: &Block, validators: &[Validator]) -> Result<(), EngineError> {
        self.check_floor(validators)?;

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

        let channels = form_channels(block.index, self.layer_depth, self.channel_count, validators)?;
        let reporter = Self::reporter_address(&channels).ok_or(EngineError::QuorumNotReached { phase: "forming" })?;
        if reporter != block.validator {
            return Err(EngineError::InvalidBlock(format!("block signer {} is not round {}'s reporter {}", block.validator, block.index, reporter)));
        }

        let preimage = block_header_preimage(block.index, &block.prev_hash, block.timestamp, &block.validator, &block.merkle_root, block.shard_id);
        signing::verify(&proposer.public_key, &preimage, &block.signature)
            .map_err(|e| EngineError::InvalidBlock(format!("signature verification failed: {e}")))?;

        Ok(())
    }

    fn select_leader(&self, validators: &[Validator], round: u64) -> Result<Validator, EngineError> {
        self.check_floor(validators)?;
        let channels = form_channels(round, self.layer_depth, self.channel_count, validators)?;
        let reporter = Self::reporter_address(&channels).ok_or(EngineError::QuorumNotReached { phase: "forming" })?;
        validators.iter().find(|v| v.address == reporter).cloned().ok_or_else(|| EngineError::UnknownValidator(reporter.to_hex()))
    }

    fn reset(&self) {
        *self.state.lock().unwrap() = RoundState::default();
        self.notify.notify_waiters();
    }

    fn snapshot_state(&self) -> ConsensusState {
        let state = self.state.lock().unwrap();
        let mut details = BTreeMap::new();
        details.insert("channels".to_string(), state.channels.len().to_string());
        details.insert("verdicts".to_string(), state.verdicts.len().to_string());
        let approved = state.verdicts.values().filter(|v| matches!(v, ChannelVerdict::Approved)).count();
        details.insert("approved_channels".to_string(), approved.to_string());
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
        m.insert("lscc_channels".to_string(), state.channels.len() as f64);
        let approved = state.verdicts.values().filter(|v| matches!(v, ChannelVerdict::Approved)).count();
        m.insert("lscc_approved_channels".to_string(), approved as f64);
        m.insert("lscc_network_health".to_string(), self.network_health_ratio());
        m.insert("lscc_shard_sync".to_string(), self.shard_sync_ratio());
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{FixedClock, ValidatorStatus};

    fn validator_from(keypair: &Keypair, stake: u64) -> Validator {
        Validator {
            address: keypair.address(),
            public_key: keypair.public_key(),
            stake,
            power: stake,
            status: ValidatorStatus::Active,
            last_active: 0,
            shard_id: 0,
            reputation: 1.0,
        }
    }

    fn nine_validators() -> (Vec<Arc<Keypair>>, Vec<Validator>) {
        let keys: Vec<Arc<Keypair>> = (0..9u8).map(|b| Arc::new(Keypair::from_seed([b + 1; 32]))).collect();
        let validators = keys.iter().map(|k| validator_from(k, 10)).collect();
        (keys, validators)
    }

    fn engine_for(keypair: Arc<Keypair>, phase_timeout: Duration) -> LsccEngine {
        LsccEngine::with_clock(keypair, 3, 2, 0.70, LsccWeights::default(), phase_timeout, Arc::new(FixedClock::new(0)))
    }

    #[tokio::test]
    async fn all_channels_approving_commits_with_full_score() {
        let (keys, validators) = nine_validators();
        let round = 0u64;
        let channels = form_channels(round, 3, 2, &validators).unwrap();
        let reporter = LsccEngine::reporter_address(&channels).unwrap();
        let reporter_key = keys.iter().find(|k| k.address() == reporter).unwrap().clone();

        let engine = Arc::new(engine_for(reporter_key, Duration::from_secs(2)));
        let tip = Block::genesis(0, 0, Address::ZERO);
        let ctx = ProposeContext { shard_id: 0, round, batch: vec![], chain_tip: tip.clone(), validators: validators.clone() };

        let driver_engine = engine.clone();
        let channels_clone = channels.clone();
        let signer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            for (key, members) in channels_clone.iter() {
                let need = members.len() / 2 + 1;
                for addr in members.iter().take(need) {
                    driver_engine.record_channel_signature(*key, *addr);
                }
            }
        });

        let candidate = engine.propose(ctx).await.unwrap();
        signer.await.unwrap();
        assert!(engine.validate(&candidate.block, &tip, &validators).is_ok());
    }

    #[test]
    fn layer_consensus_ratio_is_two_thirds_when_one_layer_fails() {
        let mut verdicts = HashMap::new();
        for shard in 0..2 {
            verdicts.insert((0, shard), ChannelVerdict::Approved);
            verdicts.insert((1, shard), ChannelVerdict::Approved);
        }
        verdicts.insert((2, 0), ChannelVerdict::Approved);
        verdicts.insert((2, 1), ChannelVerdict::Rejected);

        let ratio = LsccEngine::layer_consensus_ratio(3, 2, &verdicts);
        assert!((ratio - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn degraded_round_falls_below_default_commit_threshold() {
        // Layer 0 fully approved; layers 1 and 2 each have one rejected
        // channel, so neither layer clears the strict-AND approval rule.
        // layer_consensus = 1/3, channel_approval = 0/2 (both cross-layer
        // edges touch an unapproved layer), giving score ≈ 0.433.
        let mut verdicts = HashMap::new();
        verdicts.insert((0, 0), ChannelVerdict::Approved);
        verdicts.insert((0, 1), ChannelVerdict::Approved);
        verdicts.insert((1, 0), ChannelVerdict::Approved);
        verdicts.insert((1, 1), ChannelVerdict::Rejected);
        verdicts.insert((2, 0), ChannelVerdict::Approved);
        verdicts.insert((2, 1), ChannelVerdict::Rejected);

        let layer_consensus = LsccEngine::layer_consensus_ratio(3, 2, &verdicts);
        let (approved_edges, total_edges) = LsccEngine::cross_layer_edges(3, 2, &verdicts);
        let channel_approval = approved_edges as f64 / total_edges as f64;
        let score = LsccWeights::default().score(layer_consensus, channel_approval, 1.0, 1.0);
        assert!(score < 0.70, "expected degraded score below default commit threshold, got {score}");
    }

    #[test]
    fn rejects_too_few_validators() {
        let key = Arc::new(Keypair::from_seed([1u8; 32]));
        let engine = engine_for(key.clone(), Duration::from_secs(1));
        let two = vec![validator_from(&key, 10), validator_from(&Keypair::from_seed([2u8; 32]), 10)];
        let tip = Block::genesis(0, 0, Address::ZERO);
        let mut block = tip.clone();
        block.index = 1;
        assert!(matches!(engine.validate(&block, &tip, &two), Err(EngineError::InsufficientValidatorsForChannels { .. })));
    }

    #[test]
    fn slashing_requires_the_configured_threshold_of_distinct_channel_reports() {
        let key = Arc::new(Keypair::from_seed([1u8; 32]));
        let engine = engine_for(key, Duration::from_secs(1));
        let bad = Address([9u8; 20]);
        assert!(!engine.report_inconsistent_signer((0, 0), bad));
        assert!(!engine.is_slashed(&bad));
        assert!(engine.report_inconsistent_signer((0, 1), bad));
        assert!(engine.is_slashed(&bad));
    }
}
