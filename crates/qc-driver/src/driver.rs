//! The per-shard round loop: the sole writer to chain state for its shard.
//!
//! Each call to [`ShardDriver::run_round`] drains the pool, asks the
//! engine to propose, resolves a race against a competing block a peer
//! delivered first, and appends atomically. The loop never retries an
//! operation forever — `MAX_CONSECUTIVE_FAILURES` caps the back-off before
//! a shard gives up and halts.

use crate::engine_set::EngineSet;
use qc_chain::store::Store;
use qc_consensus_core::{ConsensusEngine, ForkChoice, ProposeContext};
use qc_gossip::GossipAdapter;
use qc_pool::TransactionPool;
use qc_sharding::{CrossShardRouter, ShardManager};
use shared_observer::{Observer, ObserverEvent};
use shared_types::config::DriverConfig;
use shared_types::{Block, Clock, StoreError, TransactionKind, Validator};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Consecutive failed rounds (engine error or store error) before a
/// shard's driver stops attempting new rounds.
const MAX_CONSECUTIVE_FAILURES: u32 = 8;

/// Runs one shard's round loop against a fixed set of collaborators.
pub struct ShardDriver {
    shard_id: u32,
    pool: Arc<TransactionPool>,
    store: Arc<dyn Store>,
    engine: Arc<EngineSet>,
    gossip: Arc<GossipAdapter>,
    observer: Arc<dyn Observer>,
    clock: Arc<dyn Clock>,
    config: DriverConfig,
    block_interval: Duration,
    round: AtomicU64,
    last_attempt: AtomicU64,
    router: Arc<CrossShardRouter>,
    shard_manager: Arc<ShardManager>,
    cross_shard_deadline_secs: i64,
}

/// Why [`ShardDriver::run_round`] did not commit a block.
#[derive(Debug)]
pub enum RoundOutcome {
    /// No block committed this call: either the pool had too little
    /// depth and the interval hadn't elapsed, or the round was lost to a
    /// competing block, or the engine declined to propose.
    Skipped,
    /// A block was appended and broadcast.
    Committed(Block),
    /// A store error occurred; the shard must stop being driven.
    Halted(StoreError),
}

impl ShardDriver {
    /// Build a driver for `shard_id` over the given collaborators.
    /// `router` and `shard_manager` are shared with every other shard's
    /// driver in the node so cross-shard envelopes committed on one shard
    /// are visible for draining on another.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        shard_id: u32,
        pool: Arc<TransactionPool>,
        store: Arc<dyn Store>,
        engine: Arc<EngineSet>,
        gossip: Arc<GossipAdapter>,
        observer: Arc<dyn Observer>,
        clock: Arc<dyn Clock>,
        config: DriverConfig,
        block_interval: Duration,
        router: Arc<CrossShardRouter>,
        shard_manager: Arc<ShardManager>,
        cross_shard_deadline_secs: i64,
    ) -> Self {
        let last_attempt = clock.now_wall();
        Self {
            shard_id,
            pool,
            store,
            engine,
            gossip,
            observer,
            clock,
            config,
            block_interval,
            round: AtomicU64::new(0),
            last_attempt: AtomicU64::new(last_attempt as u64),
            router,
            shard_manager,
            cross_shard_deadline_secs,
        }
    }

    /// The shard this driver runs rounds for.
    pub fn shard_id(&self) -> u32 {
        self.shard_id
    }

    /// Whether the pool has enough depth, or enough time has elapsed since
    /// the last attempt, to justify attempting a round now.
    pub fn should_attempt(&self) -> bool {
        if self.pool.pending_len() >= self.config.min_batch {
            return true;
        }
        let elapsed = self.clock.now_wall() - self.last_attempt.load(Ordering::Relaxed) as i64;
        elapsed >= self.block_interval.as_secs() as i64
    }

    /// Run up to one round for this shard against `validators`, competing
    /// against `incoming` (a block a peer already delivered for this
    /// height, if any). Returns without committing if the pool is empty,
    /// the engine declines, or a competing block wins fork choice.
    ///
    /// Besides its own pool, a round also drains `cross_shard` envelopes
    /// the router has queued for this shard (transactions other shards
    /// already committed and routed here) and folds their payloads into
    /// the same batch. A round that abandons before committing requeues
    /// them rather than losing them; a round that commits applies them at
    /// the router and, for any `cross_shard` transaction of its own, hands
    /// it to the router as a new outbound envelope.
    pub async fn run_round(&self, validators: Vec<Validator>, incoming: Option<Block>) -> RoundOutcome {
        let now = self.clock.now_wall();
        self.last_attempt.store(now as u64, Ordering::Relaxed);
        self.router.sweep_expired(now);

        let tip = match self.store.get_tip(self.shard_id) {
            Ok(Some(tip)) => tip,
            Ok(None) => {
                error!(shard_id = self.shard_id, "no genesis block for shard, cannot run rounds");
                return RoundOutcome::Skipped;
            }
            Err(e) => return self.halt(e),
        };

        let round = self.round.fetch_add(1, Ordering::Relaxed);
        self.observer.record(ObserverEvent::RoundStarted { shard_id: self.shard_id, round, algorithm: self.engine.name() });

        let own_batch = self.pool.take_for_shard(self.shard_id, self.config.max_batch);
        let drained = self.router.drain(self.shard_id, self.config.max_batch.saturating_sub(own_batch.len()));
        let (inbound, expired): (Vec<_>, Vec<_>) = drained.into_iter().partition(|envelope| !envelope.is_expired(now));
        for envelope in &expired {
            let outcome = self.router.apply_at_destination(envelope, now);
            self.router.resolve_source(&envelope.message_id, outcome);
        }

        if own_batch.is_empty() && inbound.is_empty() && incoming.is_none() {
            return RoundOutcome::Skipped;
        }

        let mut batch = own_batch.clone();
        batch.extend(inbound.iter().map(|envelope| envelope.payload.clone()));

        let ctx = ProposeContext { shard_id: self.shard_id, round, batch: batch.clone(), chain_tip: tip.clone(), validators };
        let candidate = match self.engine.propose(ctx).await {
            Ok(candidate) => candidate,
            Err(e) => {
                self.pool.return_batch(own_batch);
                self.router.requeue(self.shard_id, inbound);
                self.observer.record(ObserverEvent::RoundAborted { shard_id: self.shard_id, round, reason: e.to_string() });
                return RoundOutcome::Skipped;
            }
        };

        let block = match incoming {
            Some(remote) => match self.engine.fork_choice(&candidate.block, &remote) {
                ForkChoice::KeepLocal => candidate.block,
                ForkChoice::PreferRemote => {
                    self.pool.return_batch(own_batch);
                    self.router.requeue(self.shard_id, inbound);
                    self.observer.record(ObserverEvent::ForkDetected { shard_id: self.shard_id, index: remote.index, chosen_hash: remote.hash });
                    return RoundOutcome::Skipped;
                }
            },
            None => candidate.block,
        };

        let tx_count = block.transactions.len();
        let block_hash = block.hash;
        match self.store.append_block(block.clone(), &batch) {
            Ok(()) => {
                for tx in batch {
                    self.pool.confirm(tx);
                }
                for envelope in &inbound {
                    let outcome = self.router.apply_at_destination(envelope, now);
                    self.router.resolve_source(&envelope.message_id, outcome);
                }
                for tx in &own_batch {
                    if tx.kind == TransactionKind::CrossShard {
                        let to_shard = self.shard_manager.shard_of(&tx.to);
                        self.router.commit_source(tx.clone(), self.shard_id, to_shard, now + self.cross_shard_deadline_secs);
                    }
                }
                if let Err(e) = self.gossip.broadcast_block(&block).await {
                    self.observer.record(ObserverEvent::TransportError { peer: "broadcast".to_string(), error: e.to_string() });
                }
                self.observer.record(ObserverEvent::RoundCommitted {
                    shard_id: self.shard_id,
                    round,
                    algorithm: candidate.algorithm,
                    block_hash,
                    tx_count,
                });
                RoundOutcome::Committed(block)
            }
            Err(e) => {
                self.pool.return_batch(own_batch);
                self.router.requeue(self.shard_id, inbound);
                self.halt(e)
            }
        }
    }

    fn halt(&self, error: StoreError) -> RoundOutcome {
        self.observer.record(ObserverEvent::StoreFatal { shard_id: self.shard_id, error: error.to_string() });
        RoundOutcome::Halted(error)
    }
}

/// Drive `shard` forever with capped back-off, stopping only on a fatal
/// store error. `attempt` is called once per loop iteration to gather the
/// current validator set and any competing block a peer delivered first.
pub async fn drive_shard<F, Fut>(driver: Arc<ShardDriver>, poll_interval: Duration, mut attempt: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = (Vec<Validator>, Option<Block>)>,
{
    let mut consecutive_failures = 0u32;
    loop {
        if !driver.should_attempt() {
            tokio::time::sleep(poll_interval).await;
            continue;
        }
        let (validators, incoming) = attempt().await;
        match driver.run_round(validators, incoming).await {
            RoundOutcome::Committed(_) => consecutive_failures = 0,
            RoundOutcome::Skipped => {}
            RoundOutcome::Halted(e) => {
                error!(shard_id = driver.shard_id, error = %e, "shard halted on fatal store error");
                return;
            }
        }
        if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
            error!(shard_id = driver.shard_id, "too many consecutive failed rounds, backing off");
            tokio::time::sleep(poll_interval * MAX_CONSECUTIVE_FAILURES).await;
            consecutive_failures = 0;
        }
        tokio::time::sleep(poll_interval).await;
    }
}
