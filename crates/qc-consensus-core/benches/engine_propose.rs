//! Throughput of `propose`/`validate` across all four engines over a
//! synthetic batch. Run with `cargo bench --package qc-consensus-core`.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use qc_consensus_core::{ConsensusEngine, ProposeContext};
use qc_lscc::LsccEngine;
use qc_pbft::PbftEngine;
use qc_pos::PosEngine;
use qc_pow::PowEngine;
use shared_crypto::signing::Keypair;
use shared_types::codec::transaction_preimage;
use shared_types::config::LsccWeights;
use shared_types::{Address, Block, Transaction, TransactionKind, Validator, ValidatorStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

const BATCH_SIZE: usize = 200;

fn synthetic_batch(kp: &Keypair) -> Vec<Transaction> {
    (0..BATCH_SIZE)
        .map(|i| {
            let mut tx = Transaction::new_unsigned(kp.address(), Address([i as u8; 20]), 1, 1, vec![], 0, i as u64, 0, TransactionKind::Regular);
            tx.signature = kp.sign(&transaction_preimage(&tx));
            tx
        })
        .collect()
}

fn validator_set(kp: &Keypair, stake: u64) -> Vec<Validator> {
    vec![Validator {
        address: kp.address(),
        public_key: kp.public_key(),
        stake,
        power: stake,
        status: ValidatorStatus::Active,
        last_active: 0,
        shard_id: 0,
        reputation: 1.0,
    }]
}

fn bench_pow(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let kp = Keypair::from_seed([1u8; 32]);
    let engine = PowEngine::new(4, Duration::from_secs(30));
    let tip = Block::genesis(0, 0, Address::ZERO);
    let batch = synthetic_batch(&kp);
    c.bench_function("pow_propose_200tx", |b| {
        b.to_async(&rt).iter_batched(
            || ProposeContext { shard_id: 0, round: 1, batch: batch.clone(), chain_tip: tip.clone(), validators: vec![] },
            |ctx| async { engine.propose(ctx).await.unwrap() },
            BatchSize::SmallInput,
        )
    });
}

fn bench_pos(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let kp = Keypair::from_seed([2u8; 32]);
    let engine = PosEngine::new(Arc::new(Keypair::from_seed([2u8; 32])), 0, 3600, 32);
    let tip = Block::genesis(0, 0, Address::ZERO);
    let batch = synthetic_batch(&kp);
    let validators = validator_set(&kp, 100);
    c.bench_function("pos_propose_200tx", |b| {
        b.to_async(&rt).iter_batched(
            || ProposeContext { shard_id: 0, round: 1, batch: batch.clone(), chain_tip: tip.clone(), validators: validators.clone() },
            |ctx| async { engine.propose(ctx).await.unwrap() },
            BatchSize::SmallInput,
        )
    });
}

fn bench_pbft(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let kp = Keypair::from_seed([3u8; 32]);
    let engine = PbftEngine::new(Arc::new(Keypair::from_seed([3u8; 32])), 0, Duration::from_secs(10));
    let tip = Block::genesis(0, 0, Address::ZERO);
    let batch = synthetic_batch(&kp);
    let validators = validator_set(&kp, 100);
    c.bench_function("pbft_propose_200tx", |b| {
        b.to_async(&rt).iter_batched(
            || ProposeContext { shard_id: 0, round: 1, batch: batch.clone(), chain_tip: tip.clone(), validators: validators.clone() },
            |ctx| async { engine.propose(ctx).await.unwrap() },
            BatchSize::SmallInput,
        )
    });
}

fn bench_lscc(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let kp = Keypair::from_seed([4u8; 32]);
    let weights = LsccWeights { layer_consensus: 0.4, channel_approval: 0.3, shard_sync: 0.2, network_health: 0.1 };
    // layer_depth=1, channel_count=1 puts every eligible validator in the
    // single channel (0,0); all three entries share this engine's address
    // so it is deterministically the channel's reporter.
    let engine = LsccEngine::new(Arc::new(Keypair::from_seed([4u8; 32])), 1, 1, 0.66, weights, Duration::from_secs(10));
    let tip = Block::genesis(0, 0, Address::ZERO);
    let batch = synthetic_batch(&kp);
    let validators = vec![validator_set(&kp, 100), validator_set(&kp, 100), validator_set(&kp, 100)].concat();
    c.bench_function("lscc_propose_200tx", |b| {
        b.to_async(&rt).iter_batched(
            || ProposeContext { shard_id: 0, round: 1, batch: batch.clone(), chain_tip: tip.clone(), validators: validators.clone() },
            |ctx| async { engine.propose(ctx).await.unwrap() },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(engines, bench_pow, bench_pos, bench_pbft, bench_lscc);
criterion_main!(engines);
