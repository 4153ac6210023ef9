//! Subsystem wiring: build the pool/store/sharding/gossip/driver stack for
//! every configured shard and run them to completion.

use crate::config::NodeConfig;
use qc_chain::{bootstrap, GenesisValidator, InMemoryStore, SledStore, Store};
use qc_driver::{drive_shard, EngineSet, ShardDriver};
use qc_gossip::{GossipAdapter, InMemoryTransport};
use qc_pool::TransactionPool;
use qc_sharding::{CrossShardRouter, ShardManager};
use shared_crypto::{derive_address, Keypair};
use shared_observer::{Observer, TracingObserver};
use shared_types::{Clock, SystemClock, Validator, ValidatorStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Everything needed to run a node: the shared collaborators plus one
/// [`ShardDriver`] per shard.
pub struct Node {
    store: Arc<dyn Store>,
    pool: Arc<TransactionPool>,
    observer: Arc<dyn Observer>,
    drivers: Vec<Arc<ShardDriver>>,
}

/// Failure building a [`Node`] from a [`NodeConfig`].
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    /// The durable store could not be opened.
    #[error("failed to open store at {path}: {source}")]
    StoreOpen {
        /// Data directory that failed to open.
        path: String,
        /// Underlying store error.
        #[source]
        source: shared_types::StoreError,
    },
    /// Genesis bootstrap failed.
    #[error("genesis bootstrap failed: {0}")]
    Genesis(#[from] shared_types::StoreError),
}

impl Node {
    /// Build every subsystem named in `config`, bootstrapping genesis if
    /// the store is fresh. This node signs with `local_keypair` wherever
    /// an engine needs a local identity.
    pub fn build(config: &NodeConfig, local_keypair: Arc<Keypair>) -> Result<Self, WiringError> {
        let store: Arc<dyn Store> = if config.data_dir == ":memory:" {
            Arc::new(InMemoryStore::new())
        } else {
            Arc::new(SledStore::open(&config.data_dir).map_err(|source| WiringError::StoreOpen { path: config.data_dir.clone(), source })?)
        };

        let genesis_validators: Vec<GenesisValidator> = config
            .validators
            .iter()
            .map(|seed| {
                let public_key_bytes = hex::decode(&seed.public_key_hex).expect("validated by NodeConfig::validate");
                let mut public_key = [0u8; 32];
                public_key.copy_from_slice(&public_key_bytes);
                GenesisValidator { address: derive_address(&public_key), public_key, stake: seed.stake }
            })
            .collect();
        bootstrap(&*store, config.sharding.num_shards, config.genesis_timestamp, &genesis_validators)?;

        let pool = Arc::new(TransactionPool::new(config.pool.max_size));
        let observer: Arc<dyn Observer> = Arc::new(TracingObserver::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let transport = Arc::new(InMemoryTransport::new(local_keypair.address().to_hex()));
        let gossip = Arc::new(GossipAdapter::new(transport, config.gossip_dedup_ttl_secs));
        let router = Arc::new(CrossShardRouter::new(observer.clone()));
        let shard_manager = Arc::new(ShardManager::new(config.sharding.num_shards));

        let mut drivers = Vec::with_capacity(config.sharding.num_shards as usize);
        for shard_id in 0..config.sharding.num_shards {
            let engine = Arc::new(EngineSet::new(&config.consensus, local_keypair.clone(), clock.clone()));
            let driver = Arc::new(ShardDriver::new(
                shard_id,
                pool.clone(),
                store.clone(),
                engine,
                gossip.clone(),
                observer.clone(),
                clock.clone(),
                config.driver,
                Duration::from_secs(config.consensus.block_interval_secs),
                router.clone(),
                shard_manager.clone(),
                config.sharding.cross_shard_delay_secs,
            ));
            drivers.push(driver);
        }

        Ok(Self { store, pool, observer, drivers })
    }

    /// Run every shard's round loop concurrently until one halts on a
    /// fatal store error or the process is asked to shut down.
    pub async fn run(self, mut shutdown: tokio::sync::oneshot::Receiver<()>) {
        let store = self.store;
        let mut tasks = tokio::task::JoinSet::new();
        for driver in self.drivers {
            let store = store.clone();
            tasks.spawn(async move {
                let shard_id_for_lookup = driver_shard_id(&driver);
                drive_shard(driver, Duration::from_millis(200), move || {
                    let store = store.clone();
                    async move { (validators_for_shard(&*store, shard_id_for_lookup), None) }
                })
                .await;
            });
        }

        tokio::select! {
            _ = tasks.join_next() => {
                info!("a shard driver halted, shutting down the rest");
            }
            _ = &mut shutdown => {
                info!("shutdown requested");
            }
        }
        tasks.shutdown().await;
    }

    /// The transaction pool, for an external submission surface to admit into.
    pub fn pool(&self) -> &Arc<TransactionPool> {
        &self.pool
    }

    /// The metrics/event sink backing this node.
    pub fn observer(&self) -> &Arc<dyn Observer> {
        &self.observer
    }

    /// The durable store backing this node.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }
}

fn driver_shard_id(driver: &ShardDriver) -> u32 {
    driver.shard_id()
}

fn validators_for_shard(store: &dyn Store, shard_id: u32) -> Vec<Validator> {
    let Ok(Some(shard)) = store.get_shard(shard_id) else { return Vec::new() };
    shard
        .validators
        .iter()
        .filter_map(|addr| store.get_validator(addr).ok().flatten())
        .filter(|v: &Validator| v.status == ValidatorStatus::Active)
        .collect()
}
