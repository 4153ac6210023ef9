//! Node configuration: a plain struct-of-structs loaded from YAML.
//!
//! Every subsystem crate takes a typed config struct by value (constructor
//! injection, no globals); this crate is the only one that knows about
//! file paths or CLI flags.

use serde::{Deserialize, Serialize};
use shared_types::config::{ConfigError, ConsensusConfig, DriverConfig, PoolConfig, ShardingConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One seed validator entry in the `validators:` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorSeed {
    /// Hex-encoded 32-byte Ed25519 public key.
    pub public_key_hex: String,
    /// Initial stake.
    pub stake: u64,
}

/// Top-level node configuration, deserialized from YAML with
/// `deny_unknown_fields` so a typo in a config file fails loudly at
/// startup rather than silently falling back to a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Directory holding this node's durable `sled` database. `":memory:"`
    /// selects the in-memory store instead, for tests and demos.
    pub data_dir: String,
    /// Genesis timestamp (unix seconds) used when no chain exists yet.
    pub genesis_timestamp: i64,
    /// Sharding topology.
    pub sharding: ShardingConfig,
    /// Consensus parameters, shared by every shard's driver.
    pub consensus: ConsensusConfig,
    /// Transaction pool bounds.
    pub pool: PoolConfig,
    /// Driver batching parameters.
    pub driver: DriverConfig,
    /// Seed validator set, assigned round-robin across shards at genesis.
    pub validators: Vec<ValidatorSeed>,
    /// TTL, in seconds, for the gossip layer's inbound message-id dedup.
    pub gossip_dedup_ttl_secs: i64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: ":memory:".to_string(),
            genesis_timestamp: 0,
            sharding: ShardingConfig::default(),
            consensus: ConsensusConfig::default(),
            pool: PoolConfig::default(),
            driver: DriverConfig::default(),
            validators: Vec::new(),
            gossip_dedup_ttl_secs: 120,
        }
    }
}

/// Everything that can go wrong loading or validating a [`NodeConfig`].
#[derive(Debug, Error)]
pub enum NodeConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file's contents did not parse as this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// A seed validator's public key was not valid hex.
    #[error("validator public key is not valid hex: {0}")]
    BadPublicKeyHex(String),
    /// A structural invariant (weights, thresholds, byzantine floor) failed.
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

impl NodeConfig {
    /// Load and validate a config from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NodeConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| NodeConfigError::Read { path: path.to_path_buf(), source })?;
        let config: NodeConfig = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every structural invariant before any subsystem is built.
    pub fn validate(&self) -> Result<(), NodeConfigError> {
        self.sharding.validate()?;
        self.consensus.validate(Some(self.validators.len()))?;
        for seed in &self.validators {
            if hex::decode(&seed.public_key_hex).map(|b| b.len() != 32).unwrap_or(true) {
                return Err(NodeConfigError::BadPublicKeyHex(seed.public_key_hex.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        NodeConfig::default().validate().unwrap();
    }

    #[test]
    fn round_trips_through_yaml() {
        let config = NodeConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: NodeConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.data_dir, config.data_dir);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let yaml = "data_dir: ':memory:'\nbogus_field: 1\n";
        assert!(serde_yaml::from_str::<NodeConfig>(yaml).is_err());
    }

    #[test]
    fn insufficient_validators_for_byzantine_tolerance_is_rejected() {
        let mut config = NodeConfig::default();
        config.consensus.algorithm = shared_types::config::ConsensusAlgorithm::Pbft;
        config.consensus.byzantine = 1;
        config.validators = vec![ValidatorSeed { public_key_hex: "00".repeat(32), stake: 1 }];
        assert!(matches!(config.validate(), Err(NodeConfigError::Invalid(_))));
    }
}
