//! Enumerated, overridable configuration.
//!
//! These are plain records with `Default` impls carrying the stated
//! defaults — no reflection-based unmarshalling, an explicit struct with
//! an enumerated recognised field set instead. Loading from CLI/YAML and
//! rejecting unknown keys is `node-runtime`'s job; every other crate just
//! takes one of these structs by value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which consensus algorithm a shard's driver should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusAlgorithm {
    /// Proof-of-Work.
    Pow,
    /// Proof-of-Stake.
    Pos,
    /// Practical Byzantine Fault Tolerance.
    Pbft,
    /// Layered, cross-channel consensus.
    Lscc,
}

/// A configuration value failed validation at startup.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// `consensus.byzantine=f` requires `|validators| >= 3f + 1`; a
    /// validator set that can't satisfy this is rejected at startup
    /// rather than left to fail mid-round.
    #[error("PBFT requires |validators| >= 3f+1 (f={f}, got {validator_count} validators)")]
    InsufficientValidatorsForByzantineTolerance { f: u32, validator_count: usize },
    /// `consensus.weights` must sum to `1.0`.
    #[error("LSCC weights must sum to 1.0, got {sum}")]
    WeightsDoNotSumToOne { sum: f64 },
    /// `consensus.commit_threshold` must be in `(0, 1]`.
    #[error("LSCC commit_threshold must be in (0, 1], got {0}")]
    ThresholdOutOfRange(f64),
    /// `sharding.num_shards` must be at least 1.
    #[error("num_shards must be >= 1, got {0}")]
    ZeroShards(u32),
}

/// Consensus-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsensusConfig {
    /// Which algorithm to run.
    pub algorithm: ConsensusAlgorithm,
    /// PoW: target leading hex zeros, `>= 1`.
    pub difficulty: u32,
    /// PoS: minimum stake for leader eligibility.
    pub min_stake: u64,
    /// PBFT: tolerated Byzantine replicas `f`. Requires `|V| >= 3f+1`.
    pub byzantine: u32,
    /// LSCC: number of layers `L`, default 3.
    pub layer_depth: u32,
    /// LSCC: shards (channels) per layer `S`, default 2.
    pub channel_count: u32,
    /// LSCC: commit threshold in `(0, 1]`, default `0.70`.
    pub commit_threshold: f64,
    /// LSCC: the four weighted-commit-score weights, summing to `1.0`.
    /// Default `(0.4, 0.3, 0.2, 0.1)`.
    pub weights: LsccWeights,
    /// Target wall-clock time between block appends per shard, in seconds.
    pub block_interval_secs: u64,
    /// Deadline applied to each consensus phase (PBFT phase, LSCC phase),
    /// in seconds.
    pub phase_timeout_secs: u64,
    /// PoS: validators inactive longer than this (seconds) are ineligible.
    pub inactivity_bound_secs: i64,
    /// PoS: round length in blocks used to derive `epoch = round / epoch_length`.
    pub epoch_length: u64,
    /// PoW: wall-clock ceiling for a single nonce search, in
    /// milliseconds, before the round is abandoned and retried.
    pub pow_round_ceiling_millis: u64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            algorithm: ConsensusAlgorithm::Pos,
            difficulty: 4,
            min_stake: 0,
            byzantine: 1,
            layer_depth: 3,
            channel_count: 2,
            commit_threshold: 0.70,
            weights: LsccWeights::default(),
            block_interval_secs: 6,
            phase_timeout_secs: 4,
            inactivity_bound_secs: 3600,
            epoch_length: 32,
            pow_round_ceiling_millis: 2000,
        }
    }
}

impl ConsensusConfig {
    /// Validate this config, optionally against a known validator count
    /// (needed for the PBFT `|V| >= 3f+1` check).
    pub fn validate(&self, validator_count: Option<usize>) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.commit_threshold) || self.commit_threshold == 0.0 {
            return Err(ConfigError::ThresholdOutOfRange(self.commit_threshold));
        }
        self.weights.validate()?;
        if self.algorithm == ConsensusAlgorithm::Pbft {
            if let Some(n) = validator_count {
                let required = 3 * self.byzantine as usize + 1;
                if n < required {
                    return Err(ConfigError::InsufficientValidatorsForByzantineTolerance {
                        f: self.byzantine,
                        validator_count: n,
                    });
                }
            }
        }
        Ok(())
    }
}

/// LSCC weighted-commit-score weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LsccWeights {
    /// Weight on `layer_consensus`.
    pub layer_consensus: f64,
    /// Weight on `channel_approval`.
    pub channel_approval: f64,
    /// Weight on `shard_sync`.
    pub shard_sync: f64,
    /// Weight on `network_health`.
    pub network_health: f64,
}

impl Default for LsccWeights {
    fn default() -> Self {
        Self {
            layer_consensus: 0.4,
            channel_approval: 0.3,
            shard_sync: 0.2,
            network_health: 0.1,
        }
    }
}

impl LsccWeights {
    /// Weighted sum, one term per ratio.
    pub fn score(&self, layer_consensus: f64, channel_approval: f64, shard_sync: f64, network_health: f64) -> f64 {
        self.layer_consensus * layer_consensus
            + self.channel_approval * channel_approval
            + self.shard_sync * shard_sync
            + self.network_health * network_health
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let sum = self.layer_consensus + self.channel_approval + self.shard_sync + self.network_health;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::WeightsDoNotSumToOne { sum });
        }
        Ok(())
    }
}

/// Sharding configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShardingConfig {
    /// Static shard count `N`, fixed at start.
    pub num_shards: u32,
    /// Target validator count per shard (bookkeeping; assignment is
    /// round-robin by shard_id modulo).
    pub shard_size: u32,
    /// Deadline, in seconds, for a cross-shard envelope to resolve.
    pub cross_shard_delay_secs: i64,
}

impl Default for ShardingConfig {
    fn default() -> Self {
        Self {
            num_shards: 1,
            shard_size: 4,
            cross_shard_delay_secs: 30,
        }
    }
}

impl ShardingConfig {
    /// Validate this config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_shards == 0 {
            return Err(ConfigError::ZeroShards(self.num_shards));
        }
        Ok(())
    }
}

/// Transaction pool configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Maximum pending-set size; admission beyond this fails with `PoolFull`.
    pub max_size: usize,
    /// Maximum age, in seconds, before `gc()` evicts a pending transaction.
    pub max_age_secs: i64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 5_000,
            max_age_secs: 24 * 3600,
        }
    }
}

/// Driver-level batching parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    /// Minimum pool depth before a round is attempted.
    pub min_batch: usize,
    /// Maximum transactions drained into a single round's batch.
    pub max_batch: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            min_batch: 1,
            max_batch: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        LsccWeights::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_weights() {
        let w = LsccWeights {
            layer_consensus: 0.5,
            channel_approval: 0.5,
            shard_sync: 0.5,
            network_health: 0.5,
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn pbft_validator_floor() {
        let cfg = ConsensusConfig {
            algorithm: ConsensusAlgorithm::Pbft,
            byzantine: 1,
            ..ConsensusConfig::default()
        };
        assert!(cfg.validate(Some(4)).is_ok());
        assert!(cfg.validate(Some(3)).is_err());
    }

    #[test]
    fn lscc_score_matches_formula() {
        let w = LsccWeights::default();
        let s = w.score(1.0, 1.0, 1.0, 1.0);
        assert!((s - 1.0).abs() < 1e-9);
    }
}
