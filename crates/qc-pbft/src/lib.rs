//! # PBFT
//!
//! [`PbftEngine`]: rotating-primary three-phase consensus. The common
//! [`qc_consensus_core::ConsensusEngine`] methods cover proposing and
//! validating a block; the inherent `record_prepare`/`record_commit`/
//! `force_view_change` methods are how the driver feeds in votes observed
//! over gossip and trigger a view-change on a local phase timeout.

pub mod engine;
pub mod phase;

pub use engine::PbftEngine;
pub use phase::{min_validators, quorum_size, PbftPhase};
