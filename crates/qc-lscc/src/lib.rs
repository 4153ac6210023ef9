//! # LSCC
//!
//! [`LsccEngine`]: layered, cross-channel consensus. Each round forms
//! `layer_depth * channel_count` validator channels ([`channel::form_channels`]),
//! collects per-channel signature quorums over the batch's Merkle root, scores
//! the round across four weighted ratios, and commits a block signed by the
//! round's designated reporter once the score clears the configured
//! threshold. The common [`qc_consensus_core::ConsensusEngine`] methods cover
//! proposing and validating a block; the inherent
//! `record_channel_signature`/`force_abort`/`report_network_health`/
//! `report_shard_sync` methods are the extra surface the driver's gossip and
//! health-probe handling calls into.

pub mod channel;
pub mod engine;
pub mod phase;

pub use channel::{form_channels, is_strict_majority, ChannelKey};
pub use engine::{LsccEngine, INCONSISTENCY_SLASH_THRESHOLD};
pub use phase::{ChannelVerdict, LsccPhase};
