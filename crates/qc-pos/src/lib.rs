//! # Proof-of-Stake
//!
//! [`PosEngine`]: stake-weighted deterministic leader selection
//! ([`leader::select_leader`]) plus real Ed25519 block signing and
//! verification — no stubbed-out signature check. Fork choice uses the
//! `ConsensusEngine` default.

pub mod engine;
pub mod leader;

pub use engine::PosEngine;
pub use leader::select_leader;
