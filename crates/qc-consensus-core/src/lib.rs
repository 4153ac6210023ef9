//! # Consensus Core
//!
//! The algorithm-agnostic contract every consensus engine implements:
//! [`ConsensusEngine`]. `qc-pow`, `qc-pos`, `qc-pbft`, and `qc-lscc` each
//! provide one implementation; `qc-driver` dispatches over them through a
//! tagged enum rather than a trait object, so this crate never depends on
//! any of the four algorithm crates (that dependency runs the other way).
//!
//! Kept deliberately thin: just the trait, its supporting value types, and
//! the error enum an engine can raise. Round orchestration (draining the
//! pool, appending to the store, broadcasting) is the driver's job, not
//! this crate's.

pub mod engine;
pub mod error;

pub use engine::{BlockCandidate, ConsensusEngine, ConsensusState, ForkChoice, ProposeContext};
pub use error::EngineError;
