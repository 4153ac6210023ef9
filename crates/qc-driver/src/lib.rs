//! # Driver
//!
//! The per-shard consensus round loop: drains the pool, asks an
//! [`EngineSet`] to propose, resolves fork-choice races against
//! peer-delivered blocks, and appends atomically via [`qc_chain::Store`].
//! The driver is the sole writer to chain state for its shard.

pub mod driver;
pub mod engine_set;

pub use driver::{drive_shard, RoundOutcome, ShardDriver};
pub use engine_set::EngineSet;
