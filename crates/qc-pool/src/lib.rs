//! # Transaction Pool
//!
//! A single pool instance spans every shard: transactions admitted here
//! sit in one of three disjoint sets — pending, confirmed, failed — keyed
//! by transaction id. [`TransactionPool::take_for_shard`] is the only
//! shard-aware operation; everything else treats the pool as flat.
//!
//! Admission runs a validation gate (field checks, hash re-derivation,
//! Ed25519 signature verification) before a transaction reaches pending;
//! rejects land directly in failed with the violated invariant recorded.

pub mod pool;
pub mod validation;

pub use pool::TransactionPool;
