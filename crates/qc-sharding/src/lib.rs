//! # Sharding
//!
//! Static shard assignment ([`ShardManager`]) and the cross-shard envelope
//! router ([`CrossShardRouter`]) that carries `cross_shard` transactions
//! from their source shard's committed block to application on the
//! destination shard.

pub mod manager;
pub mod router;

pub use manager::ShardManager;
pub use router::{ApplyOutcome, CrossShardRouter};
