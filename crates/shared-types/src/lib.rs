//! # Shared Types
//!
//! Single source of truth for the domain entities used by every consensus
//! and sharding crate: [`Address`], [`Hash`], [`Transaction`], [`Block`],
//! [`Validator`], [`Shard`], and [`CrossShardEnvelope`].
//!
//! ## Clusters
//!
//! - **Primitives**: [`Address`], [`Hash`], [`Signature`] — fixed-size,
//!   hex-rendered identifiers.
//! - **Chain**: [`Transaction`], [`Block`], [`TransactionKind`].
//! - **Consensus**: [`Validator`], [`ValidatorStatus`].
//! - **Sharding**: [`Shard`], [`CrossShardEnvelope`], [`EnvelopeState`].
//!
//! Hashes used as hash *pre-images* (transaction id, block hash) go through
//! [`codec`], a hand-rolled canonical big-endian encoder — never through
//! `serde`/`bincode`, whose representation is an implementation detail of
//! the library and would make the hash depend on it rather than on a
//! stable wire format.

pub mod clock;
pub mod codec;
pub mod config;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod primitives;
pub mod shard_key;

pub use clock::{Clock, FixedClock, SystemClock};
pub use entities::{Block, Shard, Transaction, TransactionKind, Validator, ValidatorStatus};
pub use envelope::{CrossShardEnvelope, EnvelopeState};
pub use errors::{PoolError, StoreError, TransportError};
pub use primitives::{Address, Hash, Signature, ADDRESS_LEN, HASH_LEN, SIGNATURE_LEN};
pub use shard_key::shard_key;
