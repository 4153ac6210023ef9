//! # Chain
//!
//! Block, transaction, validator, and shard persistence behind the
//! [`Store`] contract, plus genesis bootstrap. [`InMemoryStore`] backs
//! tests; [`SledStore`] is the durable implementation a real node runs.

pub mod genesis;
pub mod memory;
pub mod sled_store;
pub mod store;

pub use genesis::{bootstrap, GenesisValidator};
pub use memory::InMemoryStore;
pub use sled_store::SledStore;
pub use store::{Batch, Store};
