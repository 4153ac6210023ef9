//! # Gossip
//!
//! The [`Transport`] contract ([`InMemoryTransport`] is the loopback
//! implementation used by tests and single-process demos) plus
//! [`GossipAdapter`], the typed peer/gossip surface on top of it:
//! `broadcast_block`/`broadcast_tx`/`send_cross_algo`/
//! `broadcast_consensus_msg`, with inbound message-id dedup and a TTL.

pub mod adapter;
pub mod dedup;
pub mod transport;

pub use adapter::GossipAdapter;
pub use dedup::DedupCache;
pub use transport::{InMemoryTransport, MessageKind, PeerId, Transport};
