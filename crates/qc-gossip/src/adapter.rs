//! The peer/gossip adapter: `broadcast_block`/`broadcast_tx`/
//! `send_cross_algo` on top of a [`Transport`], plus dedup'd typed
//! receive helpers for the inbound side.

use crate::dedup::DedupCache;
use crate::transport::{MessageKind, PeerId, Transport};
use sha2::{Digest, Sha256};
use shared_types::{Block, Hash, Transaction, TransportError};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Wraps a [`Transport`] with (de)serialization and message-id dedup, the
/// shape every consumer of gossip actually wants instead of raw bytes.
pub struct GossipAdapter {
    transport: Arc<dyn Transport>,
    dedup: DedupCache,
}

impl GossipAdapter {
    /// Build an adapter over `transport`, deduplicating inbound message
    /// ids for `dedup_ttl_secs` seconds.
    pub fn new(transport: Arc<dyn Transport>, dedup_ttl_secs: i64) -> Self {
        Self { transport, dedup: DedupCache::new(dedup_ttl_secs) }
    }

    /// Broadcast a committed block.
    pub async fn broadcast_block(&self, block: &Block) -> Result<(), TransportError> {
        let payload = bincode::serialize(block).expect("Block always serializes");
        self.transport.broadcast(MessageKind::Block, payload).await
    }

    /// Broadcast a pending transaction.
    pub async fn broadcast_tx(&self, tx: &Transaction) -> Result<(), TransportError> {
        let payload = bincode::serialize(tx).expect("Transaction always serializes");
        self.transport.broadcast(MessageKind::Tx, payload).await
    }

    /// Send an algorithm-internal consensus message (PBFT votes, LSCC
    /// channel signatures) as an opaque payload.
    pub async fn broadcast_consensus_msg(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.transport.broadcast(MessageKind::ConsensusMsg, payload).await
    }

    /// Send a message addressed to a different shard's algorithm. No
    /// semantic effect on the receiving shard beyond delivery — this is a
    /// transport-level cross-algo bridge, not a new consensus primitive.
    pub async fn send_cross_algo(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.transport.broadcast(MessageKind::CrossAlgo, payload).await
    }

    /// Subscribe to inbound blocks.
    pub fn subscribe_blocks(&self) -> broadcast::Receiver<(PeerId, Vec<u8>)> {
        self.transport.subscribe(MessageKind::Block)
    }

    /// Subscribe to inbound transactions.
    pub fn subscribe_txs(&self) -> broadcast::Receiver<(PeerId, Vec<u8>)> {
        self.transport.subscribe(MessageKind::Tx)
    }

    /// Subscribe to inbound consensus messages.
    pub fn subscribe_consensus_msgs(&self) -> broadcast::Receiver<(PeerId, Vec<u8>)> {
        self.transport.subscribe(MessageKind::ConsensusMsg)
    }

    /// Subscribe to inbound cross-algo messages.
    pub fn subscribe_cross_algo(&self) -> broadcast::Receiver<(PeerId, Vec<u8>)> {
        self.transport.subscribe(MessageKind::CrossAlgo)
    }

    /// Receive the next not-yet-seen block from `rx`, decoding and
    /// deduplicating by block hash. Returns `None` once the channel
    /// closes; malformed payloads and already-seen blocks are skipped.
    pub async fn recv_block(&self, rx: &mut broadcast::Receiver<(PeerId, Vec<u8>)>, now: i64) -> Option<(PeerId, Block)> {
        loop {
            match rx.recv().await {
                Ok((peer, payload)) => match bincode::deserialize::<Block>(&payload) {
                    Ok(block) if !self.dedup.check_and_insert(block.hash, now) => return Some((peer, block)),
                    Ok(_) => continue,
                    Err(e) => {
                        debug!(error = %e, "dropping malformed block payload");
                        continue;
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "block inbox lagged, resuming");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive the next not-yet-seen transaction from `rx`, decoding and
    /// deduplicating by transaction id.
    pub async fn recv_tx(&self, rx: &mut broadcast::Receiver<(PeerId, Vec<u8>)>, now: i64) -> Option<(PeerId, Transaction)> {
        loop {
            match rx.recv().await {
                Ok((peer, payload)) => match bincode::deserialize::<Transaction>(&payload) {
                    Ok(tx) if !self.dedup.check_and_insert(tx.id, now) => return Some((peer, tx)),
                    Ok(_) => continue,
                    Err(e) => {
                        debug!(error = %e, "dropping malformed transaction payload");
                        continue;
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "tx inbox lagged, resuming");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive the next not-yet-seen opaque payload from `rx`
    /// (consensus-msg or cross-algo queues), deduplicating by the
    /// payload's own content hash since these carry no typed id.
    pub async fn recv_opaque(&self, rx: &mut broadcast::Receiver<(PeerId, Vec<u8>)>, now: i64) -> Option<(PeerId, Vec<u8>)> {
        loop {
            match rx.recv().await {
                Ok((peer, payload)) => {
                    let id = Hash::from_slice(&Sha256::digest(&payload)).expect("sha256 digest is 32 bytes");
                    if !self.dedup.check_and_insert(id, now) {
                        return Some((peer, payload));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "opaque inbox lagged, resuming");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryTransport;
    use shared_types::{Address, TransactionKind};

    fn sample_tx() -> Transaction {
        Transaction::new_unsigned(Address([1u8; 20]), Address([2u8; 20]), 1, 1, vec![], 0, 0, 0, TransactionKind::Regular)
    }

    #[tokio::test]
    async fn broadcast_tx_is_received_once() {
        let transport = Arc::new(InMemoryTransport::new("a"));
        let adapter = GossipAdapter::new(transport, 60);
        let mut rx = adapter.subscribe_txs();
        let tx = sample_tx();
        adapter.broadcast_tx(&tx).await.unwrap();
        let (_, received) = adapter.recv_tx(&mut rx, 0).await.unwrap();
        assert_eq!(received.id, tx.id);
    }

    #[tokio::test]
    async fn redelivered_tx_is_deduplicated() {
        let transport = Arc::new(InMemoryTransport::new("a"));
        let adapter = GossipAdapter::new(transport, 60);
        let mut rx = adapter.subscribe_txs();
        let tx = sample_tx();
        adapter.broadcast_tx(&tx).await.unwrap();
        adapter.broadcast_tx(&tx).await.unwrap();
        let first = adapter.recv_tx(&mut rx, 0).await.unwrap();
        assert_eq!(first.1.id, tx.id);
        // The duplicate should never surface; confirm by broadcasting a
        // second, distinct transaction and checking it comes through next.
        let other = Transaction::new_unsigned(Address([1u8; 20]), Address([2u8; 20]), 1, 1, vec![], 0, 2, 0, TransactionKind::Regular);
        adapter.broadcast_tx(&other).await.unwrap();
        let next = adapter.recv_tx(&mut rx, 0).await.unwrap();
        assert_eq!(next.1.id, other.id);
    }

    #[tokio::test]
    async fn block_round_trips_through_broadcast() {
        let transport = Arc::new(InMemoryTransport::new("a"));
        let adapter = GossipAdapter::new(transport, 60);
        let mut rx = adapter.subscribe_blocks();
        let block = Block::genesis(0, 0, Address::ZERO);
        adapter.broadcast_block(&block).await.unwrap();
        let (_, received) = adapter.recv_block(&mut rx, 0).await.unwrap();
        assert_eq!(received.hash, block.hash);
    }
}
