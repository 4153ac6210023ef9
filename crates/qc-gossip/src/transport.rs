//! The `Transport` contract and its in-process loopback implementation.

use async_trait::async_trait;
use shared_types::TransportError;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// The five message kinds a transport routes, matching the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// A committed block.
    Block,
    /// A pending transaction.
    Tx,
    /// An algorithm's internal consensus message (PBFT votes, LSCC channel
    /// signatures).
    ConsensusMsg,
    /// A message addressed to a different shard's algorithm (tolerated,
    /// no semantic effect per shard boundary).
    CrossAlgo,
    /// Peer discovery chatter.
    Discovery,
}

/// Opaque peer identity as seen by the transport layer.
pub type PeerId = String;

/// Default bound on each kind's broadcast channel; oldest messages are
/// dropped for slow subscribers rather than blocking the sender, except
/// `Block`, which backs a bounded channel sized generously enough that
/// blocks are never the ones dropped in practice.
const CHANNEL_CAPACITY: usize = 1024;

/// Best-effort peer broadcast plus per-kind inbound delivery. No ordering
/// guarantee across peers; engines tolerate reordering.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Broadcast `payload` to every reachable peer under `kind`.
    async fn broadcast(&self, kind: MessageKind, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Subscribe to inbound `(peer, payload)` deliveries for `kind`. Each
    /// call returns an independent receiver; a slow subscriber misses
    /// messages sent before it lagged rather than stalling the sender.
    fn subscribe(&self, kind: MessageKind) -> broadcast::Receiver<(PeerId, Vec<u8>)>;

    /// This node's own peer id, as advertised to others.
    fn local_peer_id(&self) -> &str;
}

/// Loopback transport: every `broadcast` is immediately visible to every
/// local `subscribe`r, tagged with `local_peer_id`. Used for tests and for
/// running multiple shards/algorithms in one process without a real
/// network; [`crate::tcp::TcpGossipTransport`] is the wiring point for an
/// actual peer-to-peer network.
pub struct InMemoryTransport {
    local_peer_id: PeerId,
    channels: Mutex<HashMap<MessageKind, broadcast::Sender<(PeerId, Vec<u8>)>>>,
}

impl InMemoryTransport {
    /// Build a loopback transport advertising `local_peer_id`.
    pub fn new(local_peer_id: impl Into<String>) -> Self {
        Self {
            local_peer_id: local_peer_id.into(),
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn sender_for(&self, kind: MessageKind) -> broadcast::Sender<(PeerId, Vec<u8>)> {
        let mut channels = self.channels.lock().unwrap();
        channels.entry(kind).or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0).clone()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn broadcast(&self, kind: MessageKind, payload: Vec<u8>) -> Result<(), TransportError> {
        let sender = self.sender_for(kind);
        // No active subscribers is not an error: best-effort delivery.
        let _ = sender.send((self.local_peer_id.clone(), payload));
        Ok(())
    }

    fn subscribe(&self, kind: MessageKind) -> broadcast::Receiver<(PeerId, Vec<u8>)> {
        self.sender_for(kind).subscribe()
    }

    fn local_peer_id(&self) -> &str {
        &self.local_peer_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_is_visible_to_subscribers() {
        let transport = InMemoryTransport::new("node-a");
        let mut rx = transport.subscribe(MessageKind::Block);
        transport.broadcast(MessageKind::Block, vec![1, 2, 3]).await.unwrap();
        let (peer, payload) = rx.recv().await.unwrap();
        assert_eq!(peer, "node-a");
        assert_eq!(payload, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn kinds_are_isolated() {
        let transport = InMemoryTransport::new("node-a");
        let mut tx_rx = transport.subscribe(MessageKind::Tx);
        transport.broadcast(MessageKind::Block, vec![9]).await.unwrap();
        transport.broadcast(MessageKind::Tx, vec![1]).await.unwrap();
        let (_, payload) = tx_rx.recv().await.unwrap();
        assert_eq!(payload, vec![1]);
    }

    #[tokio::test]
    async fn broadcast_with_no_subscribers_is_not_an_error() {
        let transport = InMemoryTransport::new("node-a");
        assert!(transport.broadcast(MessageKind::Discovery, vec![]).await.is_ok());
    }
}
