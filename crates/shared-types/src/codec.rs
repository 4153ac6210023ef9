//! Canonical wire encoding.
//!
//! This is the *only* encoding used to produce hash pre-images for
//! transaction ids and block hashes. All integers are big-endian; strings
//! and byte arrays are length-prefixed with a `u32`. `serde`/`bincode` are
//! used elsewhere (Store/Transport payloads) but never here, because their
//! representations are an implementation detail that must not leak into a
//! content hash.

use crate::entities::{Transaction, TransactionKind};
use crate::primitives::{Address, Hash};

/// An append-only canonical-encoding buffer.
#[derive(Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// New empty encoder.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append a `u8`.
    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    /// Append a big-endian `u32`.
    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Append a big-endian `u64`.
    pub fn put_u64(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Append a big-endian `i64`.
    pub fn put_i64(&mut self, v: i64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Append raw fixed-size bytes verbatim (no length prefix).
    pub fn put_fixed(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Append a `u32`-length-prefixed byte string.
    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.put_u32(bytes.len() as u32);
        self.put_fixed(bytes)
    }

    /// Consume the encoder, returning the accumulated buffer.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Canonical pre-image of a transaction, covering every field *except*
/// `signature` and `id` itself — `id` is the deterministic hash over this
/// encoding.
///
/// This same pre-image is what `from` signs; signature verification runs
/// over it too.
pub fn transaction_preimage(tx: &Transaction) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.put_fixed(tx.from.as_bytes());
    enc.put_fixed(tx.to.as_bytes());
    enc.put_u64(tx.amount);
    enc.put_u64(tx.fee);
    enc.put_bytes(&tx.data);
    enc.put_i64(tx.timestamp);
    enc.put_u64(tx.nonce);
    enc.put_u32(tx.shard_id);
    enc.put_u8(tx.kind.as_u8());
    enc.finish()
}

/// Canonical pre-image of a block header: fixed field order
/// (`index u64, prev_hash 32B, timestamp i64, validator 20B, merkle_root
/// 32B, shard_id u32`).
pub fn block_header_preimage(
    index: u64,
    prev_hash: &Hash,
    timestamp: i64,
    validator: &Address,
    merkle_root: &Hash,
    shard_id: u32,
) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.put_u64(index);
    enc.put_fixed(prev_hash.as_bytes());
    enc.put_i64(timestamp);
    enc.put_fixed(validator.as_bytes());
    enc.put_fixed(merkle_root.as_bytes());
    enc.put_u32(shard_id);
    enc.finish()
}

impl TransactionKind {
    /// Stable wire tag, used only inside the canonical pre-image — never
    /// renumber without bumping a protocol version, since it feeds hashes.
    pub fn as_u8(&self) -> u8 {
        match self {
            TransactionKind::Regular => 0,
            TransactionKind::CrossShard => 1,
            TransactionKind::Stake => 2,
            TransactionKind::Unstake => 3,
        }
    }
}
