//! The `Store` contract: durable block/transaction/validator/shard/state
//! persistence with atomic batch writes. [`memory::InMemoryStore`] and
//! [`sled_store::SledStore`] are the two implementations; everything above
//! this crate only ever depends on the trait.

use shared_types::{Address, Block, Hash, Shard, StoreError, Transaction, Validator};

/// A staged set of writes applied atomically by [`Batch::commit`], or
/// discarded in full by [`Batch::cancel`].
///
/// Generalizes the plain key/value batch to the typed records this store
/// persists; `set_state`/`delete_state` remain available for the
/// free-form `state` namespace callers use for their own bookkeeping.
pub trait Batch: Send {
    /// Stage a block write (both its hash and per-shard index entries).
    fn put_block(&mut self, block: Block);
    /// Stage a transaction write.
    fn put_tx(&mut self, tx: Transaction);
    /// Stage a validator write.
    fn put_validator(&mut self, validator: Validator);
    /// Stage a shard write.
    fn put_shard(&mut self, shard: Shard);
    /// Stage a `state` namespace write.
    fn set_state(&mut self, key: String, value: Vec<u8>);
    /// Stage a `state` namespace deletion.
    fn delete_state(&mut self, key: String);
    /// Apply every staged write atomically and durably.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;
    /// Discard every staged write.
    fn cancel(self: Box<Self>);
}

/// Durable persistence for blocks, transactions, validators, shards, and
/// arbitrary `state` key/value pairs.
pub trait Store: Send + Sync {
    /// Persist `block`, indexed by both hash and `(shard_id, index)`.
    fn put_block(&self, block: &Block) -> Result<(), StoreError>;
    /// Look up a block by its header hash.
    fn get_block_by_hash(&self, hash: &Hash) -> Result<Option<Block>, StoreError>;
    /// Look up a block by shard and height.
    fn get_block_by_index(&self, shard_id: u32, index: u64) -> Result<Option<Block>, StoreError>;
    /// The highest-index block stored for `shard_id`, if any.
    fn get_tip(&self, shard_id: u32) -> Result<Option<Block>, StoreError>;

    /// Persist `tx`, indexed by id and by both `from`/`to` addresses.
    fn put_tx(&self, tx: &Transaction) -> Result<(), StoreError>;
    /// Look up a transaction by id.
    fn get_tx(&self, id: &Hash) -> Result<Option<Transaction>, StoreError>;
    /// All transactions touching `addr` as sender or recipient.
    fn txs_by_address(&self, addr: &Address) -> Result<Vec<Transaction>, StoreError>;

    /// Persist a validator record.
    fn put_validator(&self, validator: &Validator) -> Result<(), StoreError>;
    /// Look up a validator by address.
    fn get_validator(&self, addr: &Address) -> Result<Option<Validator>, StoreError>;
    /// Every validator record in the store, in no particular order.
    fn all_validators(&self) -> Result<Vec<Validator>, StoreError>;

    /// Persist a shard record.
    fn put_shard(&self, shard: &Shard) -> Result<(), StoreError>;
    /// Look up a shard by id.
    fn get_shard(&self, id: u32) -> Result<Option<Shard>, StoreError>;
    /// Every shard record in the store.
    fn all_shards(&self) -> Result<Vec<Shard>, StoreError>;

    /// Write an arbitrary `(key, value)` pair in the `state` namespace.
    fn put_state(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    /// Read a `state` namespace value.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    /// Delete a `state` namespace value.
    fn delete_state(&self, key: &str) -> Result<(), StoreError>;

    /// Start a new atomic batch.
    fn new_batch(&self) -> Box<dyn Batch + '_>;

    /// Append `block` and its transactions in a single atomic batch,
    /// rejecting it with [`StoreError::ParentMismatch`] if `block.prev_hash`
    /// no longer matches the shard's current tip. The shard's `tip_hash` is
    /// updated in the same batch.
    fn append_block(&self, block: Block, txs: &[Transaction]) -> Result<(), StoreError> {
        let tip = self.get_tip(block.shard_id)?;
        let expected = tip.as_ref().map(|b| b.hash).unwrap_or(Hash::ZERO);
        if block.prev_hash != expected {
            return Err(StoreError::ParentMismatch {
                expected: expected.to_hex(),
                actual: block.prev_hash.to_hex(),
            });
        }
        let mut shard = self
            .get_shard(block.shard_id)?
            .ok_or_else(|| StoreError::NotFound(format!("shard {}", block.shard_id)))?;
        shard.tip_hash = block.hash;

        let mut batch = self.new_batch();
        batch.put_block(block);
        for tx in txs {
            batch.put_tx(tx.clone());
        }
        batch.put_shard(shard);
        batch.commit()
    }
}
