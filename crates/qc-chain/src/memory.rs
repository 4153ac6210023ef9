//! An in-process `Store` backed by plain `HashMap`s behind one mutex.
//! Used in tests and by any node that doesn't need durability across
//! restarts.

use crate::store::{Batch, Store};
use shared_types::{Address, Block, Hash, Shard, StoreError, Transaction, Validator};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    blocks_by_hash: HashMap<Hash, Block>,
    blocks_by_index: HashMap<(u32, u64), Hash>,
    tips: HashMap<u32, Hash>,
    txs: HashMap<Hash, Transaction>,
    txs_by_address: HashMap<Address, Vec<Hash>>,
    validators: HashMap<Address, Validator>,
    shards: HashMap<u32, Shard>,
    state: HashMap<String, Vec<u8>>,
}

impl Inner {
    fn apply(&mut self, op: Op) {
        match op {
            Op::PutBlock(block) => {
                self.blocks_by_index.insert((block.shard_id, block.index), block.hash);
                self.tips.insert(block.shard_id, block.hash);
                self.blocks_by_hash.insert(block.hash, block);
            }
            Op::PutTx(tx) => {
                self.txs_by_address.entry(tx.from).or_default().push(tx.id);
                if tx.to != tx.from {
                    self.txs_by_address.entry(tx.to).or_default().push(tx.id);
                }
                self.txs.insert(tx.id, tx);
            }
            Op::PutValidator(v) => {
                self.validators.insert(v.address, v);
            }
            Op::PutShard(s) => {
                self.shards.insert(s.id, s);
            }
            Op::SetState(k, v) => {
                self.state.insert(k, v);
            }
            Op::DeleteState(k) => {
                self.state.remove(&k);
            }
        }
    }
}

enum Op {
    PutBlock(Block),
    PutTx(Transaction),
    PutValidator(Validator),
    PutShard(Shard),
    SetState(String, Vec<u8>),
    DeleteState(String),
}

/// In-memory [`Store`] implementation.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    /// Build an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

struct InMemoryBatch<'a> {
    store: &'a InMemoryStore,
    ops: Vec<Op>,
}

impl Batch for InMemoryBatch<'_> {
    fn put_block(&mut self, block: Block) {
        self.ops.push(Op::PutBlock(block));
    }
    fn put_tx(&mut self, tx: Transaction) {
        self.ops.push(Op::PutTx(tx));
    }
    fn put_validator(&mut self, validator: Validator) {
        self.ops.push(Op::PutValidator(validator));
    }
    fn put_shard(&mut self, shard: Shard) {
        self.ops.push(Op::PutShard(shard));
    }
    fn set_state(&mut self, key: String, value: Vec<u8>) {
        self.ops.push(Op::SetState(key, value));
    }
    fn delete_state(&mut self, key: String) {
        self.ops.push(Op::DeleteState(key));
    }
    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut inner = self.store.inner.lock().unwrap();
        for op in self.ops {
            inner.apply(op);
        }
        Ok(())
    }
    fn cancel(self: Box<Self>) {}
}

impl Store for InMemoryStore {
    fn put_block(&self, block: &Block) -> Result<(), StoreError> {
        self.inner.lock().unwrap().apply(Op::PutBlock(block.clone()));
        Ok(())
    }

    fn get_block_by_hash(&self, hash: &Hash) -> Result<Option<Block>, StoreError> {
        Ok(self.inner.lock().unwrap().blocks_by_hash.get(hash).cloned())
    }

    fn get_block_by_index(&self, shard_id: u32, index: u64) -> Result<Option<Block>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .blocks_by_index
            .get(&(shard_id, index))
            .and_then(|h| inner.blocks_by_hash.get(h))
            .cloned())
    }

    fn get_tip(&self, shard_id: u32) -> Result<Option<Block>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .tips
            .get(&shard_id)
            .and_then(|h| inner.blocks_by_hash.get(h))
            .cloned())
    }

    fn put_tx(&self, tx: &Transaction) -> Result<(), StoreError> {
        self.inner.lock().unwrap().apply(Op::PutTx(tx.clone()));
        Ok(())
    }

    fn get_tx(&self, id: &Hash) -> Result<Option<Transaction>, StoreError> {
        Ok(self.inner.lock().unwrap().txs.get(id).cloned())
    }

    fn txs_by_address(&self, addr: &Address) -> Result<Vec<Transaction>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .txs_by_address
            .get(addr)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.txs.get(id).cloned())
            .collect())
    }

    fn put_validator(&self, validator: &Validator) -> Result<(), StoreError> {
        self.inner.lock().unwrap().apply(Op::PutValidator(validator.clone()));
        Ok(())
    }

    fn get_validator(&self, addr: &Address) -> Result<Option<Validator>, StoreError> {
        Ok(self.inner.lock().unwrap().validators.get(addr).cloned())
    }

    fn all_validators(&self) -> Result<Vec<Validator>, StoreError> {
        Ok(self.inner.lock().unwrap().validators.values().cloned().collect())
    }

    fn put_shard(&self, shard: &Shard) -> Result<(), StoreError> {
        self.inner.lock().unwrap().apply(Op::PutShard(shard.clone()));
        Ok(())
    }

    fn get_shard(&self, id: u32) -> Result<Option<Shard>, StoreError> {
        Ok(self.inner.lock().unwrap().shards.get(&id).cloned())
    }

    fn all_shards(&self) -> Result<Vec<Shard>, StoreError> {
        Ok(self.inner.lock().unwrap().shards.values().cloned().collect())
    }

    fn put_state(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.inner.lock().unwrap().apply(Op::SetState(key.to_string(), value.to_vec()));
        Ok(())
    }

    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.inner.lock().unwrap().state.get(key).cloned())
    }

    fn delete_state(&self, key: &str) -> Result<(), StoreError> {
        self.inner.lock().unwrap().apply(Op::DeleteState(key.to_string()));
        Ok(())
    }

    fn new_batch(&self) -> Box<dyn Batch + '_> {
        Box::new(InMemoryBatch { store: self, ops: Vec::new() })
    }
}
