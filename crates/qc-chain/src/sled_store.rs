//! A durable [`Store`] backed by `sled`.
//!
//! Every record lives in a single `sled::Db` under a namespaced key prefix
//! rather than separate trees, so a [`sled::Batch`] applied via
//! `Db::apply_batch` covers every namespace in one atomic, durable write —
//! exactly the "single batch per appended block" the driver relies on.

use crate::store::{Batch, Store};
use shared_types::{Address, Block, Hash, Shard, StoreError, Transaction, Validator};

fn block_hash_key(hash: &Hash) -> Vec<u8> {
    [b"bh:".as_slice(), hash.as_bytes()].concat()
}

fn block_index_key(shard_id: u32, index: u64) -> Vec<u8> {
    [b"bi:".as_slice(), &shard_id.to_be_bytes(), &index.to_be_bytes()].concat()
}

fn tip_key(shard_id: u32) -> Vec<u8> {
    [b"tip:".as_slice(), &shard_id.to_be_bytes()].concat()
}

fn tx_key(id: &Hash) -> Vec<u8> {
    [b"tx:".as_slice(), id.as_bytes()].concat()
}

fn tx_addr_key(addr: &Address, id: &Hash) -> Vec<u8> {
    [b"txaddr:".as_slice(), addr.as_bytes(), id.as_bytes()].concat()
}

fn tx_addr_prefix(addr: &Address) -> Vec<u8> {
    [b"txaddr:".as_slice(), addr.as_bytes()].concat()
}

fn validator_key(addr: &Address) -> Vec<u8> {
    [b"val:".as_slice(), addr.as_bytes()].concat()
}

fn shard_key(id: u32) -> Vec<u8> {
    [b"shard:".as_slice(), &id.to_be_bytes()].concat()
}

fn state_key(key: &str) -> Vec<u8> {
    [b"state:".as_slice(), key.as_bytes()].concat()
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(value).map_err(|e| StoreError::Backend(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Backend(e.to_string()))
}

/// Sled-backed [`Store`].
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open (or create) a sled database rooted at `path`.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { db })
    }

    fn get_raw(&self, key: &[u8]) -> Result<Option<sled::IVec>, StoreError> {
        self.db.get(key).map_err(|e| StoreError::Backend(e.to_string()))
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

struct SledBatch<'a> {
    store: &'a SledStore,
    ops: Vec<Op>,
}

impl Batch for SledBatch<'_> {
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
        let mut batch = sled::Batch::default();
        for op in self.ops {
            match op {
                Op::PutBlock(block) => {
                    batch.insert(block_index_key(block.shard_id, block.index), block.hash.as_bytes().to_vec());
                    batch.insert(tip_key(block.shard_id), block.hash.as_bytes().to_vec());
                    batch.insert(block_hash_key(&block.hash), encode(&block)?);
                }
                Op::PutTx(tx) => {
                    batch.insert(tx_addr_key(&tx.from, &tx.id), Vec::new());
                    if tx.to != tx.from {
                        batch.insert(tx_addr_key(&tx.to, &tx.id), Vec::new());
                    }
                    batch.insert(tx_key(&tx.id), encode(&tx)?);
                }
                Op::PutValidator(v) => {
                    batch.insert(validator_key(&v.address), encode(&v)?);
                }
                Op::PutShard(s) => {
                    batch.insert(shard_key(s.id), encode(&s)?);
                }
                Op::SetState(k, v) => {
                    batch.insert(state_key(&k), v);
                }
                Op::DeleteState(k) => {
                    batch.remove(state_key(&k));
                }
            }
        }
        self.store.db.apply_batch(batch).map_err(|e| StoreError::CommitFailed(e.to_string()))?;
        self.store.db.flush().map_err(|e| StoreError::CommitFailed(e.to_string()))?;
        Ok(())
    }

    fn cancel(self: Box<Self>) {}
}

impl Store for SledStore {
    fn put_block(&self, block: &Block) -> Result<(), StoreError> {
        let mut b = self.new_batch();
        b.put_block(block.clone());
        b.commit()
    }

    fn get_block_by_hash(&self, hash: &Hash) -> Result<Option<Block>, StoreError> {
        self.get_raw(&block_hash_key(hash))?.map(|v| decode(&v)).transpose()
    }

    fn get_block_by_index(&self, shard_id: u32, index: u64) -> Result<Option<Block>, StoreError> {
        let Some(hash_bytes) = self.get_raw(&block_index_key(shard_id, index))? else {
            return Ok(None);
        };
        let hash = Hash::from_slice(&hash_bytes).ok_or_else(|| StoreError::Backend("corrupt hash index".into()))?;
        self.get_block_by_hash(&hash)
    }

    fn get_tip(&self, shard_id: u32) -> Result<Option<Block>, StoreError> {
        let Some(hash_bytes) = self.get_raw(&tip_key(shard_id))? else {
            return Ok(None);
        };
        let hash = Hash::from_slice(&hash_bytes).ok_or_else(|| StoreError::Backend("corrupt tip pointer".into()))?;
        self.get_block_by_hash(&hash)
    }

    fn put_tx(&self, tx: &Transaction) -> Result<(), StoreError> {
        let mut b = self.new_batch();
        b.put_tx(tx.clone());
        b.commit()
    }

    fn get_tx(&self, id: &Hash) -> Result<Option<Transaction>, StoreError> {
        self.get_raw(&tx_key(id))?.map(|v| decode(&v)).transpose()
    }

    fn txs_by_address(&self, addr: &Address) -> Result<Vec<Transaction>, StoreError> {
        let prefix = tx_addr_prefix(addr);
        let mut out = Vec::new();
        for entry in self.db.scan_prefix(&prefix) {
            let (key, _) = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
            let id_bytes = &key[prefix.len()..];
            if let Some(id) = Hash::from_slice(id_bytes) {
                if let Some(tx) = self.get_tx(&id)? {
                    out.push(tx);
                }
            }
        }
        Ok(out)
    }

    fn put_validator(&self, validator: &Validator) -> Result<(), StoreError> {
        let mut b = self.new_batch();
        b.put_validator(validator.clone());
        b.commit()
    }

    fn get_validator(&self, addr: &Address) -> Result<Option<Validator>, StoreError> {
        self.get_raw(&validator_key(addr))?.map(|v| decode(&v)).transpose()
    }

    fn all_validators(&self) -> Result<Vec<Validator>, StoreError> {
        let mut out = Vec::new();
        for entry in self.db.scan_prefix(b"val:") {
            let (_, value) = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    fn put_shard(&self, shard: &Shard) -> Result<(), StoreError> {
        let mut b = self.new_batch();
        b.put_shard(shard.clone());
        b.commit()
    }

    fn get_shard(&self, id: u32) -> Result<Option<Shard>, StoreError> {
        self.get_raw(&shard_key(id))?.map(|v| decode(&v)).transpose()
    }

    fn all_shards(&self) -> Result<Vec<Shard>, StoreError> {
        let mut out = Vec::new();
        for entry in self.db.scan_prefix(b"shard:") {
            let (_, value) = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    fn put_state(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut b = self.new_batch();
        b.set_state(key.to_string(), value.to_vec());
        b.commit()
    }

    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get_raw(&state_key(key))?.map(|v| v.to_vec()))
    }

    fn delete_state(&self, key: &str) -> Result<(), StoreError> {
        let mut b = self.new_batch();
        b.delete_state(key.to_string());
        b.commit()
    }

    fn new_batch(&self) -> Box<dyn Batch + '_> {
        Box::new(SledBatch { store: self, ops: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::TransactionKind;

    fn addr(b: u8) -> Address {
        Address([b; 20])
    }

    #[test]
    fn append_and_reopen_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledStore::open(dir.path()).unwrap();
            store
                .put_shard(&Shard {
                    id: 0,
                    validators: vec![addr(1)],
                    tip_hash: Hash::ZERO,
                    pending_cross_in: 0,
                    pending_cross_out: 0,
                    health: 1.0,
                })
                .unwrap();
            let genesis = Block::genesis(0, 1_700_000_000, addr(1));
            store.append_block(genesis, &[]).unwrap();
        }
        let reopened = SledStore::open(dir.path()).unwrap();
        let tip = reopened.get_tip(0).unwrap().unwrap();
        assert_eq!(tip.index, 0);
    }

    #[test]
    fn tx_roundtrip_and_address_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        let tx = Transaction::new_unsigned(addr(1), addr(2), 5, 1, vec![], 0, 0, 0, TransactionKind::Regular);
        store.put_tx(&tx).unwrap();
        assert_eq!(store.get_tx(&tx.id).unwrap().unwrap().id, tx.id);
        assert_eq!(store.txs_by_address(&addr(1)).unwrap().len(), 1);
        assert_eq!(store.txs_by_address(&addr(2)).unwrap().len(), 1);
    }
}
