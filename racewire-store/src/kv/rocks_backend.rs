//! RocksDB key-value backend for production use.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{IteratorMode, Options, DB};

use super::{BatchOp, KvBackend, PrefixIterator, WriteBatch};
use crate::error::StoreError;

/// RocksDB-based key-value backend.
///
/// The dataset is a single small race state plus an append-only log, so the
/// database is tuned for durability rather than throughput.
pub struct RocksBackend {
    db: Arc<DB>,
}

impl RocksBackend {
    /// Open or create a RocksDB database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Get estimated number of keys in the database.
    pub fn estimate_num_keys(&self) -> Option<u64> {
        self.db
            .property_int_value("rocksdb.estimate-num-keys")
            .ok()
            .flatten()
    }
}

impl KvBackend for RocksBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key)?)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db.put(key, value)?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.db.delete(key)?;
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut rocks_batch = rocksdb::WriteBatch::default();
        for op in batch.operations {
            match op {
                BatchOp::Put { key, value } => {
                    rocks_batch.put(&key, &value);
                }
                BatchOp::Delete { key } => {
                    rocks_batch.delete(&key);
                }
            }
        }
        self.db.write(rocks_batch)?;
        Ok(())
    }

    fn prefix_iterator(&self, prefix: &[u8]) -> Result<PrefixIterator<'_>, StoreError> {
        let prefix_vec = prefix.to_vec();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, rocksdb::Direction::Forward));

        let prefix_iter = iter
            .map(|result| result.map(|(k, v)| (k.to_vec(), v.to_vec())))
            .take_while(move |result| match result {
                Ok((k, _)) => k.starts_with(&prefix_vec),
                Err(_) => false,
            })
            .filter_map(|result| result.ok());

        Ok(Box::new(prefix_iter))
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}
