//! RocksDB-backed key-value storage.
//!
//! Production [`Storage`] implementation. Batches are accumulated into a
//! native `rocksdb::WriteBatch` and committed with a single `DB::write`,
//! which RocksDB applies atomically. Range scans use a read-options upper
//! bound so the cursor never walks past the requested range.

use crate::info;
use crate::storage::storage_trait::{KvPair, Storage, StorageError, WriteBatch};
use rocksdb::{DB, Direction, IteratorMode, Options, ReadOptions};
use std::path::Path;
use std::sync::Arc;

/// RocksDB-backed storage for ledger state.
pub struct RocksDbStorage {
    db: Arc<DB>,
}

impl RocksDbStorage {
    /// Opens (or creates) a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path).map_err(|e| StorageError::Backend(e.to_string()))?;
        info!("opened ledger database at {}", path.display());

        Ok(Self { db: Arc::new(db) })
    }

    /// Wraps an already-open database handle.
    pub fn with_db(db: Arc<DB>) -> Self {
        Self { db }
    }
}

impl Storage for RocksDbStorage {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.db
            .get(key)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn iter<'a>(
        &'a self,
        begin: &[u8],
        end: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = Result<KvPair, StorageError>> + 'a> {
        let mut read_opts = ReadOptions::default();
        if let Some(end) = end {
            read_opts.set_iterate_upper_bound(end.to_vec());
        }

        let iter = self
            .db
            .iterator_opt(IteratorMode::From(begin, Direction::Forward), read_opts);

        Box::new(iter.map(|item| {
            item.map(|(key, value)| (key.into_vec(), value.into_vec()))
                .map_err(|e| StorageError::Backend(e.to_string()))
        }))
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut native = rocksdb::WriteBatch::default();
        for (key, value) in batch.into_ops() {
            match value {
                Some(value) => native.put(key, value),
                None => native.delete(key),
            }
        }

        self.db
            .write(native)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}
