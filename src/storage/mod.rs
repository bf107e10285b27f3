//! Key-value storage subsystem.
//!
//! This module provides the storage abstraction the ledger core writes
//! through, and its implementations:
//!
//! - [`storage_trait`]: the [`Storage`](storage_trait::Storage) contract
//!   (point get, bounded range scan, atomic [`WriteBatch`](storage_trait::WriteBatch))
//!   and the prefix bound helper for range scans
//! - [`rocksdb_storage`]: production RocksDB-backed implementation
//! - [`memory_storage`]: in-memory implementation for testing

pub mod memory_storage;
pub mod rocksdb_storage;
pub mod storage_trait;
