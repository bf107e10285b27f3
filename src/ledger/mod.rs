//! Account-state staging layer.
//!
//! The modules here form the working set that sits between transaction
//! execution and the key-value store:
//!
//! - [`account`]: the per-address working set - origin/dirty layers for
//!   metadata, contract code, and storage slots
//! - [`journal`]: pre-images captured at commit time, sufficient to reverse
//!   a block
//! - [`ledger`]: the commit engine that drains touched accounts into one
//!   atomic batch and a journal
//! - [`keys`]: the composite key layout shared by all of the above
//!
//! Nothing below the commit engine is aware of transactions or blocks.

pub mod account;
pub mod journal;
pub mod keys;
#[allow(clippy::module_inception)]
pub mod ledger;

use crate::storage::storage_trait::StorageError;
use crate::types::encoding::DecodeError;
use ledger_derive::Error;

/// Errors surfaced by the staging layer.
///
/// Read paths absorb key absence locally; anything reaching the caller
/// through this type means the working set can no longer be trusted and the
/// block should be abandoned.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The storage backend failed.
    #[error("{0}")]
    Storage(String),
    /// A dirty-state key was not valid hex. Keys are produced by the state
    /// setters, so this indicates corrupt in-memory state.
    #[error("invalid slot key in working set: {0}")]
    InvalidSlotKey(String),
    /// A persisted record failed to decode.
    #[error("corrupt persisted record: {0}")]
    Decode(String),
}

impl From<StorageError> for LedgerError {
    fn from(value: StorageError) -> Self {
        LedgerError::Storage(value.to_string())
    }
}

impl From<DecodeError> for LedgerError {
    fn from(value: DecodeError) -> Self {
        LedgerError::Decode(value.to_string())
    }
}
