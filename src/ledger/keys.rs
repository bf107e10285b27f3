//! Composite key layout for ledger data.
//!
//! Three disjoint namespaces share one keyspace:
//!
//! - account metadata: `"a-"` followed by the 40-char hex address
//! - contract code: `"c-"` followed by the 40-char hex address
//! - storage slots: the 20 raw address bytes followed by the raw slot key
//!
//! The slot namespace uses the binary address form while the others use an
//! ASCII-prefixed hex form, so no slot key can collide with a metadata or
//! code key. Block journals get a fourth namespace, `"j-"` followed by the
//! big-endian block height.

use crate::types::address::Address;

/// Namespace marker for account metadata records.
pub const ACCOUNT_PREFIX: &str = "a-";
/// Namespace marker for contract code.
pub const CODE_PREFIX: &str = "c-";
/// Namespace marker for persisted block journals.
pub const JOURNAL_PREFIX: &str = "j-";

/// Key of an account's metadata record: `"a-<hex-address>"`.
pub fn account_key(addr: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(ACCOUNT_PREFIX.len() + 40);
    key.extend_from_slice(ACCOUNT_PREFIX.as_bytes());
    key.extend_from_slice(addr.hex().as_bytes());
    key
}

/// Key of an account's contract code: `"c-<hex-address>"`.
pub fn code_key(addr: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(CODE_PREFIX.len() + 40);
    key.extend_from_slice(CODE_PREFIX.as_bytes());
    key.extend_from_slice(addr.hex().as_bytes());
    key
}

/// Key of one storage slot: raw address bytes followed by the raw slot key.
pub fn slot_key(addr: &Address, slot: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(addr.as_slice().len() + slot.len());
    key.extend_from_slice(addr.as_slice());
    key.extend_from_slice(slot);
    key
}

/// Key of the journal persisted for the block at `height`.
pub fn journal_key(height: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(JOURNAL_PREFIX.len() + 8);
    key.extend_from_slice(JOURNAL_PREFIX.as_bytes());
    key.extend_from_slice(&height.to_be_bytes());
    key
}
