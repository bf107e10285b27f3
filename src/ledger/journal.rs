//! Commit pre-images for reversing ledger state.
//!
//! Each committed block produces a [`BlockJournal`] holding one
//! [`AccountJournal`] per modified address. An entry records the previous
//! metadata, code, and slot values for everything the commit wrote, which is
//! exactly what is needed to stage the inverse batch. Journals are persisted
//! in the commit batch itself (under the `"j-"` namespace), so a block stays
//! reversible after a restart.

use crate::ledger::LedgerError;
use crate::ledger::account::InnerAccount;
use crate::ledger::keys;
use crate::storage::storage_trait::WriteBatch;
use crate::types::address::Address;
use crate::types::bytes::Bytes;
use crate::types::encoding::{Decode, Encode};
use crate::types::hash::Hash;
use ledger_derive::BinaryCodec;

/// Pre-image of a single storage slot.
///
/// `key` is the hex form of the slot key; `prev` is the value before the
/// commit, or `None` if the slot did not exist.
#[derive(BinaryCodec, Clone, Debug, PartialEq, Eq)]
pub struct SlotPreimage {
    pub key: String,
    pub prev: Option<Bytes>,
}

/// Pre-images of one account's changes within a single commit.
///
/// Constructed only by the commit path; immutable once produced.
#[derive(BinaryCodec, Clone, Debug, PartialEq, Eq)]
pub struct AccountJournal {
    pub address: Address,
    pub account_changed: bool,
    pub prev_account: Option<InnerAccount>,
    pub code_changed: bool,
    pub prev_code: Option<Bytes>,
    /// Changed slots with their pre-images, sorted by hex key.
    pub prev_states: Vec<SlotPreimage>,
}

impl AccountJournal {
    pub(crate) fn new(address: Address) -> Self {
        Self {
            address,
            account_changed: false,
            prev_account: None,
            code_changed: false,
            prev_code: None,
            prev_states: Vec::new(),
        }
    }

    /// Returns true if the entry records no changes at all.
    pub fn is_empty(&self) -> bool {
        !self.account_changed && !self.code_changed && self.prev_states.is_empty()
    }

    /// Stages the inverse of this entry's changes into `batch`.
    ///
    /// Re-applies every pre-image under the same key convention the commit
    /// used: absent pre-images become deletes, present ones become puts.
    pub fn revert(&self, batch: &mut WriteBatch) -> Result<(), LedgerError> {
        if self.account_changed {
            match &self.prev_account {
                Some(account) => batch.put(keys::account_key(&self.address), account.to_bytes()),
                None => batch.delete(keys::account_key(&self.address)),
            }
        }

        if self.code_changed {
            match &self.prev_code {
                Some(code) => batch.put(keys::code_key(&self.address), code.to_vec()),
                None => batch.delete(keys::code_key(&self.address)),
            }
        }

        for slot in &self.prev_states {
            let raw_key = hex::decode(&slot.key)
                .map_err(|_| LedgerError::InvalidSlotKey(slot.key.clone()))?;
            let key = keys::slot_key(&self.address, &raw_key);
            match &slot.prev {
                Some(value) => batch.put(key, value.to_vec()),
                None => batch.delete(key),
            }
        }

        Ok(())
    }
}

/// All pre-images recorded for one committed block.
///
/// Entries are in commit (ascending address) order; reversal walks them
/// back-to-front. `delta_hash` fingerprints the block's state delta: SHA-256
/// over the concatenated dirty data of every modified account.
#[derive(BinaryCodec, Clone, Debug, PartialEq, Eq)]
pub struct BlockJournal {
    pub height: u64,
    pub delta_hash: Hash,
    pub entries: Vec<AccountJournal>,
}

impl BlockJournal {
    /// Decodes a journal previously persisted under its journal key.
    pub fn from_stored(data: &[u8]) -> Result<Self, LedgerError> {
        Ok(Self::from_bytes(data)?)
    }
}
