//! Per-address working set: origin/dirty staging for account metadata,
//! contract code, and storage slots.
//!
//! An [`Account`] buffers every read and write an executor makes against one
//! address during a block. Reads fall through dirty layer, origin layer,
//! then the store, caching what they learn (including absence). Writes land
//! in the dirty layer only, so abandoning the working set has no side
//! effects. At block boundary [`Account::journal_if_modified`] drains the
//! dirty layer into a write batch and captures the pre-images needed to
//! reverse it.

use crate::ledger::LedgerError;
use crate::ledger::journal::{AccountJournal, SlotPreimage};
use crate::ledger::keys;
use crate::storage::storage_trait::{Storage, WriteBatch, bytes_prefix};
use crate::types::address::Address;
use crate::types::bytes::Bytes;
use crate::types::encoding::{Decode, Encode};
use crate::types::hash::Hash;
use ledger_derive::BinaryCodec;
use std::collections::HashMap;
use std::sync::Arc;

/// Canonical per-address record persisted under the account composite key.
///
/// Encoded with the crate's deterministic binary codec, so equal records
/// always marshal to identical bytes. A zero `code_hash` means the account
/// holds no contract code.
#[derive(BinaryCodec, Clone, Debug, PartialEq, Eq, Default)]
pub struct InnerAccount {
    /// Monotonic counter of successful transactions from this account.
    pub nonce: u64,
    /// Spendable balance denominated in the native currency.
    pub balance: u64,
    /// SHA-256 of the deployed contract bytecode, or zero for plain accounts.
    pub code_hash: Hash,
}

impl InnerAccount {
    /// Returns true if this record advertises contract code.
    pub fn has_code(&self) -> bool {
        self.code_hash != Hash::zero()
    }
}

/// Compares two optional records under the commit's change rules.
///
/// An absent dirty record means the account was never written, so nothing
/// changed regardless of the origin. A present dirty record changed the
/// account unless an origin exists and all three fields match.
pub(crate) fn inner_account_changed(
    origin: Option<&InnerAccount>,
    dirty: Option<&InnerAccount>,
) -> bool {
    match (origin, dirty) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(origin), Some(dirty)) => origin != dirty,
    }
}

/// In-memory working set for one address.
///
/// `origin_*` fields hold what storage last said (with `None` map entries
/// marking keys known to be absent) and are written only by the read-through
/// paths; `dirty_*` fields hold pending modifications. Origin records are
/// never mutated in place, which keeps them valid as journal pre-images.
///
/// Not internally synchronized: callers sharing an account across threads
/// must serialize access externally.
pub struct Account<S: Storage> {
    addr: Address,
    storage: Arc<S>,
    origin_account: Option<InnerAccount>,
    dirty_account: Option<InnerAccount>,
    /// Read-through cache of persisted slots, keyed by hex slot key.
    /// `None` values mark slots known to be absent from storage.
    origin_state: HashMap<String, Option<Bytes>>,
    /// Pending slot writes, keyed by hex slot key. `None` is a tombstone.
    dirty_state: HashMap<String, Option<Bytes>>,
    origin_code: Option<Bytes>,
    dirty_code: Option<Bytes>,
    dirty_state_hash: Hash,
}

impl<S: Storage> Account<S> {
    /// Creates an empty working set for `addr`.
    pub fn new(storage: Arc<S>, addr: Address) -> Self {
        Self {
            addr,
            storage,
            origin_account: None,
            dirty_account: None,
            origin_state: HashMap::new(),
            dirty_state: HashMap::new(),
            origin_code: None,
            dirty_code: None,
            dirty_state_hash: Hash::zero(),
        }
    }

    /// Creates a working set and loads the persisted metadata record.
    ///
    /// A missing record leaves the origin absent; that is the normal state
    /// for an address never seen before.
    pub fn load(storage: Arc<S>, addr: Address) -> Result<Self, LedgerError> {
        let mut account = Self::new(storage, addr);
        if let Some(data) = account.storage.get(&keys::account_key(&addr))? {
            account.origin_account = Some(InnerAccount::from_bytes(&data)?);
        }
        Ok(account)
    }

    /// Returns the address this working set stages.
    pub fn address(&self) -> Address {
        self.addr
    }

    /// Hash computed by the last commit pass over this account's changed
    /// slots; the hash of the empty string if none changed.
    pub fn dirty_state_hash(&self) -> Hash {
        self.dirty_state_hash
    }

    /// Reads a storage slot: dirty layer, then origin layer, then the store.
    ///
    /// A store miss caches an absent marker so the next read of the same
    /// key issues no further storage call. `None` means the slot does not
    /// exist (or was deleted in this block).
    pub fn get_state(&mut self, key: &[u8]) -> Result<Option<Bytes>, LedgerError> {
        let hex_key = hex::encode(key);

        if let Some(value) = self.dirty_state.get(&hex_key) {
            return Ok(value.clone());
        }

        if let Some(value) = self.origin_state.get(&hex_key) {
            return Ok(value.clone());
        }

        let value = self
            .storage
            .get(&keys::slot_key(&self.addr, key))?
            .map(Bytes::from);
        self.origin_state.insert(hex_key, value.clone());

        Ok(value)
    }

    /// Writes a storage slot into the dirty layer.
    ///
    /// The slot is read first so the origin snapshot always holds a
    /// pre-image for every dirty key. `None` (or an empty value, which is
    /// normalized to `None`) deletes the slot.
    pub fn set_state(&mut self, key: &[u8], value: Option<Bytes>) -> Result<(), LedgerError> {
        self.get_state(key)?;
        let value = value.filter(|v| !v.is_empty());
        self.dirty_state.insert(hex::encode(key), value);
        Ok(())
    }

    /// Installs contract code, recording its hash in the pending metadata.
    pub fn set_code_and_hash(&mut self, code: Bytes) {
        let hash = Hash::sha256().chain(&code).finalize();
        self.dirty_account_mut().code_hash = hash;
        self.dirty_code = Some(code);
    }

    /// Returns the effective contract code.
    ///
    /// Dirty code wins over origin code; with neither present the store is
    /// consulted, but only if the effective code hash is non-zero. A store
    /// hit populates the origin copy.
    pub fn code(&mut self) -> Result<Option<Bytes>, LedgerError> {
        if let Some(code) = &self.dirty_code {
            return Ok(Some(code.clone()));
        }

        if let Some(code) = &self.origin_code {
            return Ok(Some(code.clone()));
        }

        if self.code_hash() == Hash::zero() {
            return Ok(None);
        }

        match self.storage.get(&keys::code_key(&self.addr))? {
            Some(code) => {
                let code = Bytes::from(code);
                self.origin_code = Some(code.clone());
                Ok(Some(code))
            }
            None => Ok(None),
        }
    }

    /// Returns the effective code hash: dirty record first, then origin,
    /// zero if neither exists.
    pub fn code_hash(&self) -> Hash {
        if let Some(dirty) = &self.dirty_account {
            return dirty.code_hash;
        }
        if let Some(origin) = &self.origin_account {
            return origin.code_hash;
        }
        Hash::zero()
    }

    /// Returns the effective nonce, zero if the account has no record.
    pub fn nonce(&self) -> u64 {
        if let Some(dirty) = &self.dirty_account {
            return dirty.nonce;
        }
        if let Some(origin) = &self.origin_account {
            return origin.nonce;
        }
        0
    }

    /// Sets the nonce on the pending metadata record.
    pub fn set_nonce(&mut self, nonce: u64) {
        self.dirty_account_mut().nonce = nonce;
    }

    /// Returns the effective balance, zero if the account has no record.
    pub fn balance(&self) -> u64 {
        if let Some(dirty) = &self.dirty_account {
            return dirty.balance;
        }
        if let Some(origin) = &self.origin_account {
            return origin.balance;
        }
        0
    }

    /// Sets the balance on the pending metadata record.
    pub fn set_balance(&mut self, balance: u64) {
        self.dirty_account_mut().balance = balance;
    }

    /// Scans committed slot values whose slot key starts with `prefix`.
    ///
    /// This is a read-committed view for administrative queries: it walks
    /// the store directly and does not see writes staged in the dirty layer
    /// of the current block.
    pub fn query(&self, prefix: &[u8]) -> Result<Vec<Bytes>, LedgerError> {
        let scan = keys::slot_key(&self.addr, prefix);
        let (begin, end) = bytes_prefix(&scan);

        let mut values = Vec::new();
        for item in self.storage.iter(&begin, end.as_deref()) {
            let (_key, value) = item?;
            values.push(Bytes::from(value));
        }

        Ok(values)
    }

    /// Drains this account's dirty layer into `batch` and returns the
    /// journal entry reversing it, or `None` if nothing changed.
    ///
    /// Batch order is fixed: metadata put, code put, then slot operations in
    /// sorted hex-key order. Also refreshes [`Account::dirty_state_hash`].
    pub fn journal_if_modified(
        &mut self,
        batch: &mut WriteBatch,
    ) -> Result<Option<AccountJournal>, LedgerError> {
        let mut entry = AccountJournal::new(self.addr);

        if inner_account_changed(self.origin_account.as_ref(), self.dirty_account.as_ref()) {
            // Guarded by the change check; dirty is always present here.
            if let Some(dirty) = &self.dirty_account {
                batch.put(keys::account_key(&self.addr), dirty.to_bytes());
                entry.account_changed = true;
                entry.prev_account = self.origin_account.clone();
            }
        }

        if let Some(dirty_code) = self.dirty_code.clone() {
            // Fault in the persisted code so the diff below compares against
            // what is actually on disk and the journal records a pre-image.
            if self.origin_code.is_none()
                && self.origin_account.as_ref().is_some_and(|a| a.has_code())
            {
                self.origin_code = self
                    .storage
                    .get(&keys::code_key(&self.addr))?
                    .map(Bytes::from);
            }

            if self.origin_code.as_ref() != Some(&dirty_code) {
                batch.put(keys::code_key(&self.addr), dirty_code.to_vec());
                entry.code_changed = true;
                entry.prev_code = self.origin_code.clone();
            }
        }

        entry.prev_states = self.flush_dirty_slots(batch)?;

        if entry.is_empty() {
            Ok(None)
        } else {
            Ok(Some(entry))
        }
    }

    /// Stages changed slots into `batch`, collects their pre-images, and
    /// recomputes the dirty-state hash.
    ///
    /// The hash input is the concatenation `key1 || value1 || key2 || ...`
    /// over changed slots in sorted hex-key order, with keys contributing
    /// their hex form and tombstoned slots contributing no value bytes.
    fn flush_dirty_slots(
        &mut self,
        batch: &mut WriteBatch,
    ) -> Result<Vec<SlotPreimage>, LedgerError> {
        let mut changed: Vec<(&String, &Option<Bytes>)> = self
            .dirty_state
            .iter()
            .filter(|(key, value)| {
                let origin = self.origin_state.get(*key).and_then(|v| v.as_ref());
                origin != value.as_ref()
            })
            .collect();
        changed.sort_by(|a, b| a.0.cmp(b.0));

        let mut prev_states = Vec::with_capacity(changed.len());
        let mut hash_input = Vec::new();

        for (key, value) in changed {
            let raw_key =
                hex::decode(key).map_err(|_| LedgerError::InvalidSlotKey(key.clone()))?;
            let slot = keys::slot_key(&self.addr, &raw_key);

            match value {
                Some(value) => batch.put(slot, value.to_vec()),
                None => batch.delete(slot),
            }

            prev_states.push(SlotPreimage {
                key: key.clone(),
                prev: self.origin_state.get(key).cloned().flatten(),
            });

            hash_input.extend_from_slice(key.as_bytes());
            if let Some(value) = value {
                hash_input.extend_from_slice(value);
            }
        }

        self.dirty_state_hash = Hash::sha256().chain(&hash_input).finalize();

        Ok(prev_states)
    }

    /// Returns this account's contribution to the block's state delta:
    /// address bytes, the marshaled pending record if any, and the
    /// dirty-state hash from the last commit pass.
    pub fn dirty_data(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(self.addr.as_slice());

        if let Some(dirty) = &self.dirty_account {
            data.extend_from_slice(&dirty.to_bytes());
        }

        data.extend_from_slice(self.dirty_state_hash.as_slice());
        data
    }

    /// Promotes the dirty layer into the origin layer after a successful
    /// commit, so the working set reflects the now-persisted state.
    pub fn finalise(&mut self) {
        if let Some(dirty) = self.dirty_account.take() {
            self.origin_account = Some(dirty);
        }
        for (key, value) in self.dirty_state.drain() {
            self.origin_state.insert(key, value);
        }
        if let Some(code) = self.dirty_code.take() {
            self.origin_code = Some(code);
        }
    }

    /// Returns the pending metadata record, cloning the origin (or starting
    /// from a zero record) on first write.
    fn dirty_account_mut(&mut self) -> &mut InnerAccount {
        let origin = self.origin_account.clone();
        self.dirty_account
            .get_or_insert_with(|| origin.unwrap_or_default())
    }
}
