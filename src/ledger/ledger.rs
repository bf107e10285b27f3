//! Commit engine: drains touched accounts into one atomic batch plus a
//! reversible journal.
//!
//! A [`Ledger`] owns the storage handle and the set of accounts touched
//! since the last block boundary. Execution reaches accounts through
//! [`Ledger::account`] (or the per-address convenience methods); at block
//! boundary [`Ledger::commit`] walks every touched account, assembles the
//! batch and the [`BlockJournal`], writes atomically, and refreshes the
//! working set from the now-persisted values. [`Ledger::rollback`] applies a
//! journal's pre-images to undo the latest committed block.
//!
//! The engine is single-writer by contract: the executor above serializes
//! block execution, and no internal locking is performed.

use crate::ledger::LedgerError;
use crate::ledger::account::Account;
use crate::ledger::journal::BlockJournal;
use crate::ledger::keys;
use crate::storage::storage_trait::{Storage, WriteBatch};
use crate::types::address::Address;
use crate::types::bytes::Bytes;
use crate::types::encoding::Encode;
use crate::types::hash::Hash;
use crate::{info, warn};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

/// Working set of touched accounts over a shared storage backend.
pub struct Ledger<S: Storage> {
    storage: Arc<S>,
    accounts: HashMap<Address, Account<S>>,
}

impl<S: Storage> Ledger<S> {
    /// Creates an empty ledger over the given storage.
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            accounts: HashMap::new(),
        }
    }

    /// Returns the working set for `addr`, creating it on first reference.
    ///
    /// Creation loads the persisted metadata record; an address never seen
    /// before starts with an absent origin.
    pub fn account(&mut self, addr: Address) -> Result<&mut Account<S>, LedgerError> {
        match self.accounts.entry(addr) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let account = Account::load(Arc::clone(&self.storage), addr)?;
                Ok(entry.insert(account))
            }
        }
    }

    /// Number of accounts touched since the last commit or clear.
    pub fn touched(&self) -> usize {
        self.accounts.len()
    }

    /// Reads a storage slot of `addr`.
    pub fn get_state(&mut self, addr: Address, key: &[u8]) -> Result<Option<Bytes>, LedgerError> {
        self.account(addr)?.get_state(key)
    }

    /// Writes a storage slot of `addr`; `None` deletes.
    pub fn set_state(
        &mut self,
        addr: Address,
        key: &[u8],
        value: Option<Bytes>,
    ) -> Result<(), LedgerError> {
        self.account(addr)?.set_state(key, value)
    }

    /// Returns the effective balance of `addr`.
    pub fn balance(&mut self, addr: Address) -> Result<u64, LedgerError> {
        Ok(self.account(addr)?.balance())
    }

    /// Sets the balance of `addr`.
    pub fn set_balance(&mut self, addr: Address, balance: u64) -> Result<(), LedgerError> {
        self.account(addr)?.set_balance(balance);
        Ok(())
    }

    /// Returns the effective nonce of `addr`.
    pub fn nonce(&mut self, addr: Address) -> Result<u64, LedgerError> {
        Ok(self.account(addr)?.nonce())
    }

    /// Sets the nonce of `addr`.
    pub fn set_nonce(&mut self, addr: Address, nonce: u64) -> Result<(), LedgerError> {
        self.account(addr)?.set_nonce(nonce);
        Ok(())
    }

    /// Returns the effective contract code of `addr`.
    pub fn code(&mut self, addr: Address) -> Result<Option<Bytes>, LedgerError> {
        self.account(addr)?.code()
    }

    /// Installs contract code for `addr`.
    pub fn set_code_and_hash(&mut self, addr: Address, code: Bytes) -> Result<(), LedgerError> {
        self.account(addr)?.set_code_and_hash(code);
        Ok(())
    }

    /// Commits every touched account in one atomic batch.
    ///
    /// Accounts are processed in ascending address order. Each modified
    /// account contributes a journal entry and its dirty data to the block's
    /// delta hash; the assembled [`BlockJournal`] is persisted in the same
    /// batch under the journal key for `height`. On success the working set
    /// is refreshed from the persisted values and stays cached for the next
    /// block. On error nothing is written and the caller should discard the
    /// working set.
    pub fn commit(&mut self, height: u64) -> Result<BlockJournal, LedgerError> {
        let mut batch = WriteBatch::new();

        let mut addrs: Vec<Address> = self.accounts.keys().copied().collect();
        addrs.sort();

        let mut entries = Vec::new();
        let mut delta = Vec::new();
        for addr in addrs {
            let Some(account) = self.accounts.get_mut(&addr) else {
                continue;
            };
            if let Some(entry) = account.journal_if_modified(&mut batch)? {
                delta.extend_from_slice(&account.dirty_data());
                entries.push(entry);
            }
        }

        let journal = BlockJournal {
            height,
            delta_hash: Hash::sha256().chain(&delta).finalize(),
            entries,
        };
        batch.put(keys::journal_key(height), journal.to_bytes());

        self.storage.write_batch(batch)?;

        for account in self.accounts.values_mut() {
            account.finalise();
        }

        info!(
            "committed height={} touched={} modified={} delta={}",
            height,
            self.accounts.len(),
            journal.entries.len(),
            journal.delta_hash
        );

        Ok(journal)
    }

    /// Reverses one committed block by re-applying its pre-images.
    ///
    /// Entries are undone in reverse commit order and the persisted journal
    /// record is removed, all in one atomic batch. The working set is
    /// cleared afterwards: cached origin layers no longer match storage.
    pub fn rollback(&mut self, journal: &BlockJournal) -> Result<(), LedgerError> {
        let mut batch = WriteBatch::new();
        for entry in journal.entries.iter().rev() {
            entry.revert(&mut batch)?;
        }
        batch.delete(keys::journal_key(journal.height));

        self.storage.write_batch(batch)?;
        self.accounts.clear();

        warn!(
            "rolled back height={} entries={}",
            journal.height,
            journal.entries.len()
        );

        Ok(())
    }

    /// Loads the journal persisted for the block at `height`, if any.
    pub fn journal_at(&self, height: u64) -> Result<Option<BlockJournal>, LedgerError> {
        match self.storage.get(&keys::journal_key(height))? {
            Some(data) => Ok(Some(BlockJournal::from_stored(&data)?)),
            None => Ok(None),
        }
    }

    /// Abandons the working set without touching storage.
    ///
    /// All staged dirt is dropped; nothing observable happens.
    pub fn clear(&mut self) {
        self.accounts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::account::InnerAccount;
    use crate::storage::memory_storage::test::MemStorage;
    use crate::types::encoding::Decode;
    use crate::utils::test_utils::utils::unique_address;

    fn fresh() -> (Arc<MemStorage>, Ledger<MemStorage>) {
        let storage = Arc::new(MemStorage::new());
        let ledger = Ledger::new(Arc::clone(&storage));
        (storage, ledger)
    }

    #[test]
    fn account_is_created_once_per_address() {
        let (_storage, mut ledger) = fresh();
        let addr = unique_address();

        ledger.set_balance(addr, 10).unwrap();
        ledger.set_nonce(addr, 3).unwrap();

        assert_eq!(ledger.touched(), 1);
        assert_eq!(ledger.balance(addr).unwrap(), 10);
        assert_eq!(ledger.nonce(addr).unwrap(), 3);
    }

    #[test]
    fn commit_writes_accounts_slots_and_journal() {
        let (storage, mut ledger) = fresh();
        let addr = unique_address();

        ledger.set_balance(addr, 100).unwrap();
        ledger
            .set_state(addr, &[0x10], Some(Bytes::from([0xAAu8])))
            .unwrap();

        let journal = ledger.commit(1).unwrap();

        assert_eq!(journal.height, 1);
        assert_eq!(journal.entries.len(), 1);
        assert!(journal.entries[0].account_changed);

        let record = storage.entry(&keys::account_key(&addr)).unwrap();
        assert_eq!(InnerAccount::from_bytes(&record).unwrap().balance, 100);
        assert_eq!(
            storage.entry(&keys::slot_key(&addr, &[0x10])),
            Some(vec![0xAA])
        );
        assert!(storage.entry(&keys::journal_key(1)).is_some());
    }

    #[test]
    fn journal_at_roundtrips_persisted_journal() {
        let (_storage, mut ledger) = fresh();
        let addr = unique_address();

        ledger.set_balance(addr, 42).unwrap();
        let committed = ledger.commit(7).unwrap();

        let loaded = ledger.journal_at(7).unwrap().expect("journal expected");
        assert_eq!(loaded, committed);
        assert!(ledger.journal_at(8).unwrap().is_none());
    }

    #[test]
    fn commit_keeps_working_set_readable_without_new_loads() {
        let (storage, mut ledger) = fresh();
        let addr = unique_address();

        ledger.set_balance(addr, 5).unwrap();
        ledger.commit(1).unwrap();

        let calls = storage.get_calls();
        assert_eq!(ledger.balance(addr).unwrap(), 5);
        assert_eq!(storage.get_calls(), calls);
    }

    #[test]
    fn rollback_restores_prior_storage_and_drops_journal() {
        let (storage, mut ledger) = fresh();
        let a = unique_address();
        let b = unique_address();

        // Block 1 establishes a baseline.
        ledger.set_balance(a, 10).unwrap();
        ledger
            .set_state(a, &[0x01], Some(Bytes::from([0x01u8])))
            .unwrap();
        ledger.commit(1).unwrap();

        let baseline_keys = storage.keys();

        // Block 2 mutates both accounts.
        ledger.set_balance(a, 20).unwrap();
        ledger
            .set_state(a, &[0x01], Some(Bytes::from([0x02u8])))
            .unwrap();
        ledger.set_balance(b, 7).unwrap();
        ledger
            .set_state(b, &[0x02], Some(Bytes::from([0x03u8])))
            .unwrap();
        let journal = ledger.commit(2).unwrap();

        ledger.rollback(&journal).unwrap();

        assert_eq!(storage.keys(), baseline_keys);
        let record = storage.entry(&keys::account_key(&a)).unwrap();
        assert_eq!(InnerAccount::from_bytes(&record).unwrap().balance, 10);
        assert_eq!(
            storage.entry(&keys::slot_key(&a, &[0x01])),
            Some(vec![0x01])
        );
        assert_eq!(storage.entry(&keys::account_key(&b)), None);
        assert_eq!(storage.entry(&keys::journal_key(2)), None);

        // The working set was cleared; reads reload from storage.
        assert_eq!(ledger.touched(), 0);
        assert_eq!(ledger.balance(a).unwrap(), 10);
    }

    #[test]
    fn delta_hash_is_independent_of_executor_op_order() {
        let a = Address([1u8; 20]);
        let b = Address([2u8; 20]);

        // Disjoint writes; any execution order yields the same final state.
        let ops: Vec<(Address, &[u8], u8)> = vec![
            (a, &[0x02], 0x02),
            (b, &[0x01], 0x01),
            (a, &[0x01], 0x0A),
            (b, &[0x02], 0x0B),
        ];

        let run = |reversed: bool| {
            let storage = Arc::new(MemStorage::new());
            let mut ledger = Ledger::new(storage);

            let ordered: Vec<_> = if reversed {
                ops.iter().rev().collect()
            } else {
                ops.iter().collect()
            };
            for (addr, key, value) in ordered {
                ledger
                    .set_state(*addr, key, Some(Bytes::from(vec![*value])))
                    .unwrap();
            }
            ledger.set_balance(a, 1).unwrap();
            ledger.set_balance(b, 2).unwrap();

            ledger.commit(1).unwrap().delta_hash
        };

        assert_eq!(run(false), run(true));
    }

    #[test]
    fn clear_abandons_staged_writes() {
        let (storage, mut ledger) = fresh();
        let addr = unique_address();

        ledger.set_balance(addr, 99).unwrap();
        ledger
            .set_state(addr, &[0x01], Some(Bytes::from([0x01u8])))
            .unwrap();
        ledger.clear();

        assert_eq!(ledger.touched(), 0);
        // Nothing reached storage.
        assert_eq!(storage.len(), 0);

        // A later commit writes only the (empty) journal record.
        let journal = ledger.commit(1).unwrap();
        assert!(journal.entries.is_empty());
        assert_eq!(storage.keys(), vec![keys::journal_key(1)]);
    }

    #[test]
    fn empty_commit_has_empty_delta() {
        let (_storage, mut ledger) = fresh();

        let journal = ledger.commit(1).unwrap();

        assert!(journal.entries.is_empty());
        assert_eq!(journal.delta_hash, Hash::sha256().finalize());
    }

    #[test]
    fn read_only_accounts_emit_no_entries() {
        let (storage, mut ledger) = fresh();
        let addr = unique_address();

        // Seed and commit via a first block.
        ledger.set_balance(addr, 10).unwrap();
        ledger.commit(1).unwrap();
        let keys_after_first = storage.keys();

        // Second block only reads.
        assert_eq!(ledger.balance(addr).unwrap(), 10);
        assert!(ledger.get_state(addr, &[0x05]).unwrap().is_none());
        let journal = ledger.commit(2).unwrap();

        assert!(journal.entries.is_empty());
        // Only the journal record for height 2 was added.
        let mut expected = keys_after_first;
        expected.push(keys::journal_key(2));
        expected.sort();
        assert_eq!(storage.keys(), expected);
    }
}
