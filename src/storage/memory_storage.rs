#[cfg(test)]
pub mod test {
    use crate::storage::storage_trait::{KvPair, Storage, StorageError, WriteBatch};
    use std::collections::BTreeMap;
    use std::ops::Bound;
    use std::sync::RwLock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory storage for tests.
    ///
    /// Keeps entries in a `BTreeMap` so range scans come out in key order,
    /// and counts `get` calls so read-through caching behavior can be
    /// asserted. Not suitable for production due to memory constraints.
    pub struct MemStorage {
        entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
        get_calls: AtomicUsize,
    }

    impl MemStorage {
        pub fn new() -> Self {
            Self {
                entries: RwLock::new(BTreeMap::new()),
                get_calls: AtomicUsize::new(0),
            }
        }

        /// Number of `get` calls issued against this store.
        pub fn get_calls(&self) -> usize {
            self.get_calls.load(Ordering::Relaxed)
        }

        /// Direct lookup bypassing the `get` counter.
        pub fn entry(&self, key: &[u8]) -> Option<Vec<u8>> {
            self.entries.read().unwrap().get(key).cloned()
        }

        /// All stored keys in order.
        pub fn keys(&self) -> Vec<Vec<u8>> {
            self.entries.read().unwrap().keys().cloned().collect()
        }

        /// Seeds an entry without going through a batch.
        pub fn seed(&self, key: Vec<u8>, value: Vec<u8>) {
            self.entries.write().unwrap().insert(key, value);
        }

        /// Number of stored entries.
        pub fn len(&self) -> usize {
            self.entries.read().unwrap().len()
        }
    }

    impl Storage for MemStorage {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
            self.get_calls.fetch_add(1, Ordering::Relaxed);
            Ok(self.entries.read().unwrap().get(key).cloned())
        }

        fn iter<'a>(
            &'a self,
            begin: &[u8],
            end: Option<&[u8]>,
        ) -> Box<dyn Iterator<Item = Result<KvPair, StorageError>> + 'a> {
            let upper = match end {
                Some(end) => Bound::Excluded(end.to_vec()),
                None => Bound::Unbounded,
            };
            // Snapshot the range eagerly; the lock is not held while the
            // caller drains the iterator.
            let entries: Vec<KvPair> = self
                .entries
                .read()
                .unwrap()
                .range((Bound::Included(begin.to_vec()), upper))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            Box::new(entries.into_iter().map(Ok))
        }

        fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
            let mut entries = self.entries.write().unwrap();
            for (key, value) in batch.into_ops() {
                match value {
                    Some(value) => {
                        entries.insert(key, value);
                    }
                    None => {
                        entries.remove(&key);
                    }
                }
            }
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn get_counts_calls() {
            let storage = MemStorage::new();
            storage.seed(vec![1], vec![0xAA]);

            assert_eq!(storage.get_calls(), 0);
            assert_eq!(storage.get(&[1]).unwrap(), Some(vec![0xAA]));
            assert_eq!(storage.get(&[2]).unwrap(), None);
            assert_eq!(storage.get_calls(), 2);
        }

        #[test]
        fn batch_put_and_delete() {
            let storage = MemStorage::new();
            storage.seed(vec![1], vec![0xAA]);

            let mut batch = WriteBatch::new();
            batch.delete(vec![1]);
            batch.put(vec![2], vec![0xBB]);
            storage.write_batch(batch).unwrap();

            assert_eq!(storage.entry(&[1]), None);
            assert_eq!(storage.entry(&[2]), Some(vec![0xBB]));
            assert_eq!(storage.len(), 1);
        }

        #[test]
        fn iter_is_ordered_and_bounded() {
            let storage = MemStorage::new();
            storage.seed(vec![0x01], vec![1]);
            storage.seed(vec![0x02, 0x05], vec![2]);
            storage.seed(vec![0x02, 0x09], vec![3]);
            storage.seed(vec![0x03], vec![4]);

            let entries: Vec<KvPair> = storage
                .iter(&[0x02], Some(&[0x03]))
                .collect::<Result<_, _>>()
                .unwrap();

            assert_eq!(
                entries,
                vec![
                    (vec![0x02, 0x05], vec![2]),
                    (vec![0x02, 0x09], vec![3]),
                ]
            );
        }

        #[test]
        fn iter_unbounded_reaches_last_key() {
            let storage = MemStorage::new();
            storage.seed(vec![0xFF, 0xFF], vec![1]);

            let entries: Vec<KvPair> = storage
                .iter(&[0xFF], None)
                .collect::<Result<_, _>>()
                .unwrap();

            assert_eq!(entries, vec![(vec![0xFF, 0xFF], vec![1])]);
        }
    }
}
