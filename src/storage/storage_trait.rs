//! Key-value storage abstraction consumed by the ledger core.
//!
//! Defines the [`Storage`] trait (point get, bounded range scan, atomic
//! batch write) together with the [`WriteBatch`] builder and the prefix
//! bound helper used for range scans.

use ledger_derive::Error;

/// A key-value pair yielded by a range scan.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// A single staged write: `None` value means delete.
pub type WriteOp = (Vec<u8>, Option<Vec<u8>>);

/// Errors that can occur while interacting with storage backends.
///
/// Absence of a key is not an error; [`Storage::get`] reports it as
/// `Ok(None)`. Anything surfacing here means the backend itself failed and
/// the caller cannot trust the working set any further.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store reported a fault (I/O error, corruption, ...).
    #[error("storage backend fault: {0}")]
    Backend(String),
}

/// Ordered set of writes applied atomically by [`Storage::write_batch`].
///
/// Operations are applied in insertion order; a later op on the same key
/// wins.
#[derive(Debug, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Stages a key-value write.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push((key, Some(value)));
    }

    /// Stages a key deletion.
    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.push((key, None));
    }

    /// Returns the number of staged operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if no operations are staged.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns the staged operations.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Consumes the batch, yielding the staged operations.
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Key-value storage backend for ledger state.
///
/// Implementations must be thread-safe (`Send + Sync`); the ledger itself
/// performs no internal synchronization and relies on the backend for batch
/// and iterator safety.
pub trait Storage: Send + Sync {
    /// Retrieves the value stored under `key`, or `None` if absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Returns an ordered cursor over keys in `[begin, end)`.
    ///
    /// An `end` of `None` means the scan is unbounded above. A fault during
    /// iteration is yielded as an `Err` item and terminates the scan.
    fn iter<'a>(
        &'a self,
        begin: &[u8],
        end: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = Result<KvPair, StorageError>> + 'a>;

    /// Applies all operations in `batch` atomically.
    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError>;
}

/// Computes the key range `[begin, end)` covering exactly the keys that
/// start with `prefix`.
///
/// The upper bound is the prefix with its last byte `< 0xFF` incremented and
/// all following bytes dropped. A prefix of all `0xFF` bytes has no
/// representable upper bound; `None` means the range is open-ended.
pub fn bytes_prefix(prefix: &[u8]) -> (Vec<u8>, Option<Vec<u8>>) {
    let mut limit = None;
    for i in (0..prefix.len()).rev() {
        if prefix[i] < 0xFF {
            let mut upper = prefix[..=i].to_vec();
            upper[i] += 1;
            limit = Some(upper);
            break;
        }
    }
    (prefix.to_vec(), limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_batch_records_ops_in_order() {
        let mut batch = WriteBatch::new();
        assert!(batch.is_empty());

        batch.put(vec![1], vec![0xAA]);
        batch.delete(vec![2]);
        batch.put(vec![3], vec![0xBB]);

        assert_eq!(batch.len(), 3);
        assert_eq!(
            batch.into_ops(),
            vec![
                (vec![1], Some(vec![0xAA])),
                (vec![2], None),
                (vec![3], Some(vec![0xBB])),
            ]
        );
    }

    #[test]
    fn bytes_prefix_increments_last_byte() {
        let (begin, end) = bytes_prefix(&[0x01, 0x02]);
        assert_eq!(begin, vec![0x01, 0x02]);
        assert_eq!(end, Some(vec![0x01, 0x03]));
    }

    #[test]
    fn bytes_prefix_drops_trailing_ff() {
        let (begin, end) = bytes_prefix(&[0x01, 0xFF, 0xFF]);
        assert_eq!(begin, vec![0x01, 0xFF, 0xFF]);
        assert_eq!(end, Some(vec![0x02]));
    }

    #[test]
    fn bytes_prefix_all_ff_is_unbounded() {
        let (begin, end) = bytes_prefix(&[0xFF, 0xFF]);
        assert_eq!(begin, vec![0xFF, 0xFF]);
        assert_eq!(end, None);
    }

    #[test]
    fn bytes_prefix_bounds_characterize_prefix_membership() {
        let prefix = [0x10u8, 0x20];
        let (begin, end) = bytes_prefix(&prefix);
        let end = end.expect("bounded");

        // Keys starting with the prefix fall inside [begin, end).
        for key in [vec![0x10, 0x20], vec![0x10, 0x20, 0x00], vec![0x10, 0x20, 0xFF]] {
            assert!(key.as_slice() >= begin.as_slice());
            assert!(key.as_slice() < end.as_slice(), "{key:02x?}");
        }

        // Keys not starting with the prefix fall outside.
        for key in [vec![0x10, 0x1F, 0xFF], vec![0x10, 0x21], vec![0x11]] {
            let inside = key.as_slice() >= begin.as_slice() && key.as_slice() < end.as_slice();
            assert!(!inside, "{key:02x?}");
        }
    }

    #[test]
    fn bytes_prefix_empty_prefix_is_unbounded() {
        let (begin, end) = bytes_prefix(&[]);
        assert!(begin.is_empty());
        assert_eq!(end, None);
    }
}
