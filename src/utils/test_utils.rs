//! Test utilities shared across the crate's test modules.

#[cfg(test)]
pub mod utils {
    use crate::types::address::{ADDRESS_LEN, Address};
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    /// Returns an address unique within the test process.
    pub fn unique_address() -> Address {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut value = [0u8; ADDRESS_LEN];
        value[..8].copy_from_slice(&n.to_le_bytes());
        Address(value)
    }
}
