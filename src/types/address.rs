//! 20-byte account addresses.

use ledger_derive::BinaryCodec;
use std::fmt;

/// Address length in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Fixed-size 20-byte address identifying an account.
///
/// Carries two forms: the raw bytes, used as the key prefix for an account's
/// storage slots, and the lowercase hex string (40 characters, no `0x`
/// prefix), used inside the `"a-"` / `"c-"` composite keys. This type is
/// `Copy` for efficient passing in lookup and commit operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Ord, PartialOrd, BinaryCodec, Default)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Creates a zero-valued address.
    pub const fn zero() -> Address {
        Address([0u8; ADDRESS_LEN])
    }

    /// Returns the address as a byte slice.
    pub const fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns the address as a byte Vec.
    pub fn to_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Creates an address from a byte slice.
    ///
    /// Returns `None` if the slice length is not exactly [`ADDRESS_LEN`] bytes.
    pub fn from_slice(slice: &[u8]) -> Option<Address> {
        if slice.len() != ADDRESS_LEN {
            return None;
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(slice);
        Some(Address(bytes))
    }

    /// Returns the lowercase hex form: 40 characters, no prefix.
    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses an address from its 40-character hex form.
    ///
    /// Returns `None` on invalid hex or wrong length.
    pub fn from_hex(s: &str) -> Option<Address> {
        let bytes = hex::decode(s).ok()?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}
