//! Core type definitions for the ledger.
//!
//! This module provides fundamental types used throughout the crate:
//! - `Address`: fixed-size 20-byte account identifiers
//! - `Hash`: fixed-size 32-byte SHA-256 hashes
//! - `Bytes`: reference-counted immutable byte buffers
//! - `encoding`: deterministic binary serialization traits
//!
//! All types are optimized for commit-path workloads with minimal
//! allocations and efficient memory layouts.

pub mod address;
pub mod bytes;
pub mod encoding;
pub mod hash;
