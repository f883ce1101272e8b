//! The contract this crate requires from a storage engine.

use bytes::Bytes;
use thiserror::Error;

/// Failures surfaced by a storage engine. They are reported to clients as
/// wire-level error replies and are never fatal to the connection.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupted entry: {0}")]
    Corruption(String),

    #[error("{0}")]
    Backend(String),
}

/// Per-entry visitor for range iteration. Returning `false` stops the scan.
pub type Visit<'a> = &'a mut dyn FnMut(&[u8], &[u8]) -> bool;

/// An ordered key-value engine.
///
/// Keys are opaque byte strings totally ordered by byte-lexicographic
/// comparison. Iteration visits entries in ascending key order and honors
/// early stop. Whether a traversal observes concurrent mutations is up to the
/// engine (snapshot vs. live iteration); callers must not assume more than
/// deterministic order over a fixed key set.
pub trait Store: Send + Sync + 'static {
    /// Point lookup. `Ok(None)` means the key is absent.
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>, StoreError>;

    /// Inserts or overwrites one entry.
    fn put(&self, key: Bytes, value: Bytes) -> Result<(), StoreError>;

    /// Removes one entry. Deleting an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Visits entries with `start <= key < end` in ascending order.
    /// `None` bounds are open-ended.
    fn range(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        visit: Visit<'_>,
    ) -> Result<(), StoreError>;

    /// Visits entries whose key begins with `prefix`, in ascending order.
    fn range_prefix(&self, prefix: &[u8], visit: Visit<'_>) -> Result<(), StoreError>;
}
