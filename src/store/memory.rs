//! Ordered in-memory engine.
//!
//! A `BTreeMap` behind a single `RwLock`: readers share, writers exclude. One
//! range traversal holds the read lock for its whole pass, so a single `KEYS`
//! or `SCAN` page observes a stable snapshot; across separate pages there is
//! no snapshot and concurrent writers may reshuffle what a cursor replay sees.

use crate::store::adapter::{Store, StoreError, Visit};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

/// The bundled reference engine.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>, StoreError> {
        let entries = self.entries.read().unwrap();
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: Bytes, value: Bytes) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap();
        entries.insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap();
        entries.remove(key);
        Ok(())
    }

    fn range(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        visit: Visit<'_>,
    ) -> Result<(), StoreError> {
        let entries = self.entries.read().unwrap();
        let lower = match start {
            Some(s) => Bound::Included(s.to_vec()),
            None => Bound::Unbounded,
        };
        let upper = match end {
            Some(e) => Bound::Excluded(e.to_vec()),
            None => Bound::Unbounded,
        };
        for (key, value) in entries.range::<Vec<u8>, _>((lower, upper)) {
            if !visit(key, value) {
                break;
            }
        }
        Ok(())
    }

    fn range_prefix(&self, prefix: &[u8], visit: Visit<'_>) -> Result<(), StoreError> {
        match prefix_end(prefix) {
            Some(end) => self.range(Some(prefix), Some(&end), visit),
            None => self.range(Some(prefix), None, visit),
        }
    }
}

/// Smallest key greater than every key with `prefix`: increment the last
/// byte, dropping trailing `0xff` bytes first. `None` means the prefix range
/// is unbounded above (empty or all-`0xff` prefix).
fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.last_mut() {
        if *last < 0xff {
            *last += 1;
            return Some(end);
        }
        end.pop();
    }
    None
}
