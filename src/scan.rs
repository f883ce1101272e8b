//! KEYS and SCAN emulation over ordered range iteration.
//!
//! The engine underneath offers sorted range scans, not Redis's hashed
//! buckets, so the incremental `SCAN` contract is emulated: the cursor is a
//! count of already-returned matches, and each call replays iteration from
//! the start of the (possibly prefix-restricted) range, skipping that many
//! matches before collecting the next page.
//!
//! Patterns of the form `literal*` (exactly one `*`, at the end) restrict
//! iteration to the literal's prefix sub-range. Any other wildcard placement
//! forces a full-range walk with the matcher applied per key.

use crate::glob::glob_match;
use crate::store::{Store, StoreError};
use bytes::Bytes;

/// Parsed `SCAN` options.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Number of already-returned matches to skip before collecting.
    pub cursor: u64,
    /// Glob filter; `None` accepts every key.
    pub pattern: Option<Bytes>,
    /// Page size limit; 0 means unbounded.
    pub count: usize,
}

/// One page of `SCAN` results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next call; 0 signals the iteration is complete.
    pub cursor: u64,
    /// Matching keys of this page, in storage order.
    pub keys: Vec<Bytes>,
}

/// `KEYS`: every key matching `pattern`, unbounded, in storage order.
pub fn matching_keys(store: &dyn Store, pattern: &[u8]) -> Result<Vec<Bytes>, StoreError> {
    let mut keys = Vec::new();

    if pattern == b"*" {
        store.range(None, None, &mut |key, _| {
            keys.push(Bytes::copy_from_slice(key));
            true
        })?;
    } else if let Some(prefix) = trailing_star_prefix(pattern) {
        store.range_prefix(prefix, &mut |key, _| {
            keys.push(Bytes::copy_from_slice(key));
            true
        })?;
    } else {
        store.range(None, None, &mut |key, _| {
            if glob_match(pattern, key) {
                keys.push(Bytes::copy_from_slice(key));
            }
            true
        })?;
    }

    Ok(keys)
}

/// `SCAN`: one bounded page plus the cursor to resume from.
///
/// The cursor is a skip-count replay, not a stable iterator handle: if the
/// key set mutates between pages, entries may be skipped or revisited. That
/// limitation is inherent to the emulation and intentionally not papered
/// over. Over a fixed key set, chaining cursors yields every match exactly
/// once and terminates with cursor 0.
pub fn scan_page(store: &dyn Store, opts: &ScanOptions) -> Result<ScanPage, StoreError> {
    let mut keys: Vec<Bytes> = Vec::new();
    let mut seen: u64 = 0;
    let mut truncated = false;

    {
        let pattern = opts.pattern.as_deref();
        let cursor = opts.cursor;
        let count = opts.count;
        let mut visit = |key: &[u8], _value: &[u8]| -> bool {
            if let Some(p) = pattern {
                if !glob_match(p, key) {
                    // Filtered entries never touch the cursor arithmetic.
                    return true;
                }
            }
            if seen < cursor {
                seen += 1;
                return true;
            }
            keys.push(Bytes::copy_from_slice(key));
            seen += 1;
            if count != 0 && keys.len() >= count {
                truncated = true;
                return false;
            }
            true
        };

        match opts.pattern.as_deref().and_then(trailing_star_prefix) {
            Some(prefix) => store.range_prefix(prefix, &mut visit)?,
            None => store.range(None, None, &mut visit)?,
        }
    }

    Ok(ScanPage {
        cursor: if truncated { seen } else { 0 },
        keys,
    })
}

/// The literal prefix of a `literal*` pattern: exactly one `*`, trailing.
fn trailing_star_prefix(pattern: &[u8]) -> Option<&[u8]> {
    let (last, head) = pattern.split_last()?;
    if *last == b'*' && !head.contains(&b'*') {
        Some(head)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::BTreeSet;

    fn store_with(keys: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for k in keys {
            store
                .put(Bytes::copy_from_slice(k.as_bytes()), Bytes::from_static(b"v"))
                .unwrap();
        }
        store
    }

    fn scan(store: &MemoryStore, cursor: u64, pattern: Option<&[u8]>, count: usize) -> ScanPage {
        scan_page(
            store,
            &ScanOptions {
                cursor,
                pattern: pattern.map(Bytes::copy_from_slice),
                count,
            },
        )
        .unwrap()
    }

    fn names(keys: &[Bytes]) -> Vec<&[u8]> {
        keys.iter().map(|k| k.as_ref()).collect()
    }

    #[test]
    fn keys_star_returns_everything_in_order() {
        let store = store_with(&["a1", "a2", "b1"]);
        let keys = matching_keys(&store, b"*").unwrap();
        assert_eq!(names(&keys), vec![&b"a1"[..], b"a2", b"b1"]);
    }

    #[test]
    fn keys_trailing_star_uses_prefix_range() {
        let store = store_with(&["user:1", "user:2", "vote:1"]);
        let keys = matching_keys(&store, b"user:*").unwrap();
        assert_eq!(names(&keys), vec![&b"user:1"[..], b"user:2"]);
    }

    #[test]
    fn keys_arbitrary_glob_filters_full_range() {
        let store = store_with(&["alpha", "aroma", "beta"]);
        let keys = matching_keys(&store, b"a*a").unwrap();
        assert_eq!(names(&keys), vec![&b"alpha"[..], b"aroma"]);
    }

    #[test]
    fn keys_exact_pattern_without_star() {
        let store = store_with(&["alpha", "beta"]);
        let keys = matching_keys(&store, b"beta").unwrap();
        assert_eq!(names(&keys), vec![&b"beta"[..]]);
        assert!(matching_keys(&store, b"gamma").unwrap().is_empty());
    }

    #[test]
    fn scan_small_set_completes_in_one_page() {
        // a1/a2 match, b1 does not; COUNT larger than the match set.
        let store = store_with(&["a1", "a2", "b1"]);
        let page = scan(&store, 0, Some(b"a*"), 10);
        assert_eq!(page.cursor, 0);
        assert_eq!(names(&page.keys), vec![&b"a1"[..], b"a2"]);
    }

    #[test]
    fn scan_count_truncates_and_reports_resume_cursor() {
        let store = store_with(&["k1", "k2", "k3", "k4", "k5"]);
        let page = scan(&store, 0, None, 2);
        assert_eq!(page.cursor, 2);
        assert_eq!(names(&page.keys), vec![&b"k1"[..], b"k2"]);

        let page = scan(&store, page.cursor, None, 2);
        assert_eq!(page.cursor, 4);
        assert_eq!(names(&page.keys), vec![&b"k3"[..], b"k4"]);

        let page = scan(&store, page.cursor, None, 2);
        assert_eq!(page.cursor, 0);
        assert_eq!(names(&page.keys), vec![&b"k5"[..]]);
    }

    #[test]
    fn scan_chaining_visits_each_match_exactly_once() {
        let all: Vec<String> = (0..23).map(|i| format!("key:{i:02}")).collect();
        let refs: Vec<&str> = all.iter().map(String::as_str).collect();
        let store = store_with(&refs);

        for count in 1..=5 {
            let mut cursor = 0u64;
            let mut union = Vec::new();
            loop {
                let page = scan(&store, cursor, Some(b"key:*"), count);
                union.extend(page.keys.iter().map(|k| k.to_vec()));
                cursor = page.cursor;
                if cursor == 0 {
                    break;
                }
            }
            let unique: BTreeSet<_> = union.iter().cloned().collect();
            assert_eq!(unique.len(), union.len(), "duplicates at count {count}");
            assert_eq!(union.len(), all.len(), "missing keys at count {count}");
        }
    }

    #[test]
    fn scan_skip_count_ignores_filtered_entries() {
        // Non-matching keys interleave with matches; the cursor counts
        // matches only, so resumption is stable.
        let store = store_with(&["a1", "b1", "a2", "b2", "a3", "b3"]);
        let first = scan(&store, 0, Some(b"a*"), 2);
        assert_eq!(first.cursor, 2);
        assert_eq!(names(&first.keys), vec![&b"a1"[..], b"a2"]);

        let second = scan(&store, first.cursor, Some(b"a*"), 2);
        assert_eq!(second.cursor, 0);
        assert_eq!(names(&second.keys), vec![&b"a3"[..]]);
    }

    #[test]
    fn scan_without_options_returns_everything() {
        let store = store_with(&["x", "y"]);
        let page = scan(&store, 0, None, 0);
        assert_eq!(page.cursor, 0);
        assert_eq!(page.keys.len(), 2);
    }

    #[test]
    fn scan_interior_star_walks_full_range() {
        let store = store_with(&["start-middle-end", "start-end", "other"]);
        let page = scan(&store, 0, Some(b"start*end"), 0);
        assert_eq!(page.cursor, 0);
        assert_eq!(page.keys.len(), 2);
    }

    #[test]
    fn scan_cursor_beyond_matches_yields_empty_final_page() {
        let store = store_with(&["a", "b"]);
        let page = scan(&store, 10, None, 5);
        assert_eq!(page.cursor, 0);
        assert!(page.keys.is_empty());
    }

    #[test]
    fn trailing_star_prefix_detection() {
        assert_eq!(trailing_star_prefix(b"user:*"), Some(&b"user:"[..]));
        assert_eq!(trailing_star_prefix(b"*"), Some(&b""[..]));
        assert_eq!(trailing_star_prefix(b"*x"), None);
        assert_eq!(trailing_star_prefix(b"a*b*"), None);
        assert_eq!(trailing_star_prefix(b"plain"), None);
        assert_eq!(trailing_star_prefix(b""), None);
    }
}
