//! Reduced glob matching for key and channel patterns.
//!
//! The only wildcard is `*`, matching zero or more bytes. There is no `?`, no
//! character classes and no escaping. The same narrow grammar is shared by
//! `KEYS`, `SCAN MATCH` and pattern subscriptions. Matching runs over raw
//! bytes, so binary keys compare byte-for-byte.

/// Returns true when `candidate` matches `pattern`.
///
/// The pattern splits on `*` into literal segments which are located in the
/// candidate left to right. The first segment must sit at offset 0 unless the
/// pattern opens with `*`; the last must close the candidate unless the
/// pattern ends with `*`.
pub fn glob_match(pattern: &[u8], candidate: &[u8]) -> bool {
    if pattern.is_empty() {
        return candidate.is_empty();
    }
    if pattern == b"*" {
        return true;
    }
    if !pattern.contains(&b'*') {
        return pattern == candidate;
    }

    let segments: Vec<&[u8]> = pattern.split(|&b| b == b'*').collect();
    let leading = pattern.starts_with(b"*");
    let trailing = pattern.ends_with(b"*");
    let last = segments.len() - 1;

    let mut rest = candidate;
    for (i, segment) in segments[..last].iter().enumerate() {
        match find(rest, segment) {
            Some(at) => {
                if i == 0 && !leading && at != 0 {
                    return false;
                }
                rest = &rest[at + segment.len()..];
            }
            None => return false,
        }
    }

    trailing || rest.ends_with(segments[last])
}

/// Leftmost occurrence of `needle` in `haystack`. Empty needles match at 0.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_everything() {
        assert!(glob_match(b"*", b""));
        assert!(glob_match(b"*", b"anything"));
        assert!(glob_match(b"*", b"\x00\xff"));
    }

    #[test]
    fn empty_pattern_matches_only_empty() {
        assert!(glob_match(b"", b""));
        assert!(!glob_match(b"", b"x"));
    }

    #[test]
    fn literal_requires_exact_match() {
        assert!(glob_match(b"abc", b"abc"));
        assert!(!glob_match(b"abc", b"abcd"));
        assert!(!glob_match(b"abc", b"ab"));
    }

    #[test]
    fn interior_wildcard() {
        assert!(glob_match(b"a*c", b"aXXc"));
        assert!(glob_match(b"a*c", b"ac"));
        assert!(!glob_match(b"a*c", b"aXXd"));
        assert!(!glob_match(b"a*c", b"bXXc"));
    }

    #[test]
    fn leading_wildcard() {
        assert!(glob_match(b"*c", b"XXXc"));
        assert!(glob_match(b"*c", b"c"));
        assert!(!glob_match(b"*c", b"XXXd"));
    }

    #[test]
    fn trailing_wildcard() {
        assert!(glob_match(b"a*", b"aXXX"));
        assert!(glob_match(b"a*", b"a"));
        assert!(!glob_match(b"a*", b"bXXX"));
    }

    #[test]
    fn key_namespace_prefixes() {
        assert!(glob_match(b"user:*", b"user:101"));
        assert!(glob_match(b"user:*", b"user:"));
        assert!(!glob_match(b"user:*", b"session:101"));
    }

    #[test]
    fn multiple_wildcards() {
        assert!(glob_match(b"a*b*c", b"a--b--c"));
        assert!(glob_match(b"*a*b*", b"XaXbX"));
        assert!(!glob_match(b"a*b*c", b"a--c--b"));
    }

    #[test]
    fn consecutive_wildcards_collapse() {
        assert!(glob_match(b"a**c", b"aXXc"));
        assert!(glob_match(b"**", b"whatever"));
    }

    #[test]
    fn binary_candidates() {
        assert!(glob_match(b"k\x00*", b"k\x00rest"));
        assert!(!glob_match(b"k\x00*", b"k\x01rest"));
    }

    #[test]
    fn segments_consume_left_to_right() {
        // The second "ab" must be found after the first match point.
        assert!(glob_match(b"ab*ab", b"abXab"));
        assert!(!glob_match(b"ab*ab", b"ab"));
    }
}
