//! Longest-prefix path matching.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Among routes whose prefix matches, the longest prefix wins; ties
//!   break by earlier position in the configured route list
//! - No regex, to keep matching O(routes) with no backtracking

/// True if `path` is matched by `prefix`: either an exact match, or
/// `path` continues past `prefix` at a `/` boundary. `prefix = "/"`
/// matches everything.
pub fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

/// Pick the longest-prefix match among `(prefix, index)` pairs; ties
/// break by the smallest index (earlier in config order).
pub fn best_match<'a>(candidates: impl Iterator<Item = (&'a str, usize)>, path: &str) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None; // (prefix_len, index)

    for (prefix, index) in candidates {
        if !prefix_matches(prefix, path) {
            continue;
        }
        let len = prefix.len();
        match best {
            Some((best_len, best_index)) if len < best_len || (len == best_len && index >= best_index) => {}
            _ => best = Some((len, index)),
        }
    }

    best.map(|(_, index)| index)
}
