//! Predicates backing the nutype validators in this crate.

/// Characters a stream id may not contain.
///
/// Reserved so that stream names can later be matched by glob pattern
/// without an escaping scheme.
pub const RESERVED_STREAM_CHARS: [char; 4] = ['*', '?', '[', ']'];

pub fn no_glob_metacharacters(candidate: &str) -> bool {
    !candidate.contains(RESERVED_STREAM_CHARS)
}
