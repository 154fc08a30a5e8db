//! Slash-delimited registration strings.
//!
//! Backends and connectors are identified by paths such as
//! `org/cmf/image/root`. A pattern matches a registration when every
//! non-empty pattern segment occurs among the registration's segments, so
//! `//image/root` and `root` both select the root image backend.

/// Non-empty segments of a registration or pattern.
pub fn keys(reg: &str) -> impl Iterator<Item = &str> {
    reg.split('/').filter(|s| !s.is_empty())
}

/// `true` if every key of `pattern` appears in `registration`.
///
/// An empty pattern matches everything.
pub fn matches(registration: &str, pattern: &str) -> bool {
    keys(pattern).all(|k| keys(registration).any(|r| r == k))
}

/// Last segment, used as a short display name.
pub fn short_name(registration: &str) -> &str {
    keys(registration).last().unwrap_or(registration)
}
