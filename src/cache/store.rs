//! Cache Store Module
//!
//! The persistence capability underneath the cache: named records with a
//! freshness query, independent of how values are typed.

use std::path::{Component, Path};

use crate::cache::value::Value;
use crate::error::{CacheError, Result};

// == Freshness ==
/// Result of a freshness query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// A record exists and is inside its validity window
    Fresh,
    /// A record exists but is at least as old as the validity window
    Stale,
    /// No record exists
    NotFound,
}

// == Store Trait ==
/// Durable key-value persistence with a freshness query.
pub trait Store {
    /// Reads and deserializes the record for `name`.
    ///
    /// Fails with [`CacheError::NotFound`] if no record exists.
    fn read(&self, name: &str) -> Result<Value>;

    /// Persists `value` under `name`, replacing any previous record and
    /// resetting its modification time to now.
    fn write(&self, name: &str, value: &Value) -> Result<()>;

    /// Checks whether the record for `name` is younger than `validity_secs`.
    /// Does not read the payload.
    fn check_fresh(&self, name: &str, validity_secs: u64) -> Result<Freshness>;

    /// Removes the record for `name`. Absent records are not an error.
    fn invalidate(&self, name: &str) -> Result<()>;
}

impl<S: Store + ?Sized> Store for &S {
    fn read(&self, name: &str) -> Result<Value> {
        (**self).read(name)
    }

    fn write(&self, name: &str, value: &Value) -> Result<()> {
        (**self).write(name, value)
    }

    fn check_fresh(&self, name: &str, validity_secs: u64) -> Result<Freshness> {
        (**self).check_fresh(name, validity_secs)
    }

    fn invalidate(&self, name: &str) -> Result<()> {
        (**self).invalidate(name)
    }
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn read(&self, name: &str) -> Result<Value> {
        (**self).read(name)
    }

    fn write(&self, name: &str, value: &Value) -> Result<()> {
        (**self).write(name, value)
    }

    fn check_fresh(&self, name: &str, validity_secs: u64) -> Result<Freshness> {
        (**self).check_fresh(name, validity_secs)
    }

    fn invalidate(&self, name: &str) -> Result<()> {
        (**self).invalidate(name)
    }
}

// == Key Validation ==
/// Checks that a key is usable as a relative record path.
///
/// Keys may contain `/` to group records in subdirectories, but must be
/// non-empty and may not be absolute or contain `.`, `..` or empty segments.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Err(CacheError::InvalidKey(format!("'{}' {}", name, reason)));

    if name.is_empty() {
        return invalid("is empty");
    }
    if name.contains('\0') {
        return invalid("contains a NUL byte");
    }
    if name.starts_with('/') || name.starts_with('\\') || Path::new(name).is_absolute() {
        return invalid("is absolute");
    }
    if name.split(['/', '\\']).any(str::is_empty) {
        return invalid("has an empty path segment");
    }
    let all_normal = Path::new(name)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !all_normal || name.split(['/', '\\']).any(|seg| seg == "." || seg == "..") {
        return invalid("contains a relative path segment");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_plain_and_nested_names() {
        assert!(validate_name("ip").is_ok());
        assert!(validate_name("lat-lon").is_ok());
        assert!(validate_name("geo/lat-lon").is_ok());
        assert!(validate_name(".hidden").is_ok());
    }

    #[test]
    fn test_validate_rejects_unsafe_names() {
        for name in ["", "/etc/passwd", "../escape", "a/../b", "a//b", "a/", "./a", "a\0b"] {
            assert!(
                matches!(validate_name(name), Err(CacheError::InvalidKey(_))),
                "{:?} should be rejected",
                name
            );
        }
    }
}
