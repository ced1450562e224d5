//! Cache Entry Module
//!
//! Defines the on-disk record format and the freshness rule shared by stores.
//!
//! # Record Format
//!
//! ```text
//! magic (4 bytes): "FCHE"
//! version (1 byte): 1
//! payload (variable): JSON-serialized Value
//! ```
//!
//! The last-modified time of a record is not part of the payload; stores take
//! it from their medium (file mtime, or the write instant for memory).

use std::time::{Duration, SystemTime};

use crate::cache::value::Value;
use crate::error::{CacheError, Result};

/// Record magic bytes
pub const MAGIC: &[u8; 4] = b"FCHE";
/// Current record format version
pub const FORMAT_VERSION: u8 = 1;

const HEADER_LEN: usize = MAGIC.len() + 1;

// == Encode ==
/// Serializes a value into record bytes.
///
/// Non-finite floats are rejected: JSON has no representation for them.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    check_finite(value)?;
    let payload = serde_json::to_vec(value)?;

    let mut contents = Vec::with_capacity(HEADER_LEN + payload.len());
    contents.extend_from_slice(MAGIC);
    contents.push(FORMAT_VERSION);
    contents.extend_from_slice(&payload);
    Ok(contents)
}

fn check_finite(value: &Value) -> Result<()> {
    match value {
        Value::Float(f) if !f.is_finite() => Err(CacheError::Serialization(format!(
            "non-finite float {} cannot be stored",
            f
        ))),
        Value::List(items) => items.iter().try_for_each(check_finite),
        _ => Ok(()),
    }
}

// == Decode ==
/// Deserializes record bytes, checking magic and version first.
pub fn decode(contents: &[u8]) -> Result<Value> {
    if contents.len() < HEADER_LEN {
        return Err(CacheError::Corrupt("record too short".into()));
    }

    if &contents[..MAGIC.len()] != MAGIC {
        return Err(CacheError::Corrupt("invalid magic bytes".into()));
    }

    let version = contents[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            expected: FORMAT_VERSION,
            actual: version,
        });
    }

    Ok(serde_json::from_slice(&contents[HEADER_LEN..])?)
}

// == Freshness Rule ==
/// Returns true when a record modified at `modified` is still inside its
/// validity window at `now`.
///
/// Boundary condition: an age of exactly `validity_secs` is expired. A
/// modification time ahead of `now` counts as age zero.
pub fn is_fresh(modified: SystemTime, now: SystemTime, validity_secs: u64) -> bool {
    let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
    age < Duration::from_secs(validity_secs)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_writes_header() {
        let bytes = encode(&Value::Bool(true)).unwrap();
        assert_eq!(&bytes[..4], b"FCHE");
        assert_eq!(bytes[4], FORMAT_VERSION);
        assert_eq!(decode(&bytes).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_decode_nested_list() {
        let value = Value::List(vec![
            Value::Int(1),
            Value::String("2".to_string()),
            Value::Float(3.0),
            Value::List(vec![]),
        ]);
        let bytes = encode(&value).unwrap();
        assert_eq!(decode(&bytes).unwrap(), value);
    }

    #[test]
    fn test_encode_rejects_non_finite_floats() {
        for f in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            assert!(matches!(
                encode(&Value::Float(f)),
                Err(CacheError::Serialization(_))
            ));
        }
        let nested = Value::List(vec![Value::Int(1), Value::List(vec![Value::Float(f64::NAN)])]);
        assert!(matches!(encode(&nested), Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_decode_too_short() {
        assert!(matches!(decode(b"FCH"), Err(CacheError::Corrupt(_))));
    }

    #[test]
    fn test_decode_bad_magic() {
        assert!(matches!(
            decode(b"XXXX\x01{}"),
            Err(CacheError::Corrupt(_))
        ));
    }

    #[test]
    fn test_decode_unknown_version() {
        let mut bytes = encode(&Value::Null).unwrap();
        bytes[4] = 9;
        assert!(matches!(
            decode(&bytes),
            Err(CacheError::VersionMismatch {
                expected: 1,
                actual: 9
            })
        ));
    }

    #[test]
    fn test_decode_bad_payload() {
        let mut bytes = MAGIC.to_vec();
        bytes.push(FORMAT_VERSION);
        bytes.extend_from_slice(b"not json");
        assert!(matches!(decode(&bytes), Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_freshness_boundary_condition() {
        let written = SystemTime::now();
        let at = |secs| written + Duration::from_secs(secs);

        assert!(is_fresh(written, at(59), 60));
        // Exactly at the threshold is expired
        assert!(!is_fresh(written, at(60), 60));
        assert!(!is_fresh(written, at(61), 60));
    }

    #[test]
    fn test_freshness_zero_validity() {
        let now = SystemTime::now();
        assert!(!is_fresh(now, now, 0));
    }

    #[test]
    fn test_freshness_future_mtime() {
        let now = SystemTime::now();
        assert!(is_fresh(now + Duration::from_secs(30), now, 1));
    }
}
