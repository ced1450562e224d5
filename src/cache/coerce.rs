//! Coercion Module
//!
//! Converts a stored [`Value`] into a requested Rust type, or rejects it.
//! Each target kind has exactly one coercion function that matches on the
//! source kind.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::cache::value::{Structured, Value};
use crate::error::{CacheError, Result};

// == Coercion Error ==
/// Why a value could not be coerced. Carries no key; the cache attaches it.
#[derive(Debug, Clone, PartialEq)]
pub enum CoercionError {
    /// The source kind cannot represent the requested kind
    Mismatch { expected: String, found: String },
    /// The source kind is right but its content could not be parsed
    Parse(String),
}

impl CoercionError {
    fn mismatch(expected: &str, found: &Value) -> Self {
        CoercionError::Mismatch {
            expected: expected.to_string(),
            found: found.kind().to_string(),
        }
    }

    /// Attaches the cache key this value was read from.
    pub fn at_key(self, key: &str) -> CacheError {
        match self {
            CoercionError::Mismatch { expected, found } => CacheError::TypeMismatch {
                key: key.to_string(),
                expected,
                found,
            },
            CoercionError::Parse(message) => CacheError::ParseFailure {
                key: key.to_string(),
                message,
            },
        }
    }

    /// Attaches the cache key and the list position this element was read from.
    pub fn at_index(self, key: &str, index: usize) -> CacheError {
        match self {
            CoercionError::Mismatch { expected, found } => CacheError::ElementMismatch {
                key: key.to_string(),
                index,
                expected,
                found,
            },
            CoercionError::Parse(message) => CacheError::ParseFailure {
                key: key.to_string(),
                message: format!("element {}: {}", index, message),
            },
        }
    }
}

pub type CoercionResult<T> = std::result::Result<T, CoercionError>;

// == Cache Value Trait ==
/// A Rust type that can be written to and read back from a record.
pub trait CacheValue: Sized {
    /// Converts into the stored representation.
    fn to_value(&self) -> Result<Value>;

    /// Coerces a stored value into this type.
    fn from_value(value: Value) -> CoercionResult<Self>;
}

impl CacheValue for Value {
    fn to_value(&self) -> Result<Value> {
        Ok(self.clone())
    }

    fn from_value(value: Value) -> CoercionResult<Self> {
        Ok(value)
    }
}

impl CacheValue for String {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::String(self.clone()))
    }

    fn from_value(value: Value) -> CoercionResult<Self> {
        to_string(value)
    }
}

impl CacheValue for i64 {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Int(*self))
    }

    fn from_value(value: Value) -> CoercionResult<Self> {
        to_int(value)
    }
}

impl CacheValue for f64 {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Float(*self))
    }

    fn from_value(value: Value) -> CoercionResult<Self> {
        to_float(value)
    }
}

impl CacheValue for bool {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Bool(*self))
    }

    fn from_value(value: Value) -> CoercionResult<Self> {
        Ok(to_bool(&value))
    }
}

impl CacheValue for DateTime<Utc> {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::DateTime(*self))
    }

    fn from_value(value: Value) -> CoercionResult<Self> {
        to_date_time(value)
    }
}

impl<T: Structured> CacheValue for T {
    fn to_value(&self) -> Result<Value> {
        Value::instance(self)
    }

    fn from_value(value: Value) -> CoercionResult<Self> {
        to_instance(value)
    }
}

// == String ==
/// Any scalar becomes its string form. Lists and records are rejected.
pub fn to_string(value: Value) -> CoercionResult<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::DateTime(dt) => Ok(dt.to_rfc3339()),
        Value::Null => Ok(String::new()),
        other => Err(CoercionError::mismatch("a string", &other)),
    }
}

// == Integer ==
/// Integers pass through; floats and strings convert only when the result is exact.
pub fn to_int(value: Value) -> CoercionResult<i64> {
    match value {
        Value::Int(i) => Ok(i),
        Value::Float(f) => exact_int(f).ok_or_else(|| CoercionError::Mismatch {
            expected: "an int".to_string(),
            found: format!("float {}", f),
        }),
        Value::String(ref s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| parse_finite(trimmed).and_then(exact_int))
                .ok_or_else(|| CoercionError::Mismatch {
                    expected: "an int".to_string(),
                    found: format!("string '{}'", s),
                })
        }
        other => Err(CoercionError::mismatch("an int", &other)),
    }
}

fn exact_int(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

// == Float ==
/// Floats pass through; integers widen; strings must parse to a finite number.
pub fn to_float(value: Value) -> CoercionResult<f64> {
    match value {
        Value::Float(f) => Ok(f),
        Value::Int(i) => Ok(i as f64),
        Value::String(ref s) => parse_finite(s.trim()).ok_or_else(|| CoercionError::Mismatch {
            expected: "a float".to_string(),
            found: format!("string '{}'", s),
        }),
        other => Err(CoercionError::mismatch("a float", &other)),
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

// == Boolean ==
/// Strings treated as false, compared case-insensitively after trimming.
pub const FALSE_STRINGS: [&str; 5] = ["", "0", "false", "no", "off"];

/// Truth table:
///
/// | source    | false when                          |
/// |-----------|-------------------------------------|
/// | bool      | `false`                             |
/// | int/float | zero                                |
/// | string    | one of [`FALSE_STRINGS`]            |
/// | list      | empty                               |
/// | null      | always                              |
/// | date/time | never                               |
/// | struct    | never                               |
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::String(s) => {
            let trimmed = s.trim();
            !FALSE_STRINGS.iter().any(|f| trimmed.eq_ignore_ascii_case(f))
        }
        Value::List(items) => !items.is_empty(),
        Value::Null => false,
        Value::DateTime(_) | Value::Struct { .. } => true,
    }
}

// == Date/Time ==
/// Date/times pass through, integers are Unix seconds, strings are parsed.
pub fn to_date_time(value: Value) -> CoercionResult<DateTime<Utc>> {
    match value {
        Value::DateTime(dt) => Ok(dt),
        Value::Int(secs) => Utc.timestamp_opt(secs, 0).single().ok_or_else(|| {
            CoercionError::Parse(format!("timestamp {} is out of range", secs))
        }),
        Value::String(s) => parse_date_time(&s),
        other => Err(CoercionError::mismatch("a date/time", &other)),
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` (UTC) and
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_date_time(input: &str) -> CoercionResult<DateTime<Utc>> {
    let s = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Some(naive) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    Err(CoercionError::Parse(format!(
        "'{}' is not a recognised date/time",
        input
    )))
}

// == Structured Instance ==
/// The stored type name must match `T::TYPE_NAME` exactly.
pub fn to_instance<T: Structured>(value: Value) -> CoercionResult<T> {
    let expected = format!("an instance of {}", T::TYPE_NAME);
    match value {
        Value::Struct { type_name, fields } if type_name == T::TYPE_NAME => {
            serde_json::from_value(fields).map_err(|e| {
                CoercionError::Parse(format!("{} fields: {}", T::TYPE_NAME, e))
            })
        }
        other => Err(CoercionError::Mismatch {
            expected,
            found: other.kind().to_string(),
        }),
    }
}

// == List ==
/// Returns the elements of a list value; anything else is rejected.
pub fn to_list(value: Value) -> CoercionResult<Vec<Value>> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(CoercionError::mismatch("an array", &other)),
    }
}
