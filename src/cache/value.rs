//! Cache Value Module
//!
//! Defines the closed set of value kinds a record can hold.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

// == Value ==
/// A value persisted in a cache record.
///
/// Serialized adjacently tagged, so every record states its kind explicitly:
/// `{"kind":"int","value":42}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
    List(Vec<Value>),
    /// A named structured record. Fields keep the JSON shape of the source type.
    Struct {
        type_name: String,
        fields: serde_json::Value,
    },
}

impl Value {
    // == Kind Name ==
    /// Returns the name of this value's kind, used in error messages.
    pub fn kind(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::DateTime(_) => "date/time",
            Value::List(_) => "list",
            Value::Struct { type_name, .. } => type_name.as_str(),
        }
    }

    // == Structured Instance ==
    /// Wraps a structured type as a `Value::Struct` tagged with its type name.
    ///
    /// Fails with [`CacheError::Serialization`] if the fields would not decode
    /// back into `T`, e.g. a NaN or infinite float field (written as `null`).
    pub fn instance<T: Structured>(instance: &T) -> Result<Self> {
        let fields = serde_json::to_value(instance)?;
        if let Err(e) = serde_json::from_value::<T>(fields.clone()) {
            return Err(CacheError::Serialization(format!(
                "{} does not round-trip: {}",
                T::TYPE_NAME,
                e
            )));
        }

        Ok(Value::Struct {
            type_name: T::TYPE_NAME.to_string(),
            fields,
        })
    }

    /// Builds a list from anything convertible into values.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

// == Structured ==
/// A named record type that can be stored as a structured instance.
///
/// The type name is persisted next to the fields and must match exactly when
/// the instance is read back; no conversion between different types is tried.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Location { lat: f64, lon: f64 }
///
/// impl Structured for Location {
///     const TYPE_NAME: &'static str = "Location";
/// }
/// ```
pub trait Structured: Serialize + DeserializeOwned {
    /// Stable name identifying this type inside a record
    const TYPE_NAME: &'static str;
}

// == Conversions ==
impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::list(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl Structured for Point {
        const TYPE_NAME: &'static str = "Point";
    }

    #[test]
    fn test_serialized_form_is_tagged() {
        let json = serde_json::to_string(&Value::Int(42)).unwrap();
        assert_eq!(json, r#"{"kind":"int","value":42}"#);

        let json = serde_json::to_string(&Value::Null).unwrap();
        assert_eq!(json, r#"{"kind":"null"}"#);
    }

    #[test]
    fn test_instance_carries_type_name() {
        let value = Value::instance(&Point { x: 1, y: 2 }).unwrap();
        match &value {
            Value::Struct { type_name, fields } => {
                assert_eq!(type_name, "Point");
                assert_eq!(fields["x"], 1);
            }
            other => panic!("expected struct, got {:?}", other),
        }
        assert_eq!(value.kind(), "Point");
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Reading {
        v: f64,
    }

    impl Structured for Reading {
        const TYPE_NAME: &'static str = "Reading";
    }

    #[test]
    fn test_instance_rejects_non_finite_field() {
        let err = Value::instance(&Reading { v: f64::NAN }).unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
        assert!(Value::instance(&Reading { v: 1.5 }).is_ok());
    }

    #[test]
    fn test_list_from_mixed_sources() {
        let value = Value::List(vec![1.into(), "2".into(), 3.0.into()]);
        assert_eq!(value.kind(), "list");
        assert_eq!(Value::from(vec![1, 2]), Value::list([1, 2]));
    }

    #[test]
    fn test_date_time_round_trips_through_json() {
        let dt = Utc.with_ymd_and_hms(1988, 4, 5, 12, 30, 0).unwrap();
        let json = serde_json::to_string(&Value::from(dt)).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::DateTime(dt));
    }

    #[test]
    fn test_option_maps_none_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".to_string()));
    }
}
