//! Mapping between caller records and table rows.
//!
//! A row is a [`FieldMap`] keyed by column name. Any `serde` type maps to and
//! from rows by field name, so `#[derive(Serialize, Deserialize)]` is all a
//! record type needs. Columns missing from a projection should be marked
//! `#[serde(default)]` on the record type.

use crate::error::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// A table row or a flattened record, keyed by column name.
pub type FieldMap = serde_json::Map<String, Value>;

/// A type that can be flattened into a row and rebuilt from one.
pub trait Record: Sized {
    /// Flatten into a column → value mapping.
    fn to_fields(&self) -> Result<FieldMap>;

    /// Rebuild from a row.
    fn from_fields(fields: FieldMap) -> Result<Self>;
}

impl<T> Record for T
where
    T: Serialize + DeserializeOwned,
{
    fn to_fields(&self) -> Result<FieldMap> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            other => Err(Error::Mapping(format!(
                "record must flatten to an object, got {}",
                type_name(&other)
            ))),
        }
    }

    fn from_fields(fields: FieldMap) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}

/// Render a primary-key value as a string. Empty and null keys yield `None`.
pub fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Decode a scalar column value as an unsigned version number.
pub(crate) fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_i64().map(|v| v.max(0) as u64))
            .or_else(|| n.as_f64().map(|v| v.max(0.0) as u64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(u64::from(*b)),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
