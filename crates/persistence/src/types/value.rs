//! Dynamic payload and row values.
//!
//! Request bodies arrive as arbitrary JSON objects whose keys are only
//! known once the target table has been introspected. [`Payload`] is the
//! typed form of such a body: an ordered mapping from column name to a
//! small tagged [`FieldValue`] union. Values are never coerced here; type
//! conversion is left to the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::ValidationError;

/// A stored row as returned by the store, keyed by column name.
pub type Row = Map<String, Value>;

/// A single value in a request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// SQL `NULL`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A JSON number, integer or floating point.
    Number(Number),
    /// A string.
    String(String),
    /// A nested array or object, stored as-is.
    Structured(Value),
}

impl FieldValue {
    /// Returns `true` for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Returns the value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Converts the value back into JSON.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Number(n) => Value::Number(n.clone()),
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Structured(v) => v.clone(),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => FieldValue::Number(n),
            Value::String(s) => FieldValue::String(s),
            other => FieldValue::Structured(other),
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(b),
            FieldValue::Number(n) => Value::Number(n),
            FieldValue::String(s) => Value::String(s),
            FieldValue::Structured(v) => v,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

/// A typed request payload: column name to value, in key order.
///
/// ```
/// use novabase_persistence::types::{FieldValue, Payload};
/// use serde_json::json;
///
/// let payload = Payload::from_json(json!({"title": "hello", "done": false})).unwrap();
/// assert_eq!(payload.len(), 2);
/// assert_eq!(payload.get("title"), Some(&FieldValue::from("hello")));
///
/// assert!(Payload::from_json(json!(["not", "an", "object"])).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, FieldValue>);

impl Payload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a raw request body into a payload.
    ///
    /// Fails with [`ValidationError::InvalidPayload`] unless the body is a JSON object.
    pub fn from_json(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(map) => Ok(Self(
                map.into_iter()
                    .map(|(key, value)| (key, FieldValue::from(value)))
                    .collect(),
            )),
            _ => Err(ValidationError::InvalidPayload),
        }
    }

    /// Returns the value for a column.
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.0.get(column)
    }

    /// Sets the value for a column, returning the previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.0.insert(column.into(), value)
    }

    /// Removes a column from the payload.
    pub fn remove(&mut self, column: &str) -> Option<FieldValue> {
        self.0.remove(column)
    }

    /// Returns `true` if the payload names the column.
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Iterates over the column names, in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates over `(column, value)` pairs, in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns in the payload.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the payload names no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts the payload into a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, FieldValue)> for Payload {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_value_from_json() {
        assert_eq!(FieldValue::from(json!(null)), FieldValue::Null);
        assert_eq!(FieldValue::from(json!(true)), FieldValue::Bool(true));
        assert_eq!(FieldValue::from(json!("x")), FieldValue::String("x".into()));
        assert!(matches!(FieldValue::from(json!(42)), FieldValue::Number(_)));
        assert_eq!(
            FieldValue::from(json!({"a": [1, 2]})),
            FieldValue::Structured(json!({"a": [1, 2]}))
        );
    }

    #[test]
    fn test_payload_rejects_non_objects() {
        for body in [json!(null), json!(1), json!("x"), json!([{"a": 1}])] {
            assert_eq!(Payload::from_json(body), Err(ValidationError::InvalidPayload));
        }
    }

    #[test]
    fn test_payload_preserves_values() {
        let body = json!({"title": "hello", "meta": {"tags": ["a"]}, "count": 3, "gone": null});
        let payload = Payload::from_json(body.clone()).unwrap();
        assert_eq!(payload.to_json(), body);
        assert!(payload.get("gone").unwrap().is_null());
    }

    #[test]
    fn test_payload_columns_are_ordered() {
        let payload = Payload::from_json(json!({"b": 1, "a": 2, "c": 3})).unwrap();
        let columns: Vec<_> = payload.columns().collect();
        assert_eq!(columns, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_payload_serializes_transparently() {
        let mut payload = Payload::new();
        payload.insert("title", "hi".into());
        assert_eq!(serde_json::to_value(&payload).unwrap(), json!({"title": "hi"}));
    }
}
