//! Field access over parsed dump payloads.
//!
//! Every accessor states up front whether the field is optional (returns
//! `Option` or a default) or required (returns `Result`, naming the full path
//! on failure), so the extraction rules in [`crate::authors`] and
//! [`crate::works`] read as a list of required-vs-optional decisions.

use crate::error::RecordError;
use serde_json::{Map, Value};

/// A JSON object together with its path from the payload root.
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
    path: String,
}

impl<'a> Fields<'a> {
    pub fn root(value: &'a Value) -> Result<Self, RecordError> {
        let map = value.as_object().ok_or(RecordError::NotAnObject)?;
        Ok(Self {
            map,
            path: String::new(),
        })
    }

    /// Wraps an array element that must itself be an object.
    pub fn element(value: &'a Value, path: String) -> Result<Self, RecordError> {
        match value.as_object() {
            Some(map) => Ok(Self { map, path }),
            None => Err(RecordError::WrongType {
                path,
                expected: "an object",
            }),
        }
    }

    fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    /// Text value of `key`, or the empty string when absent or null.
    /// Numbers and booleans are rendered as text.
    pub fn text_or_default(&self, key: &str) -> String {
        match self.map.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Raw value of `key` when present and not null
    pub fn value(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    /// Nested object at `key`, or `None` when absent or not an object.
    pub fn object(&self, key: &str) -> Option<Fields<'a>> {
        self.map.get(key).and_then(Value::as_object).map(|map| Fields {
            map,
            path: self.child_path(key),
        })
    }

    pub fn require_object(&self, key: &str) -> Result<Fields<'a>, RecordError> {
        match self.map.get(key) {
            Some(Value::Object(map)) => Ok(Fields {
                map,
                path: self.child_path(key),
            }),
            Some(Value::Null) | None => Err(RecordError::MissingField {
                path: self.child_path(key),
            }),
            Some(_) => Err(RecordError::WrongType {
                path: self.child_path(key),
                expected: "an object",
            }),
        }
    }

    pub fn require_str(&self, key: &str) -> Result<&'a str, RecordError> {
        match self.map.get(key) {
            Some(Value::String(s)) => Ok(s),
            Some(Value::Null) | None => Err(RecordError::MissingField {
                path: self.child_path(key),
            }),
            Some(_) => Err(RecordError::WrongType {
                path: self.child_path(key),
                expected: "a string",
            }),
        }
    }

    /// Array at `key`, or `None` when absent or not an array.
    pub fn array(&self, key: &str) -> Option<(&'a [Value], String)> {
        self.map
            .get(key)
            .and_then(Value::as_array)
            .map(|items| (items.as_slice(), self.child_path(key)))
    }
}

/// Removes a leading key prefix; keys without it come back unchanged.
pub fn strip_key_prefix<'a>(key: &'a str, prefix: &str) -> &'a str {
    key.strip_prefix(prefix).unwrap_or(key)
}
