//! The project DNA document
//!
//! A `.faf` file is YAML whose root is a string-keyed mapping. Internally the
//! document is held as a JSON object so that every downstream projection
//! (JSON payloads, tag markup, YAML write-back) shares one value model.

use crate::error::DnaError;
use crate::path::DottedPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level key holding the ISO-8601 timestamp of the last mutation
pub const GENERATED_KEY: &str = "generated";

/// Literal placeholder that counts as an unfilled slot
pub const PLACEHOLDER: &str = "TBD";

/// Parsed project DNA
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectDna(Map<String, Value>);

impl ProjectDna {
    /// Create an empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing mapping
    #[inline]
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Build from a JSON value
    ///
    /// # Errors
    /// Returns error if the value is not an object
    pub fn from_value(value: Value) -> Result<Self, DnaError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Err(DnaError::Empty),
            other => Err(DnaError::NotAMapping(kind_of(&other))),
        }
    }

    /// Parse from `.faf` YAML text
    ///
    /// # Errors
    /// Returns error if the YAML is invalid, empty, or its root is not a mapping
    pub fn from_yaml(yaml: &str) -> Result<Self, DnaError> {
        if yaml.trim().is_empty() {
            return Err(DnaError::Empty);
        }
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse from JSON text
    ///
    /// # Errors
    /// Returns error if the JSON is invalid or its root is not an object
    pub fn from_json(json: &str) -> Result<Self, DnaError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Encode as `.faf` YAML text
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> Result<String, DnaError> {
        serde_yaml::to_string(&self.0).map_err(|e| DnaError::Serialization(e.to_string()))
    }

    /// Top-level mapping
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Mutable top-level mapping
    #[inline]
    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Consume into the underlying mapping
    #[inline]
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Clone into a JSON value
    #[inline]
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Get a top-level value
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get value at a dotted path
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let path = DottedPath::parse(path);
        let mut segments = path.iter();
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Get a string at a dotted path
    #[inline]
    #[must_use]
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get_path(path).and_then(Value::as_str)
    }

    /// Insert or replace a top-level value
    #[inline]
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Timestamp of the last recorded mutation, if it is a string
    #[inline]
    #[must_use]
    pub fn generated(&self) -> Option<&str> {
        self.get(GENERATED_KEY).and_then(Value::as_str)
    }

    /// Stamp the document with a new mutation timestamp
    #[inline]
    pub fn set_generated(&mut self, timestamp: impl Into<String>) {
        self.0
            .insert(GENERATED_KEY.to_string(), Value::String(timestamp.into()));
    }

    /// Number of top-level keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the document has no keys
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for ProjectDna {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Whether a value counts as present
///
/// Null, `false`, zero, and empty strings, sequences or mappings are absent.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
