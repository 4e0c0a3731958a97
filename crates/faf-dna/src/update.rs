//! Caller-supplied update sets

use crate::error::DnaError;
use crate::path::DottedPath;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered mapping from dotted paths (or top-level keys) to new values
///
/// Entries are applied in the order the caller supplied them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateSet(IndexMap<String, Value>);

impl UpdateSet {
    /// Create an empty update set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a JSON object
    ///
    /// # Errors
    /// Returns error if the JSON is invalid or not an object
    pub fn from_json(json: &str) -> Result<Self, DnaError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Build from a JSON value
    ///
    /// # Errors
    /// Returns error if the value is not an object
    pub fn from_value(value: Value) -> Result<Self, DnaError> {
        match value {
            Value::Object(map) => Ok(Self(map.into_iter().collect())),
            Value::Null => Err(DnaError::Empty),
            _ => Err(DnaError::NotAMapping("non-object update set")),
        }
    }

    /// Add an entry, builder style
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Add or replace an entry
    #[inline]
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Whether there is nothing to apply
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate entries in application order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Update keys exactly as supplied
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Distinct top-level keys touched, in first-seen order
    #[must_use]
    pub fn top_level_keys(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for key in self.0.keys() {
            let head = DottedPath::parse(key).first().unwrap_or_default().to_string();
            if !seen.contains(&head) {
                seen.push(head);
            }
        }
        seen
    }

    /// One-line summary for logs and audit records
    #[must_use]
    pub fn summary(&self) -> String {
        self.0.keys().cloned().collect::<Vec<_>>().join(",")
    }
}

impl FromIterator<(String, Value)> for UpdateSet {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
