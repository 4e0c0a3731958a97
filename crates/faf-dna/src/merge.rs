//! Update merging
//!
//! Two granularities:
//! - dotted keys (`project.goal`) create-or-descend into nested mappings and
//!   set the leaf
//! - plain keys merge shallowly when both sides are mappings, and replace the
//!   value otherwise
//!
//! No schema validation happens here.

use crate::document::ProjectDna;
use crate::path::DottedPath;
use crate::update::UpdateSet;
use serde_json::{Map, Value};

/// Apply an update set to a copy of `dna`
#[must_use]
pub fn merge(dna: &ProjectDna, updates: &UpdateSet) -> ProjectDna {
    let mut candidate = dna.clone();
    for (key, value) in updates.iter() {
        let path = DottedPath::parse(key);
        if path.is_nested() {
            set_path(candidate.as_map_mut(), &path, value.clone());
        } else {
            merge_top_level(candidate.as_map_mut(), key, value);
        }
    }
    candidate
}

fn set_path(root: &mut Map<String, Value>, path: &DottedPath, value: Value) {
    let mut current = root;
    for segment in path.parents() {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => unreachable!("slot was just made a mapping"),
        };
    }
    if let Some(leaf) = path.last() {
        current.insert(leaf.to_string(), value);
    }
}

fn merge_top_level(root: &mut Map<String, Value>, key: &str, value: &Value) {
    match (root.get_mut(key), value) {
        (Some(Value::Object(existing)), Value::Object(incoming)) => {
            for (k, v) in incoming {
                existing.insert(k.clone(), v.clone());
            }
        }
        _ => {
            root.insert(key.to_string(), value.clone());
        }
    }
}
