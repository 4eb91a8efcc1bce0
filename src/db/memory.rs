// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store used for tests and offline development.
//!
//! Mirrors the Firestore behaviour the rest of the crate relies on:
//! ascending `order_by` drops documents lacking the field, ties fall back to
//! document key order, and dotted field paths address nested maps.

use crate::db::UpdatePolicy;
use crate::error::StoreError;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
    }

    pub fn list(
        &self,
        collection: &str,
        order_by: Option<&str>,
        limit: Option<u32>,
    ) -> Vec<(String, Value)> {
        let mut docs: Vec<(String, Value)> = self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, value)| (id.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        if let Some(field) = order_by {
            docs.retain(|(_, value)| lookup(value, field).is_some());
            docs.sort_by(|(_, a), (_, b)| match (lookup(a, field), lookup(b, field)) {
                (Some(a), Some(b)) => compare_values(a, b),
                _ => Ordering::Equal,
            });
        }

        if let Some(limit) = limit {
            docs.truncate(limit as usize);
        }

        docs
    }

    /// Create or replace a whole document.
    pub fn put(&self, collection: &str, id: &str, value: Value) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), value);
    }

    /// Write only `field_paths`, taking values from `partial`. A path absent
    /// from `partial` deletes the stored field.
    pub fn update_fields(
        &self,
        collection: &str,
        id: &str,
        partial: &Value,
        field_paths: &[&str],
        policy: UpdatePolicy,
    ) -> Result<(), StoreError> {
        let mut docs = self.collections.entry(collection.to_string()).or_default();

        if policy == UpdatePolicy::FailIfMissing && !docs.contains_key(id) {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        let target = docs
            .entry(id.to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        for path in field_paths {
            assign(target, path, lookup(partial, path).cloned());
        }

        Ok(())
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
}

fn assign(target: &mut Value, path: &str, new_value: Option<Value>) {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = target;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        match new_value {
            Some(value) => {
                map.insert(last.to_string(), value);
            }
            None => {
                map.remove(*last);
            }
        }
    }
}

/// Firestore cross-type ordering: null < bool < number < string < array < map.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_orders_and_limits() {
        let store = MemoryStore::new();
        store.put("h", "a", json!({"date": "2025-09-01"}));
        store.put("h", "b", json!({"date": "2025-07-20"}));
        store.put("h", "c", json!({"name": "no date"}));
        store.put("h", "d", json!({"date": "2025-08-15"}));

        let ids: Vec<String> = store
            .list("h", Some("date"), Some(2))
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        assert_eq!(ids, vec!["b", "d"]);
    }

    #[test]
    fn test_list_unknown_collection_is_empty() {
        let store = MemoryStore::new();
        assert!(store.list("nothing", None, None).is_empty());
    }

    #[test]
    fn test_update_fields_touches_only_named_paths() {
        let store = MemoryStore::new();
        store.put(
            "users",
            "u1",
            json!({"role": "user", "sessionData": {"resumeUploaded": true, "lastActive": "old"}}),
        );

        store
            .update_fields(
                "users",
                "u1",
                &json!({"lastActive": "now", "sessionData": {"lastActive": "now"}}),
                &["lastActive", "sessionData.lastActive"],
                UpdatePolicy::FailIfMissing,
            )
            .unwrap();

        let doc = store.get("users", "u1").unwrap();
        assert_eq!(doc["role"], "user");
        assert_eq!(doc["lastActive"], "now");
        assert_eq!(doc["sessionData"]["lastActive"], "now");
        assert_eq!(doc["sessionData"]["resumeUploaded"], true);
    }

    #[test]
    fn test_update_fields_missing_document_policy() {
        let store = MemoryStore::new();

        let err = store
            .update_fields(
                "users",
                "ghost",
                &json!({"role": "admin"}),
                &["role"],
                UpdatePolicy::FailIfMissing,
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(store.get("users", "ghost").is_none());

        store
            .update_fields(
                "users",
                "ghost",
                &json!({"role": "admin"}),
                &["role"],
                UpdatePolicy::Upsert,
            )
            .unwrap();
        assert_eq!(store.get("users", "ghost").unwrap(), json!({"role": "admin"}));
    }
}
