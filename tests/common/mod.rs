//! Shared helpers for workspace-level suites

use lamina::{Chronicle, FieldMap, MemoryStore};
use serde_json::Value;
use std::sync::Arc;

/// Build a payload map from a JSON object literal
pub fn fields(value: Value) -> FieldMap {
    value.as_object().expect("test payload is an object").clone()
}

/// A fresh in-memory store and a chronicle over one collection
pub fn setup(collection: &str) -> (Arc<MemoryStore>, Chronicle<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let chronicle = Chronicle::new(Arc::clone(&store), collection);
    (store, chronicle)
}

/// Sort snapshots by their "id" payload field for order-insensitive asserts
pub fn sort_by_id(snapshots: &mut [lamina::Snapshot]) {
    snapshots.sort_by_key(|s| {
        s.field("id")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_default()
    });
}
