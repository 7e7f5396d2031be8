//! In-memory reference store
//!
//! Sharded by collection via DashMap: operations on different collections
//! never contend, and a collection's snapshots live in insertion order
//! behind its shard entry, which is what makes the append-only discipline
//! observable (the version chain of an entity is a subsequence of the
//! shard's insertion order).
//!
//! # Uniqueness constraint
//!
//! Each shard keeps an FxHashSet index of `(entity, version)` pairs and
//! rejects an insert that would duplicate one with
//! [`StoreError::VersionConflict`]. This is the store-level answer to
//! read-then-insert races on one entity: the second writer's insert fails
//! instead of silently producing two snapshots with the same version.
//! Snapshots without the entity field are exempt (they have no chain to
//! protect).
//!
//! # Batch writes
//!
//! `insert_many` validates the whole batch (against the index and against
//! itself) before applying anything, so a failed batch inserts nothing.

use dashmap::DashMap;
use lamina_core::{Predicate, Snapshot, SnapshotId, StoreError, DEFAULT_ENTITY_FIELD};
use rustc_hash::FxHashSet;

use crate::adapter::SnapshotStore;

/// Per-collection shard: snapshots in insertion order plus the
/// `(entity, version)` uniqueness index
#[derive(Debug, Default)]
struct Shard {
    snapshots: Vec<Snapshot>,
    versions: FxHashSet<(String, u64)>,
}

impl Shard {
    /// Reject a snapshot that would duplicate an indexed (entity, version)
    fn check(&self, entity_field: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        if let Some(entity) = entity_key(snapshot, entity_field) {
            if self.versions.contains(&(entity.clone(), snapshot.version)) {
                return Err(StoreError::VersionConflict {
                    entity,
                    version: snapshot.version,
                });
            }
        }
        Ok(())
    }

    /// Assign a storage id, index and append; returns the stored snapshot
    fn admit(&mut self, entity_field: &str, mut snapshot: Snapshot) -> Snapshot {
        snapshot.storage_id = Some(SnapshotId::new());
        if let Some(entity) = entity_key(&snapshot, entity_field) {
            self.versions.insert((entity, snapshot.version));
        }
        self.snapshots.push(snapshot.clone());
        snapshot
    }
}

/// Grouping key for a snapshot: canonical rendering of its entity value
fn entity_key(snapshot: &Snapshot, entity_field: &str) -> Option<String> {
    snapshot.entity(entity_field).map(|value| value.to_string())
}

/// Sharded in-memory store adapter
///
/// The reference implementation of [`SnapshotStore`]. Safe to share across
/// threads; each collection is an independent shard.
///
/// # Examples
///
/// ```
/// use lamina_storage::{MemoryStore, SnapshotStore};
/// use lamina_core::{Predicate, Snapshot};
/// use serde_json::json;
///
/// let store = MemoryStore::new();
/// let fields = json!({"id": "baz", "count": 0});
/// let snapshot = Snapshot::first(fields.as_object().unwrap().clone());
/// let inserted = store.insert_one("orders", snapshot).unwrap();
/// assert!(inserted.storage_id.is_some());
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    collections: DashMap<String, Shard>,
    entity_field: String,
}

impl MemoryStore {
    /// Create a store grouping entities by the default `"id"` field
    pub fn new() -> Self {
        Self::with_entity_field(DEFAULT_ENTITY_FIELD)
    }

    /// Create a store grouping entities by a custom payload field
    pub fn with_entity_field(entity_field: impl Into<String>) -> Self {
        MemoryStore {
            collections: DashMap::new(),
            entity_field: entity_field.into(),
        }
    }

    /// The payload field this store groups and constrains entities by
    pub fn entity_field(&self) -> &str {
        &self.entity_field
    }

    /// Every snapshot of a collection, in insertion order
    ///
    /// Empty for an unknown collection. Intended for inspection and tests;
    /// the resolver never reads through this.
    pub fn history(&self, collection: &str) -> Vec<Snapshot> {
        self.collections
            .get(collection)
            .map(|shard| shard.snapshots.clone())
            .unwrap_or_default()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for MemoryStore {
    fn insert_one(&self, collection: &str, snapshot: Snapshot) -> Result<Snapshot, StoreError> {
        let mut shard = self.collections.entry(collection.to_string()).or_default();
        shard.check(&self.entity_field, &snapshot)?;
        Ok(shard.admit(&self.entity_field, snapshot))
    }

    fn insert_many(
        &self,
        collection: &str,
        snapshots: Vec<Snapshot>,
    ) -> Result<Vec<Snapshot>, StoreError> {
        let mut shard = self.collections.entry(collection.to_string()).or_default();

        // Validate the batch fully, including against itself, before
        // applying anything
        let mut pending: FxHashSet<(String, u64)> = FxHashSet::default();
        for snapshot in &snapshots {
            shard.check(&self.entity_field, snapshot)?;
            if let Some(entity) = entity_key(snapshot, &self.entity_field) {
                if !pending.insert((entity.clone(), snapshot.version)) {
                    return Err(StoreError::VersionConflict {
                        entity,
                        version: snapshot.version,
                    });
                }
            }
        }

        Ok(snapshots
            .into_iter()
            .map(|snapshot| shard.admit(&self.entity_field, snapshot))
            .collect())
    }

    fn find_sorted(
        &self,
        collection: &str,
        predicate: &Predicate,
        limit: usize,
    ) -> Result<Vec<Snapshot>, StoreError> {
        let Some(shard) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<Snapshot> = shard
            .snapshots
            .iter()
            .filter(|snapshot| predicate.matches(snapshot))
            .cloned()
            .collect();
        // Stable sort: ties on version keep insertion order
        hits.sort_by(|a, b| b.version.cmp(&a.version));
        hits.truncate(limit);
        Ok(hits)
    }

    fn latest_per_entity(
        &self,
        collection: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Snapshot>, StoreError> {
        let Some(shard) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        // Stage 1: order ALL snapshots by version descending (stable)
        let mut ordered: Vec<&Snapshot> = shard.snapshots.iter().collect();
        ordered.sort_by(|a, b| b.version.cmp(&a.version));

        // Stage 2: filter to predicate survivors; stage 3: group by entity,
        // keeping the first (highest-version) survivor per group. The stage
        // order is what makes "latest matching" differ from "latest":
        // a newer non-matching snapshot never shadows an older match.
        let mut seen: FxHashSet<Option<String>> = FxHashSet::default();
        let mut latest = Vec::new();
        for snapshot in ordered {
            if !predicate.matches(snapshot) {
                continue;
            }
            let group = entity_key(snapshot, &self.entity_field);
            if seen.insert(group) {
                latest.push(snapshot.clone());
            }
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_core::FieldMap;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> FieldMap {
        value.as_object().expect("object").clone()
    }

    fn insert(store: &MemoryStore, version: u64, payload: serde_json::Value) -> Snapshot {
        store
            .insert_one("test", Snapshot::at_version(version, fields(payload)))
            .unwrap()
    }

    #[test]
    fn test_insert_assigns_storage_id() {
        let store = MemoryStore::new();
        let inserted = insert(&store, 1, json!({"id": "a"}));
        assert!(inserted.storage_id.is_some());
        assert_eq!(store.history("test").len(), 1);
    }

    #[test]
    fn test_unknown_collection_reads_empty() {
        let store = MemoryStore::new();
        assert!(store.find_sorted("nope", &Predicate::new(), 10).unwrap().is_empty());
        assert!(store.latest_per_entity("nope", &Predicate::new()).unwrap().is_empty());
        assert!(store.history("nope").is_empty());
    }

    #[test]
    fn test_find_sorted_descends_and_limits() {
        let store = MemoryStore::new();
        insert(&store, 1, json!({"id": "a"}));
        insert(&store, 3, json!({"id": "a"}));
        insert(&store, 2, json!({"id": "a"}));

        let hits = store.find_sorted("test", &Predicate::new(), 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].version, 3);
        assert_eq!(hits[1].version, 2);
    }

    #[test]
    fn test_latest_per_entity_keeps_one_per_entity() {
        let store = MemoryStore::new();
        insert(&store, 1, json!({"id": "a", "count": 1}));
        insert(&store, 2, json!({"id": "a", "count": 2}));
        insert(&store, 1, json!({"id": "b", "count": 10}));

        let latest = store
            .latest_per_entity("test", &Predicate::new())
            .unwrap();
        assert_eq!(latest.len(), 2);

        let a = latest.iter().find(|s| s.field("id") == Some(&json!("a"))).unwrap();
        assert_eq!(a.version, 2);
        let b = latest.iter().find(|s| s.field("id") == Some(&json!("b"))).unwrap();
        assert_eq!(b.version, 1);
    }

    #[test]
    fn test_latest_per_entity_filters_before_grouping() {
        // The newest snapshot of "a" has the flag; the predicate excludes
        // it, so the older unflagged snapshot must surface
        let store = MemoryStore::new();
        insert(&store, 1, json!({"id": "a", "x": 1}));
        insert(&store, 2, json!({"id": "a", "x": 1, "flag": true}));

        let latest = store
            .latest_per_entity("test", &Predicate::new().absent("flag"))
            .unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].version, 1);
    }

    #[test]
    fn test_missing_entity_field_groups_as_one() {
        let store = MemoryStore::new();
        insert(&store, 1, json!({"a": 1}));
        insert(&store, 2, json!({"b": 2}));

        let latest = store.latest_per_entity("test", &Predicate::new()).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].version, 2);
    }

    #[test]
    fn test_version_conflict_rejected() {
        let store = MemoryStore::new();
        insert(&store, 1, json!({"id": "a"}));

        let dup = Snapshot::at_version(1, fields(json!({"id": "a", "other": true})));
        let err = store.insert_one("test", dup).unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict { version: 1, .. }
        ));
        assert_eq!(store.history("test").len(), 1);
    }

    #[test]
    fn test_conflicting_batch_inserts_nothing() {
        let store = MemoryStore::new();
        insert(&store, 1, json!({"id": "a"}));

        let batch = vec![
            Snapshot::at_version(2, fields(json!({"id": "a"}))),
            Snapshot::at_version(1, fields(json!({"id": "a"}))), // conflicts
        ];
        assert!(store.insert_many("test", batch).is_err());
        assert_eq!(store.history("test").len(), 1);
    }

    #[test]
    fn test_batch_self_conflict_detected() {
        let store = MemoryStore::new();
        let batch = vec![
            Snapshot::at_version(1, fields(json!({"id": "a"}))),
            Snapshot::at_version(1, fields(json!({"id": "a"}))),
        ];
        assert!(store.insert_many("test", batch).is_err());
        assert!(store.history("test").is_empty());
    }

    #[test]
    fn test_snapshots_without_entity_field_bypass_constraint() {
        let store = MemoryStore::new();
        insert(&store, 1, json!({"a": 1}));
        insert(&store, 1, json!({"b": 2}));
        assert_eq!(store.history("test").len(), 2);
    }

    #[test]
    fn test_custom_entity_field() {
        let store = MemoryStore::with_entity_field("sku");
        store
            .insert_one("test", Snapshot::at_version(1, fields(json!({"sku": "x-1"}))))
            .unwrap();
        store
            .insert_one("test", Snapshot::at_version(2, fields(json!({"sku": "x-1"}))))
            .unwrap();

        let latest = store.latest_per_entity("test", &Predicate::new()).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].version, 2);
    }
}
