//! Version-Transition Engine
//!
//! [`Chronicle`] orchestrates the three transitions of an entity chain:
//! create (version 1), update (resolve latest, transform payload, insert
//! `version + 1`) and soft-delete (insert a tombstone). It never mutates or
//! deletes stored snapshots; every transition is an insert.
//!
//! ## Design: stateless facade
//!
//! A `Chronicle` holds only `Arc<S>`, the collection name and a
//! [`Resolver`]. No caches, no locks; it can be cloned and shared across
//! threads. Within one call the resolve happens-before the insert, but
//! concurrent calls against the same entity are not serialized here: two
//! racing writers can both resolve version n and both try to insert
//! version n + 1. The store adapter decides whether the second insert is
//! rejected (the reference store's uniqueness constraint) and the engine
//! never retries; conflict handling is the caller's policy.
//!
//! State machine per entity:
//!
//! ```text
//! absent → live(v=1) → live(v=2) → … → live(v=n) → closed(v=n+1)
//! ```
//!
//! There is no transition out of `closed`. A later update whose predicate
//! still matches the tombstone chains past it (the core does not
//! special-case reopening); a predicate excluding `closed` simply stops
//! matching the entity.

use crate::interpret::{apply, interpret};
use crate::resolve::Resolver;
use lamina_core::{
    Error, FieldMap, Predicate, Result, Snapshot, UpdateSpec, CLOSED_FIELD,
};
use lamina_storage::SnapshotStore;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Version-transition engine for one store collection
///
/// # Examples
///
/// ```
/// use lamina_engine::Chronicle;
/// use lamina_storage::MemoryStore;
/// use lamina_core::{Predicate, UpdateSpec};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # fn main() -> lamina_core::Result<()> {
/// let chronicle = Chronicle::new(Arc::new(MemoryStore::new()), "orders");
///
/// let fields = json!({"id": "baz", "count": 0}).as_object().unwrap().clone();
/// let created = chronicle.create(fields)?;
/// assert_eq!(created.version, 1);
///
/// let spec = UpdateSpec::from_value(json!({"count": 1}))?;
/// let updated = chronicle.update_one(&Predicate::new().eq("id", "baz"), &spec)?;
/// assert_eq!(updated.version, 2);
/// # Ok(())
/// # }
/// ```
pub struct Chronicle<S> {
    store: Arc<S>,
    collection: String,
    resolver: Resolver<S>,
}

impl<S> Clone for Chronicle<S> {
    fn clone(&self) -> Self {
        Chronicle {
            store: Arc::clone(&self.store),
            collection: self.collection.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

impl<S: SnapshotStore> Chronicle<S> {
    /// Create a chronicle over one collection
    pub fn new(store: Arc<S>, collection: impl Into<String>) -> Self {
        let collection = collection.into();
        Chronicle {
            resolver: Resolver::new(Arc::clone(&store), collection.clone()),
            store,
            collection,
        }
    }

    /// The collection this chronicle writes
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Latest snapshot satisfying the predicate (read-only)
    ///
    /// # Errors
    ///
    /// [`Error::StoreUnavailable`] if the store read fails.
    pub fn resolve_one(&self, predicate: &Predicate) -> Result<Option<Snapshot>> {
        self.resolver.resolve_one(predicate)
    }

    /// Latest matching snapshot per distinct entity (read-only)
    ///
    /// # Errors
    ///
    /// [`Error::StoreUnavailable`] if the store read fails.
    pub fn resolve_many(&self, predicate: &Predicate) -> Result<Vec<Snapshot>> {
        self.resolver.resolve_many(predicate)
    }

    /// Start a new entity chain at version 1
    ///
    /// The payload is taken as given, minus reserved keys: a caller-supplied
    /// `"version"` is stripped, never honored. No prior-state read happens.
    ///
    /// # Errors
    ///
    /// [`Error::StorageFailed`] if the insert fails.
    pub fn create(&self, fields: FieldMap) -> Result<Snapshot> {
        let inserted = self
            .store
            .insert_one(&self.collection, Snapshot::first(fields))
            .map_err(|e| Error::store_write("create", e))?;
        debug!(collection = %self.collection, "created entity chain");
        Ok(inserted)
    }

    /// Start a chain per payload, independently, in input order
    ///
    /// Every snapshot gets version 1. The insert is one batch; a failing
    /// batch fails the whole call as reported by the store adapter rather
    /// than silently dropping documents.
    ///
    /// # Errors
    ///
    /// [`Error::StorageFailed`] if the batch insert fails.
    pub fn create_batch(&self, payloads: Vec<FieldMap>) -> Result<Vec<Snapshot>> {
        let snapshots = payloads.into_iter().map(Snapshot::first).collect();
        let inserted = self
            .store
            .insert_many(&self.collection, snapshots)
            .map_err(|e| Error::store_write("create_batch", e))?;
        debug!(collection = %self.collection, count = inserted.len(), "created entity chains");
        Ok(inserted)
    }

    /// Advance the latest matching snapshot by one version
    ///
    /// Resolves the latest snapshot satisfying the predicate, folds the
    /// interpreted transforms over its payload (storage id already
    /// stripped by construction) and inserts the result at `version + 1`.
    /// The resolve-then-transform steps are not retried on a failed insert.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if nothing matches the predicate
    /// - [`Error::StoreUnavailable`] if the resolve read fails
    /// - [`Error::StorageFailed`] if the insert fails
    pub fn update_one(&self, predicate: &Predicate, spec: &UpdateSpec) -> Result<Snapshot> {
        let transforms = interpret(spec);
        let latest = self
            .resolver
            .resolve_one(predicate)?
            .ok_or_else(|| not_found(predicate))?;

        let next = latest.successor(apply(&transforms, latest.fields.clone()));
        let inserted = self
            .store
            .insert_one(&self.collection, next)
            .map_err(|e| Error::store_write("update_one", e))?;
        debug!(collection = %self.collection, version = inserted.version, "advanced entity chain");
        Ok(inserted)
    }

    /// Advance every matching entity by one version with the same spec
    ///
    /// Each resolved snapshot is transformed independently; the tombstone
    /// flag is explicitly reset to `closed: false` on every successor. All
    /// successors insert as one batch. A predicate matching nothing is a
    /// no-op, not an error.
    ///
    /// # Errors
    ///
    /// - [`Error::StoreUnavailable`] if the resolve read fails
    /// - [`Error::StorageFailed`] if the batch insert fails
    pub fn update_many(&self, predicate: &Predicate, spec: &UpdateSpec) -> Result<Vec<Snapshot>> {
        let transforms = interpret(spec);
        let latest = self.resolver.resolve_many(predicate)?;

        let successors: Vec<Snapshot> = latest
            .into_iter()
            .map(|snapshot| {
                let mut fields = apply(&transforms, snapshot.fields.clone());
                fields.insert(CLOSED_FIELD.to_string(), Value::Bool(false));
                snapshot.successor(fields)
            })
            .collect();
        if successors.is_empty() {
            return Ok(Vec::new());
        }

        let inserted = self
            .store
            .insert_many(&self.collection, successors)
            .map_err(|e| Error::store_write("update_many", e))?;
        debug!(collection = %self.collection, count = inserted.len(), "advanced entity chains");
        Ok(inserted)
    }

    /// Soft-delete the latest matching snapshot
    ///
    /// Inserts a tombstone: every payload field carried forward,
    /// `closed: true`, `version + 1`. The tombstone remains queryable; no
    /// stored snapshot is touched.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if nothing matches the predicate
    /// - [`Error::StoreUnavailable`] if the resolve read fails
    /// - [`Error::StorageFailed`] if the insert fails
    pub fn delete_one(&self, predicate: &Predicate) -> Result<Snapshot> {
        let latest = self
            .resolver
            .resolve_one(predicate)?
            .ok_or_else(|| not_found(predicate))?;

        let inserted = self
            .store
            .insert_one(&self.collection, latest.tombstone())
            .map_err(|e| Error::store_write("delete_one", e))?;
        debug!(collection = %self.collection, version = inserted.version, "closed entity chain");
        Ok(inserted)
    }

    /// Soft-delete every matching entity
    ///
    /// Batch analogue of [`Chronicle::delete_one`]: every resolved entity
    /// gets its own tombstone, inserted as one batch.
    ///
    /// # Errors
    ///
    /// - [`Error::StoreUnavailable`] if the resolve read fails
    /// - [`Error::StorageFailed`] if the batch insert fails
    pub fn delete_many(&self, predicate: &Predicate) -> Result<Vec<Snapshot>> {
        let latest = self.resolver.resolve_many(predicate)?;
        let tombstones: Vec<Snapshot> = latest.iter().map(Snapshot::tombstone).collect();
        if tombstones.is_empty() {
            return Ok(Vec::new());
        }

        let inserted = self
            .store
            .insert_many(&self.collection, tombstones)
            .map_err(|e| Error::store_write("delete_many", e))?;
        debug!(collection = %self.collection, count = inserted.len(), "closed entity chains");
        Ok(inserted)
    }
}

fn not_found(predicate: &Predicate) -> Error {
    Error::NotFound {
        predicate: predicate.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_storage::MemoryStore;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> FieldMap {
        value.as_object().expect("object").clone()
    }

    fn chronicle() -> Chronicle<MemoryStore> {
        Chronicle::new(Arc::new(MemoryStore::new()), "test")
    }

    #[test]
    fn test_create_assigns_version_one() {
        let chronicle = chronicle();
        let created = chronicle.create(fields(json!({"id": "a", "count": 0}))).unwrap();
        assert_eq!(created.version, 1);
        assert!(created.storage_id.is_some());
    }

    #[test]
    fn test_create_ignores_caller_version() {
        let chronicle = chronicle();
        let created = chronicle.create(fields(json!({"id": "a", "version": 40}))).unwrap();
        assert_eq!(created.version, 1);
    }

    #[test]
    fn test_update_one_not_found() {
        let chronicle = chronicle();
        let spec = UpdateSpec::merge(fields(json!({"count": 1})));
        let err = chronicle
            .update_one(&Predicate::new().eq("id", "ghost"), &spec)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_update_one_advances_version() {
        let chronicle = chronicle();
        chronicle.create(fields(json!({"id": "a", "count": 0}))).unwrap();

        let spec = UpdateSpec::merge(fields(json!({"count": 1})));
        let updated = chronicle
            .update_one(&Predicate::new().eq("id", "a"), &spec)
            .unwrap();

        assert_eq!(updated.version, 2);
        assert_eq!(updated.field("count"), Some(&json!(1)));
        assert_eq!(updated.field("id"), Some(&json!("a")));
    }

    #[test]
    fn test_update_one_does_not_carry_storage_id_forward() {
        let chronicle = chronicle();
        let created = chronicle.create(fields(json!({"id": "a"}))).unwrap();

        let spec = UpdateSpec::merge(fields(json!({"count": 1})));
        let updated = chronicle
            .update_one(&Predicate::new().eq("id", "a"), &spec)
            .unwrap();

        assert_ne!(updated.storage_id, created.storage_id);
        assert!(updated.field("storage_id").is_none());
    }

    #[test]
    fn test_update_many_resets_closed() {
        let chronicle = chronicle();
        chronicle.create(fields(json!({"id": "a"}))).unwrap();

        let spec = UpdateSpec::merge(fields(json!({"n": 1})));
        let updated = chronicle
            .update_many(&Predicate::new().eq("id", "a"), &spec)
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].field(CLOSED_FIELD), Some(&json!(false)));
        assert_eq!(updated[0].version, 2);
    }

    #[test]
    fn test_update_many_empty_match_is_noop() {
        let chronicle = chronicle();
        let spec = UpdateSpec::merge(fields(json!({"n": 1})));
        let updated = chronicle
            .update_many(&Predicate::new().eq("id", "nobody"), &spec)
            .unwrap();
        assert!(updated.is_empty());
    }

    #[test]
    fn test_delete_one_inserts_tombstone() {
        let chronicle = chronicle();
        chronicle.create(fields(json!({"id": "a", "count": 7}))).unwrap();

        let deleted = chronicle.delete_one(&Predicate::new().eq("id", "a")).unwrap();
        assert_eq!(deleted.version, 2);
        assert!(deleted.is_closed());
        assert_eq!(deleted.field("count"), Some(&json!(7)));
    }

    #[test]
    fn test_delete_one_not_found() {
        let chronicle = chronicle();
        let err = chronicle
            .delete_one(&Predicate::new().eq("id", "ghost"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_racing_writers_surface_version_conflict() {
        // Both writers resolve version 1, both try to insert version 2;
        // the second insert hits the store's uniqueness constraint
        let store = Arc::new(MemoryStore::new());
        let chronicle = Chronicle::new(Arc::clone(&store), "test");
        chronicle.create(fields(json!({"id": "a", "n": 0}))).unwrap();

        let first = chronicle.resolve_one(&Predicate::new().eq("id", "a")).unwrap().unwrap();
        let second = first.clone();

        let insert = |snapshot: Snapshot, n: i64| {
            let mut payload = snapshot.fields.clone();
            payload.insert("n".to_string(), json!(n));
            store.insert_one("test", snapshot.successor(payload))
        };

        insert(first, 1).unwrap();
        let err = insert(second, 2).unwrap_err();
        assert!(matches!(
            err,
            lamina_core::StoreError::VersionConflict { version: 2, .. }
        ));
    }
}
