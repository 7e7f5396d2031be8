//! Lamina - append-only multi-version document layer
//!
//! Lamina represents every logical entity as an immutable chain of
//! versioned snapshots over a mutable document store: changes append new
//! versions, deletes append tombstones, and the "current" state of an
//! entity is always computed by resolving the latest snapshot that still
//! satisfies a predicate.
//!
//! # Quick Start
//!
//! ```
//! use lamina::{Chronicle, MemoryStore, Predicate, UpdateSpec};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # fn main() -> lamina::Result<()> {
//! let chronicle = Chronicle::new(Arc::new(MemoryStore::new()), "orders");
//!
//! // Create an entity (version 1)
//! let payload = json!({"id": "baz", "count": 0}).as_object().unwrap().clone();
//! chronicle.create(payload)?;
//!
//! // Update it declaratively (appends version 2)
//! let spec = UpdateSpec::from_value(json!({"$set": {"count": 1}}))?;
//! let updated = chronicle.update_one(&Predicate::new().eq("id", "baz"), &spec)?;
//! assert_eq!(updated.version, 2);
//!
//! // Soft-delete appends a tombstone (version 3); nothing is destroyed
//! let tombstone = chronicle.delete_one(&Predicate::new().eq("id", "baz"))?;
//! assert!(tombstone.is_closed());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `lamina-core`: snapshots, predicates, update specs, errors
//! - `lamina-storage`: the [`SnapshotStore`] adapter trait and the sharded
//!   in-memory reference store
//! - `lamina-engine`: the update interpreter, the latest-snapshot
//!   [`Resolver`] and the version-transition [`Chronicle`]
//!
//! This facade re-exports the public API of all three.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use lamina_core::{
    Condition, Error, FieldMap, Predicate, Result, Snapshot, SnapshotId, StoreError,
    UpdateOperator, UpdateSpec, CLOSED_FIELD, DEFAULT_ENTITY_FIELD, VERSION_FIELD,
};
pub use lamina_engine::{apply, interpret, Chronicle, Resolver, Transform};
pub use lamina_storage::{MemoryStore, SnapshotStore};
