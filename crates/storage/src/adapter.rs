//! Store adapter abstraction
//!
//! This module defines the [`SnapshotStore`] trait that the resolver and
//! transition engine are written against. It enables swapping the
//! reference in-memory store for a document database adapter without
//! breaking the upper layers.
//!
//! The store is treated as append-only: the core only ever inserts and
//! reads, never updates or deletes in place. Adapters own two policies the
//! core deliberately does not:
//! - which payload field identifies the entity (the aggregation grouping
//!   key, a caller convention such as `"id"`)
//! - whether conflicting `(entity, version)` inserts are rejected

use lamina_core::{Predicate, Snapshot, StoreError};

/// Document store abstraction consumed by the core
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync). The core issues no retries;
/// every failure propagates to the caller once.
pub trait SnapshotStore: Send + Sync {
    /// Insert one snapshot, assigning it a fresh storage id
    ///
    /// Echoes back the inserted snapshot including the assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or violates an adapter
    /// constraint (e.g. a duplicate `(entity, version)` pair).
    fn insert_one(&self, collection: &str, snapshot: Snapshot) -> Result<Snapshot, StoreError>;

    /// Insert a batch of snapshots, order-preserving
    ///
    /// A failing batch must not be silently partial: either the adapter
    /// applies nothing (the reference store) or it reports the failure per
    /// its own contract.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or violates an adapter
    /// constraint; the whole call fails.
    fn insert_many(
        &self,
        collection: &str,
        snapshots: Vec<Snapshot>,
    ) -> Result<Vec<Snapshot>, StoreError>;

    /// Find snapshots matching a predicate, version-descending, up to limit
    ///
    /// Ties on version preserve insertion order. An unknown collection is
    /// an empty result, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn find_sorted(
        &self,
        collection: &str,
        predicate: &Predicate,
        limit: usize,
    ) -> Result<Vec<Snapshot>, StoreError>;

    /// The three-stage latest-per-entity aggregation
    ///
    /// Must implement exactly: (1) order all snapshots of the collection by
    /// version descending, (2) filter to those satisfying the predicate,
    /// (3) group by the entity field keeping only the first survivor per
    /// group. Stage order is the contract: because filtering happens after
    /// the full descending sort, the snapshot kept per entity is the most
    /// recent one that itself satisfies the predicate, which may be older
    /// than a non-matching newer snapshot of the same entity.
    ///
    /// Snapshots missing the entity field group together under a single
    /// absent key.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn latest_per_entity(
        &self,
        collection: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Snapshot>, StoreError>;
}
