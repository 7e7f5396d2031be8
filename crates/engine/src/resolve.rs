//! Latest-Snapshot Resolver
//!
//! Read-only resolution of "the latest snapshot that still satisfies a
//! predicate", which is not the same thing as the latest snapshot. An
//! entity whose newest version stopped matching is resolved to its newest
//! version that still matches.
//!
//! Two entry points:
//! - [`Resolver::resolve_one`]: single-entity form; the caller's predicate
//!   is expected to scope to one entity (typically by its identity field)
//! - [`Resolver::resolve_many`]: batch form; one snapshot per distinct
//!   entity matched, via the store's sort/filter/group aggregation
//!
//! Store failures propagate wrapped with the entry point's name; an empty
//! result is a valid outcome, never an error.

use lamina_core::{Error, Predicate, Result, Snapshot};
use lamina_storage::SnapshotStore;
use std::sync::Arc;
use tracing::trace;

/// Read-side facade over a store collection
///
/// Stateless: holds only the store handle and the collection name, so it
/// can be shared and cloned freely.
pub struct Resolver<S> {
    store: Arc<S>,
    collection: String,
}

impl<S> Clone for Resolver<S> {
    fn clone(&self) -> Self {
        Resolver {
            store: Arc::clone(&self.store),
            collection: self.collection.clone(),
        }
    }
}

impl<S: SnapshotStore> Resolver<S> {
    /// Create a resolver for one collection
    pub fn new(store: Arc<S>, collection: impl Into<String>) -> Self {
        Resolver {
            store,
            collection: collection.into(),
        }
    }

    /// The collection this resolver reads
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Highest-version snapshot satisfying the predicate, if any
    ///
    /// No grouping is performed: if the predicate matches several entities,
    /// whichever snapshot ranks highest wins. Callers scope the predicate
    /// to one entity.
    ///
    /// # Errors
    ///
    /// [`Error::StoreUnavailable`] if the underlying find fails.
    pub fn resolve_one(&self, predicate: &Predicate) -> Result<Option<Snapshot>> {
        trace!(collection = %self.collection, %predicate, "resolving latest snapshot");
        let hits = self
            .store
            .find_sorted(&self.collection, predicate, 1)
            .map_err(|e| Error::store_read("resolve_one", e))?;
        Ok(hits.into_iter().next())
    }

    /// Latest matching snapshot for every distinct entity the predicate touches
    ///
    /// Delegates to the store's three-stage aggregation (sort descending,
    /// filter, group by entity keeping the first). Each entity resolves
    /// independently: one entity's version count never affects another's
    /// result.
    ///
    /// # Errors
    ///
    /// [`Error::StoreUnavailable`] if the underlying aggregation fails.
    pub fn resolve_many(&self, predicate: &Predicate) -> Result<Vec<Snapshot>> {
        trace!(collection = %self.collection, %predicate, "resolving latest snapshots per entity");
        self.store
            .latest_per_entity(&self.collection, predicate)
            .map_err(|e| Error::store_read("resolve_many", e))
    }
}
