//! Core types for the lamina versioned document layer
//!
//! This crate defines the foundational types used throughout the system:
//! - Snapshot: one immutable version of a logical entity
//! - SnapshotId: opaque store-assigned identifier
//! - Predicate: conjunction of field conditions for latest-snapshot queries
//! - UpdateSpec / UpdateOperator: declarative partial updates
//! - Error: error type hierarchy
//!
//! Nothing here touches storage; the store adapter trait lives in
//! `lamina-storage` and the resolver/engine in `lamina-engine`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod predicate;
pub mod snapshot;
pub mod update;

// Re-export commonly used types at the crate root
pub use error::{Error, Result, StoreError};
pub use predicate::{Condition, Predicate};
pub use snapshot::{
    FieldMap, Snapshot, SnapshotId, CLOSED_FIELD, DEFAULT_ENTITY_FIELD, VERSION_FIELD,
};
pub use update::{UpdateOperator, UpdateSpec};
