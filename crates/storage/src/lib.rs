//! Store adapters for the lamina versioned document layer
//!
//! This crate holds the [`SnapshotStore`] trait the core is written
//! against, plus [`MemoryStore`], a sharded in-memory reference
//! implementation. A document-database adapter implements the same four
//! primitives: insert-one, insert-many, version-descending find, and the
//! sort/filter/group latest-per-entity aggregation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod memory;

pub use adapter::SnapshotStore;
pub use memory::MemoryStore;
