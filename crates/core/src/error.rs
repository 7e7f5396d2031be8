//! Error types for the versioned document layer
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! Two layers of errors exist:
//! - [`StoreError`]: raised by store adapters (the write/read primitives)
//! - [`Error`]: raised by the core (validation, resolution, transitions),
//!   wrapping the adapter failure as its source where one exists

use thiserror::Error;

/// Result type alias for lamina operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error raised by a store adapter
///
/// Adapters translate their backend's failures into these variants so the
/// core can wrap them uniformly. An empty result set is never a
/// `StoreError`; adapters report it as an empty sequence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert would duplicate an existing (entity, version) pair
    #[error("version conflict: entity {entity} already has a snapshot at version {version}")]
    VersionConflict {
        /// Rendering of the entity identity value
        entity: String,
        /// The duplicated version number
        version: u64,
    },

    /// The backend failed (connectivity, timeout, internal fault)
    #[error("store backend failure: {context}")]
    Backend {
        /// What the adapter was doing when the backend failed
        context: String,
        /// The backend's own error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    /// Wrap a backend failure with a short context string
    pub fn backend(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        StoreError::Backend {
            context: context.into(),
            source: source.into(),
        }
    }
}

/// Error types for the versioned document core
#[derive(Debug, Error)]
pub enum Error {
    /// An update spec used a key outside the recognized operator set
    #[error("unsupported update operator: {operator}")]
    UnsupportedOperator {
        /// The offending key
        operator: String,
    },

    /// An update spec was structurally invalid (not an object, bad operand)
    #[error("malformed update spec: {reason}")]
    MalformedUpdate {
        /// Why the spec was rejected
        reason: String,
    },

    /// A required single-snapshot resolve matched nothing
    #[error("no snapshot matches {predicate}")]
    NotFound {
        /// Rendering of the predicate that matched nothing
        predicate: String,
    },

    /// A store read (find/aggregate) failed during resolution
    #[error("store read failed in {context}")]
    StoreUnavailable {
        /// The resolver entry point that issued the read
        context: &'static str,
        /// The adapter failure
        #[source]
        source: StoreError,
    },

    /// A store write (insert) failed during a version transition
    #[error("store write failed in {context}")]
    StorageFailed {
        /// The transition operation that issued the write
        context: &'static str,
        /// The adapter failure
        #[source]
        source: StoreError,
    },
}

impl Error {
    /// Wrap an adapter failure raised while resolving (read path)
    pub fn store_read(context: &'static str, source: StoreError) -> Self {
        Error::StoreUnavailable { context, source }
    }

    /// Wrap an adapter failure raised while inserting (write path)
    pub fn store_write(context: &'static str, source: StoreError) -> Self {
        Error::StorageFailed { context, source }
    }
}
