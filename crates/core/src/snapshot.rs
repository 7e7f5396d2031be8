//! Snapshot: one immutable version of a logical entity
//!
//! A logical entity is never stored as a single mutated record. It is a
//! chain of [`Snapshot`]s sharing an identity field, with strictly
//! increasing `version` numbers. Changes append a new snapshot; nothing is
//! updated or deleted in place.
//!
//! ## Field conventions
//!
//! - The entity identity lives inside the payload under a caller-convention
//!   field name (the store adapter's grouping key, default `"id"`). It is
//!   not unique across a collection: every version of an entity carries it.
//! - The payload field `"closed"` is the tombstone flag: absent or `false`
//!   for live snapshots, `true` for the terminal snapshot of a soft-deleted
//!   entity. A tombstone remains a valid, queryable snapshot.
//! - `"version"` never appears inside the payload; it is typed. Payloads
//!   supplied with a `"version"` key have it stripped on construction, so
//!   creation always yields version 1 regardless of caller input.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// A snapshot's open-ended payload: field name to JSON value
pub type FieldMap = Map<String, Value>;

/// Reserved name of the typed version field
pub const VERSION_FIELD: &str = "version";

/// Payload field carrying the tombstone flag
pub const CLOSED_FIELD: &str = "closed";

/// Default entity-identity field name (caller convention)
pub const DEFAULT_ENTITY_FIELD: &str = "id";

/// Opaque identifier assigned to a snapshot by the store adapter
///
/// A `SnapshotId` is a wrapper around a UUID v4. It identifies one stored
/// snapshot, not the logical entity; every version gets a fresh one on
/// insert, and it is never carried forward into a successor version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(Uuid);

impl SnapshotId {
    /// Create a new random SnapshotId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a SnapshotId from a string representation
    ///
    /// Accepts standard UUID format. Returns None if the string is not a
    /// valid UUID.
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Get the raw bytes of this SnapshotId
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One immutable, versioned representation of an entity
///
/// ## Invariants
///
/// - `version` is positive and strictly increasing along an entity's chain,
///   starting at 1 on creation
/// - `storage_id` is `None` until the store adapter inserts the snapshot,
///   and is stripped before the payload seeds a successor version
/// - `fields` never contains the reserved `"version"` key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Store-assigned identifier; absent before insertion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_id: Option<SnapshotId>,

    /// Version number within the entity's chain
    pub version: u64,

    /// Open-ended payload, including the entity identity and tombstone flag
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl Snapshot {
    /// Create the first snapshot of a new entity chain (version 1)
    ///
    /// Reserved keys in the payload are stripped, so creation assigns
    /// version 1 regardless of what the caller supplied.
    pub fn first(fields: FieldMap) -> Self {
        Snapshot::at_version(1, fields)
    }

    /// Create an uninserted snapshot at an explicit version
    pub fn at_version(version: u64, mut fields: FieldMap) -> Self {
        fields.remove(VERSION_FIELD);
        Snapshot {
            storage_id: None,
            version,
            fields,
        }
    }

    /// Build the next version of this entity from a transformed payload
    ///
    /// The successor gets `version + 1` and no storage id; the store
    /// assigns a fresh one on insert.
    pub fn successor(&self, fields: FieldMap) -> Snapshot {
        Snapshot::at_version(self.version + 1, fields)
    }

    /// Build the tombstone that soft-deletes this entity
    ///
    /// Carries every payload field forward, sets `closed: true` and bumps
    /// the version.
    pub fn tombstone(&self) -> Snapshot {
        let mut fields = self.fields.clone();
        fields.insert(CLOSED_FIELD.to_string(), Value::Bool(true));
        self.successor(fields)
    }

    /// Look up a payload field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The entity identity value under the given field name, if present
    pub fn entity(&self, entity_field: &str) -> Option<&Value> {
        self.fields.get(entity_field)
    }

    /// Whether this snapshot is a tombstone (`closed: true`)
    pub fn is_closed(&self) -> bool {
        matches!(self.fields.get(CLOSED_FIELD), Some(Value::Bool(true)))
    }

    /// Consume the snapshot and return its payload
    ///
    /// The storage id is dropped here, which is what keeps it from leaking
    /// into a successor version's payload.
    pub fn into_fields(self) -> FieldMap {
        self.fields
    }
}
