//! Filter predicates over snapshots
//!
//! A [`Predicate`] is a conjunction of per-field conditions drawn from a
//! closed set: equality, membership and presence. This covers the query
//! shapes the resolver is defined over (entity scoping, batch scoping via
//! membership, and flag exclusion via absence) without growing into a
//! query language.
//!
//! Conditions on the reserved `"version"` field compare against the typed
//! version number. The tombstone flag `"closed"` is an ordinary payload
//! field: live snapshots created without it genuinely lack it, so
//! `absent("closed")` excludes tombstones and explicit `closed: false`
//! snapshots match `eq("closed", false)`. The resolver never filters
//! tombstones implicitly; exclusion is always the caller's predicate.

use crate::snapshot::{Snapshot, VERSION_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A single per-field condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// Field is present and equal to the value
    Eq(Value),
    /// Field is present and equal to one of the values
    In(Vec<Value>),
    /// Field presence: `Exists(true)` requires it, `Exists(false)` forbids it
    Exists(bool),
}

impl Condition {
    /// Evaluate the condition against a field lookup result
    fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Condition::Eq(expected) => value == Some(expected),
            Condition::In(allowed) => value.is_some_and(|v| allowed.contains(v)),
            Condition::Exists(required) => value.is_some() == *required,
        }
    }
}

/// Conjunction of field conditions
///
/// All conditions must match (AND semantics). The empty predicate matches
/// every snapshot.
///
/// # Examples
///
/// ```
/// use lamina_core::Predicate;
///
/// let scoped = Predicate::new().eq("id", "baz");
/// let batch = Predicate::new().within("id", ["foo", "bar"]);
/// let live = Predicate::new().eq("id", "baz").absent("closed");
/// assert_eq!(live.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    conditions: BTreeMap<String, Condition>,
}

impl Predicate {
    /// Create an empty predicate (matches all snapshots)
    pub fn new() -> Self {
        Predicate {
            conditions: BTreeMap::new(),
        }
    }

    /// Require a field to equal a value
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(field.into(), Condition::Eq(value.into()));
        self
    }

    /// Require a field to equal one of the given values
    pub fn within<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let allowed = values.into_iter().map(Into::into).collect();
        self.conditions.insert(field.into(), Condition::In(allowed));
        self
    }

    /// Require a field to be present with any value
    pub fn exists(mut self, field: impl Into<String>) -> Self {
        self.conditions.insert(field.into(), Condition::Exists(true));
        self
    }

    /// Require a field to be absent
    pub fn absent(mut self, field: impl Into<String>) -> Self {
        self.conditions.insert(field.into(), Condition::Exists(false));
        self
    }

    /// Check whether a snapshot satisfies every condition
    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        self.conditions.iter().all(|(field, condition)| {
            if field == VERSION_FIELD {
                condition.matches(Some(&Value::from(snapshot.version)))
            } else {
                condition.matches(snapshot.field(field))
            }
        })
    }

    /// Whether the predicate has no conditions
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Number of conditions
    pub fn len(&self) -> usize {
        self.conditions.len()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (field, condition)) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match condition {
                Condition::Eq(value) => write!(f, "{field}: {value}")?,
                Condition::In(values) => {
                    write!(f, "{field}: {{$in: {}}}", Value::Array(values.clone()))?;
                }
                Condition::Exists(required) => write!(f, "{field}: {{$exists: {required}}}")?,
            }
        }
        write!(f, "}}")
    }
}
