//! Declarative update specs
//!
//! An [`UpdateSpec`] describes a partial update without touching storage:
//! either a plain shallow merge of fields, or an ordered sequence of
//! operator applications over field/operand pairs. The operator set is
//! closed ([`UpdateOperator`]), so dispatch is a tagged variant rather than
//! open-ended lookup and an unrecognized key fails before any store
//! interaction.
//!
//! Specs arrive two ways:
//! - typed, through the builder methods (order of operators preserved)
//! - raw JSON, through [`UpdateSpec::from_value`], which applies the
//!   fail-fast validation contract: an object with no `$`-prefixed keys is
//!   a plain merge; otherwise every key must name a recognized operator
//!   with an object operand

use crate::error::{Error, Result};
use crate::snapshot::FieldMap;
use serde_json::Value;
use std::fmt;

/// The closed set of recognized update operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateOperator {
    /// `$set`: assign each field to its operand
    Set,
    /// `$push`: append the operand (or each of its elements) to an array field
    Push,
    /// `$addToSet`: append then de-duplicate, first occurrence preserved
    AddToSet,
    /// `$pullAll`: remove every operand element from an array field
    PullAll,
}

impl UpdateOperator {
    /// Parse the wire spelling of an operator key
    ///
    /// Returns None for anything outside the recognized set.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "$set" => Some(UpdateOperator::Set),
            "$push" => Some(UpdateOperator::Push),
            "$addToSet" => Some(UpdateOperator::AddToSet),
            "$pullAll" => Some(UpdateOperator::PullAll),
            _ => None,
        }
    }

    /// Wire spelling of this operator
    pub fn name(&self) -> &'static str {
        match self {
            UpdateOperator::Set => "$set",
            UpdateOperator::Push => "$push",
            UpdateOperator::AddToSet => "$addToSet",
            UpdateOperator::PullAll => "$pullAll",
        }
    }
}

impl fmt::Display for UpdateOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A declarative description of a partial update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateSpec {
    /// Shallow-merge the fields into the payload
    Merge(FieldMap),
    /// Apply operators left to right, each over its field/operand pairs
    Operators(Vec<(UpdateOperator, FieldMap)>),
}

impl UpdateSpec {
    /// A plain shallow merge of the given fields
    pub fn merge(fields: FieldMap) -> Self {
        UpdateSpec::Merge(fields)
    }

    /// A single operator application
    pub fn operator(op: UpdateOperator, fields: FieldMap) -> Self {
        UpdateSpec::Operators(vec![(op, fields)])
    }

    /// Append a further operator application, preserving order
    ///
    /// A plain merge converts to its equivalent `$set` first; the two have
    /// identical per-field semantics.
    pub fn then(self, op: UpdateOperator, fields: FieldMap) -> Self {
        let mut ops = match self {
            UpdateSpec::Merge(merged) => vec![(UpdateOperator::Set, merged)],
            UpdateSpec::Operators(ops) => ops,
        };
        ops.push((op, fields));
        UpdateSpec::Operators(ops)
    }

    /// Parse a raw JSON object into a spec, validating fail-fast
    ///
    /// An object with no `$`-prefixed keys is a plain merge. Otherwise
    /// every key must parse as a recognized operator
    /// ([`Error::UnsupportedOperator`]) and every operand must be an object
    /// of field/operand pairs ([`Error::MalformedUpdate`]). Nothing is
    /// partially accepted.
    ///
    /// Operators parsed this way apply in the map's key order; callers that
    /// need a specific order build the spec with [`UpdateSpec::operator`]
    /// and [`UpdateSpec::then`].
    pub fn from_value(value: Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(Error::MalformedUpdate {
                    reason: format!("expected an object, got {}", json_type(&other)),
                })
            }
        };

        if !map.keys().any(|key| key.starts_with('$')) {
            return Ok(UpdateSpec::Merge(map));
        }

        let mut ops = Vec::with_capacity(map.len());
        for (key, operand) in map {
            let op = UpdateOperator::parse(&key).ok_or_else(|| Error::UnsupportedOperator {
                operator: key.clone(),
            })?;
            match operand {
                Value::Object(fields) => ops.push((op, fields)),
                other => {
                    return Err(Error::MalformedUpdate {
                        reason: format!(
                            "operand of {op} must be an object of field/operand pairs, got {}",
                            json_type(&other)
                        ),
                    })
                }
            }
        }
        Ok(UpdateSpec::Operators(ops))
    }
}

/// Short JSON type name for error messages
fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> FieldMap {
        value.as_object().expect("object").clone()
    }

    #[test]
    fn test_operator_parse_round_trip() {
        for op in [
            UpdateOperator::Set,
            UpdateOperator::Push,
            UpdateOperator::AddToSet,
            UpdateOperator::PullAll,
        ] {
            assert_eq!(UpdateOperator::parse(op.name()), Some(op));
        }
        assert_eq!(UpdateOperator::parse("$rename"), None);
        assert_eq!(UpdateOperator::parse("set"), None);
    }

    #[test]
    fn test_from_value_plain_merge() {
        let spec = UpdateSpec::from_value(json!({"count": 1, "state": "open"})).unwrap();
        assert_eq!(spec, UpdateSpec::Merge(fields(json!({"count": 1, "state": "open"}))));
    }

    #[test]
    fn test_from_value_empty_object_is_merge() {
        let spec = UpdateSpec::from_value(json!({})).unwrap();
        assert_eq!(spec, UpdateSpec::Merge(FieldMap::new()));
    }

    #[test]
    fn test_from_value_operators() {
        let spec = UpdateSpec::from_value(json!({
            "$set": {"state": "open"},
            "$push": {"tags": "new"},
        }))
        .unwrap();

        let UpdateSpec::Operators(ops) = spec else {
            panic!("expected operator spec");
        };
        assert_eq!(ops.len(), 2);
        assert!(ops.contains(&(UpdateOperator::Set, fields(json!({"state": "open"})))));
        assert!(ops.contains(&(UpdateOperator::Push, fields(json!({"tags": "new"})))));
    }

    #[test]
    fn test_from_value_rejects_unknown_operator() {
        let err = UpdateSpec::from_value(json!({"$rename": {"a": "b"}})).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedOperator { operator } if operator == "$rename"
        ));
    }

    #[test]
    fn test_from_value_rejects_mixed_keys() {
        // A plain key alongside operator keys is not a recognized operator
        let err = UpdateSpec::from_value(json!({"$set": {"a": 1}, "count": 2})).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedOperator { operator } if operator == "count"
        ));
    }

    #[test]
    fn test_from_value_rejects_non_object_spec() {
        let err = UpdateSpec::from_value(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, Error::MalformedUpdate { .. }));
    }

    #[test]
    fn test_from_value_rejects_scalar_operand() {
        let err = UpdateSpec::from_value(json!({"$set": 5})).unwrap_err();
        assert!(matches!(err, Error::MalformedUpdate { .. }));
        assert!(err.to_string().contains("$set"));
    }

    #[test]
    fn test_then_preserves_order() {
        let spec = UpdateSpec::operator(UpdateOperator::Push, fields(json!({"tags": "a"})))
            .then(UpdateOperator::PullAll, fields(json!({"tags": ["b"]})));

        let UpdateSpec::Operators(ops) = spec else {
            panic!("expected operator spec");
        };
        assert_eq!(ops[0].0, UpdateOperator::Push);
        assert_eq!(ops[1].0, UpdateOperator::PullAll);
    }

    #[test]
    fn test_then_converts_merge_to_set() {
        let spec = UpdateSpec::merge(fields(json!({"count": 1})))
            .then(UpdateOperator::Push, fields(json!({"tags": "a"})));

        let UpdateSpec::Operators(ops) = spec else {
            panic!("expected operator spec");
        };
        assert_eq!(ops[0], (UpdateOperator::Set, fields(json!({"count": 1}))));
    }
}
