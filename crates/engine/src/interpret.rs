//! Update Operator Interpreter
//!
//! Compiles a declarative [`UpdateSpec`] into an ordered list of pure
//! payload transforms. Each transform takes a field map and returns a new
//! one; inputs are never mutated, so applying the list to an immutable
//! snapshot's payload produces the candidate payload for the next version
//! without touching the current one.
//!
//! The interpreter has no storage dependency and no side effects.
//! Validation of raw specs happens at the type boundary
//! ([`UpdateSpec::from_value`]); by the time a spec reaches `interpret`,
//! the operator set is already closed, so compilation is total.
//!
//! ## Sequence-operator semantics
//!
//! `$push`, `$addToSet` and `$pullAll` treat their operand uniformly: an
//! array operand contributes each element, a scalar operand contributes
//! itself. A missing or non-array target field starts from an empty array,
//! so every sequence operator is total and always leaves an array behind.
//! `$pullAll` folds every field's pull into one accumulated result.

use lamina_core::{FieldMap, UpdateOperator, UpdateSpec};
use serde_json::Value;

/// A pure payload transformation produced by the interpreter
pub type Transform = Box<dyn Fn(&FieldMap) -> FieldMap + Send + Sync>;

/// Compile an update spec into its ordered transforms
///
/// A plain merge compiles to a single transform; an operator spec compiles
/// to one transform per operator application, in spec order.
pub fn interpret(spec: &UpdateSpec) -> Vec<Transform> {
    match spec {
        UpdateSpec::Merge(fields) => vec![compile(UpdateOperator::Set, fields.clone())],
        UpdateSpec::Operators(ops) => ops
            .iter()
            .map(|(op, args)| compile(*op, args.clone()))
            .collect(),
    }
}

/// Fold a payload through a transform list, left to right
pub fn apply(transforms: &[Transform], fields: FieldMap) -> FieldMap {
    transforms
        .iter()
        .fold(fields, |payload, transform| transform(&payload))
}

fn compile(op: UpdateOperator, args: FieldMap) -> Transform {
    match op {
        UpdateOperator::Set => Box::new(move |payload| merge_fields(payload, &args)),
        UpdateOperator::Push => Box::new(move |payload| append_fields(payload, &args, false)),
        UpdateOperator::AddToSet => Box::new(move |payload| append_fields(payload, &args, true)),
        UpdateOperator::PullAll => Box::new(move |payload| pull_fields(payload, &args)),
    }
}

/// `$set` / plain merge: assign each field to its operand
fn merge_fields(payload: &FieldMap, args: &FieldMap) -> FieldMap {
    let mut next = payload.clone();
    for (field, value) in args {
        next.insert(field.clone(), value.clone());
    }
    next
}

/// `$push` / `$addToSet`: append operand elements, optionally de-duplicated
fn append_fields(payload: &FieldMap, args: &FieldMap, dedupe: bool) -> FieldMap {
    let mut next = payload.clone();
    for (field, operand) in args {
        let mut items = array_at(payload, field);
        items.extend(elements(operand));
        if dedupe {
            items = first_occurrences(items);
        }
        next.insert(field.clone(), Value::Array(items));
    }
    next
}

/// `$pullAll`: remove every operand element, accumulated across fields
fn pull_fields(payload: &FieldMap, args: &FieldMap) -> FieldMap {
    let mut next = payload.clone();
    for (field, operand) in args {
        let removals = elements(operand);
        let remaining: Vec<Value> = array_at(payload, field)
            .into_iter()
            .filter(|item| !removals.contains(item))
            .collect();
        next.insert(field.clone(), Value::Array(remaining));
    }
    next
}

/// Operand as a sequence: arrays contribute elements, scalars themselves
fn elements(operand: &Value) -> Vec<Value> {
    match operand {
        Value::Array(items) => items.clone(),
        scalar => vec![scalar.clone()],
    }
}

/// Current array value of a field; missing or non-array starts empty
fn array_at(payload: &FieldMap, field: &str) -> Vec<Value> {
    match payload.get(field) {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// De-duplicate by JSON value equality, first occurrence preserved
fn first_occurrences(items: Vec<Value>) -> Vec<Value> {
    let mut unique: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}
