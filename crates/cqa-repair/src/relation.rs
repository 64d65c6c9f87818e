//! Relation snapshots and key metadata.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::tuple::Tuple;
use crate::value::Value;

/// The full extent of one base relation, read at evaluation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationSnapshot {
    pub name: String,
    pub tuples: Vec<Tuple>,
}

impl RelationSnapshot {
    pub fn new(name: impl Into<String>, tuples: Vec<Tuple>) -> Self {
        Self {
            name: name.into(),
            tuples,
        }
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Every column that appears in some tuple, in first-seen order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for column in self.tuples.iter().flat_map(Tuple::columns) {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
        columns
    }
}

/// Declared key of a relation and whether the current extent violates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetadata {
    pub columns: Vec<String>,
    pub violated: bool,
}

impl KeyMetadata {
    /// The single key column, when the key has exactly one.
    pub fn single_column(&self) -> Option<&str> {
        match self.columns.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }
}

/// Canonical key string of `tuple` over `columns` (a JSON array of the key
/// cells). Cells compare as [`Value::canonical`] does, so `1` and `1.0` are the
/// same key. A missing column reads as `null`.
pub fn key_of(tuple: &Tuple, columns: &[String]) -> String {
    let null = Value::Null;
    let cells: Vec<&Value> = columns
        .iter()
        .map(|c| tuple.get(c).unwrap_or(&null))
        .collect();
    serde_json::to_string(&cells).unwrap_or_default()
}

/// Whether two tuples share a key value.
pub fn has_key_violation(tuples: &[Tuple], columns: &[String]) -> bool {
    if columns.is_empty() {
        return false;
    }
    let mut seen: HashSet<String> = HashSet::with_capacity(tuples.len());
    tuples.iter().any(|t| !seen.insert(key_of(t, columns)))
}
