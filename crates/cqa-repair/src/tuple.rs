//! Ordered column → value rows.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value::Value;

/// One row of a relation: an ordered mapping from column name to value.
///
/// Column order is insertion order and is part of the tuple's identity for
/// canonicalisation; two tuples with the same cells in a different column
/// order canonicalise differently (as `JSON.stringify` would).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tuple {
    fields: Vec<(String, Value)>,
}

impl Tuple {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut tuple = Tuple::new();
        for (k, v) in pairs {
            tuple.insert(k, v);
        }
        tuple
    }

    /// Builder-style [`Tuple::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set `column`, replacing the value in place if the column already exists.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Canonical string used for multiset comparison: compact JSON with the
    /// tuple's own column order, e.g. `{"id":1,"v":"A"}`.
    pub fn canonical(&self) -> String {
        // Maps of scalars always serialise; the default is unreachable in practice.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (c, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}: {v}")?;
        }
        write!(f, ")")
    }
}

impl Serialize for Tuple {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (c, v) in &self.fields {
            map.serialize_entry(c, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Tuple {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TupleVisitor;

        impl<'de> Visitor<'de> for TupleVisitor {
            type Value = Tuple;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "an object mapping column names to scalars")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Tuple, A::Error> {
                let mut tuple = Tuple::new();
                while let Some((column, value)) = access.next_entry::<String, Value>()? {
                    tuple.insert(column, value);
                }
                Ok(tuple)
            }
        }

        deserializer.deserialize_map(TupleVisitor)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Tuple {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Tuple::from_pairs(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_keeps_insertion_order() {
        let t = Tuple::new().with("v", "A").with("id", 1);
        assert_eq!(t.canonical(), r#"{"v":"A","id":1}"#);
    }

    #[test]
    fn insert_replaces_existing_column() {
        let mut t = Tuple::new().with("id", 1);
        t.insert("id", 2);
        assert_eq!(t.len(), 1);
        assert_eq!(t.get("id"), Some(&Value::Int(2)));
    }

    #[test]
    fn json_round_trip_preserves_column_order() {
        let t: Tuple = serde_json::from_str(r#"{"z":1,"a":"x"}"#).unwrap();
        assert_eq!(t.columns().collect::<Vec<_>>(), vec!["z", "a"]);
        assert_eq!(t.canonical(), r#"{"z":1,"a":"x"}"#);
    }
}
