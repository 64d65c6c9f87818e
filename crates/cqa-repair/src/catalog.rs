//! In-memory relation store.
//!
//! Keys are declared, never enforced: inserts that duplicate a key value are
//! accepted, and [`RelationStore::key_metadata`] reports the violation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CqaError, Result};
use crate::evaluator::RelationStore;
use crate::relation::{has_key_violation, KeyMetadata, RelationSnapshot};
use crate::tuple::Tuple;
use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub key: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Tuple>,
}

impl Table {
    pub fn key_violated(&self) -> bool {
        has_key_violation(&self.rows, &self.key)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFixture {
    tables: Vec<Table>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: BTreeMap<String, Table>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `{ "tables": [ { "name", "columns", "key", "rows" } ] }`.
    ///
    /// Rows go through [`Catalog::insert`], so they are re-ordered to the
    /// declared columns and unknown columns are rejected.
    pub fn from_json(text: &str) -> Result<Self> {
        let fixture: CatalogFixture = serde_json::from_str(text)?;
        let mut catalog = Catalog::new();
        for table in fixture.tables {
            catalog.create_table(&table.name, table.columns, table.key)?;
            for row in table.rows {
                catalog.insert(&table.name, row)?;
            }
        }
        Ok(catalog)
    }

    pub fn to_json(&self) -> Result<String> {
        let fixture = CatalogFixture {
            tables: self.tables.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&fixture)?)
    }

    pub fn create_table(
        &mut self,
        name: &str,
        columns: Vec<String>,
        key: Vec<String>,
    ) -> Result<()> {
        if self.resolve(name).is_some() {
            return Err(CqaError::RelationExists(name.to_string()));
        }
        for k in &key {
            if !columns.contains(k) {
                return Err(CqaError::UnknownColumn {
                    relation: name.to_string(),
                    column: k.clone(),
                });
            }
        }
        self.tables.insert(
            name.to_string(),
            Table {
                name: name.to_string(),
                columns,
                key,
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    /// Remove `name`, returning whether it existed.
    pub fn drop_table(&mut self, name: &str) -> bool {
        match self.resolve(name).map(str::to_string) {
            Some(actual) => self.tables.remove(&actual).is_some(),
            None => false,
        }
    }

    /// Append `row`, laid out in the table's column order. Columns the row
    /// does not mention are `NULL`.
    pub fn insert(&mut self, name: &str, row: Tuple) -> Result<()> {
        let actual = self
            .resolve(name)
            .map(str::to_string)
            .ok_or_else(|| CqaError::UnknownRelation(name.to_string()))?;
        let table = self
            .tables
            .get_mut(&actual)
            .ok_or_else(|| CqaError::UnknownRelation(name.to_string()))?;

        for column in row.columns() {
            if !table.columns.iter().any(|c| c == column) {
                return Err(CqaError::UnknownColumn {
                    relation: table.name.clone(),
                    column: column.to_string(),
                });
            }
        }
        let laid_out: Tuple = table
            .columns
            .iter()
            .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
            .collect();
        table.rows.push(laid_out);
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.resolve(name).and_then(|actual| self.tables.get(actual))
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Exact name first, then a unique case-insensitive match.
    fn resolve(&self, name: &str) -> Option<&str> {
        if let Some((k, _)) = self.tables.get_key_value(name) {
            return Some(k.as_str());
        }
        let mut matches = self
            .tables
            .keys()
            .filter(|k| k.eq_ignore_ascii_case(name));
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only.as_str()),
            _ => None,
        }
    }
}

impl RelationStore for Catalog {
    fn read_relation(&self, name: &str) -> Result<RelationSnapshot> {
        let table = self
            .table(name)
            .ok_or_else(|| CqaError::UnknownRelation(name.to_string()))?;
        Ok(RelationSnapshot::new(table.name.clone(), table.rows.clone()))
    }

    fn key_metadata(&self, name: &str) -> Option<KeyMetadata> {
        let table = self.table(name)?;
        if table.key.is_empty() {
            return None;
        }
        Some(KeyMetadata {
            columns: table.key.clone(),
            violated: table.key_violated(),
        })
    }

    fn relation_columns(&self, name: &str) -> Option<Vec<String>> {
        self.table(name).map(|t| t.columns.clone())
    }
}
