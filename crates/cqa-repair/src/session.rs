//! Caller-owned history of evaluated statements.

use serde::Serialize;

use crate::evaluator::Certainty;
use crate::first_order::{FirstOrder, StatementKind};
use crate::tuple::Tuple;

/// Statement ids are assigned by the session, starting at 1.
pub type StatementId = u64;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementRecord {
    pub id: StatementId,
    pub kind: StatementKind,
    pub query: String,
    pub first_order: FirstOrder,
    pub result: Vec<Tuple>,
    pub table: Option<String>,
    pub key_column: Option<String>,
    pub key_violation: bool,
    pub certainty: Certainty,
}

/// Evaluated statements in submission order.
#[derive(Debug, Clone)]
pub struct Session {
    records: Vec<StatementRecord>,
    next_id: StatementId,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record`, overwriting its id with the next free one.
    pub fn record(&mut self, mut record: StatementRecord) -> StatementId {
        let id = self.next_id;
        self.next_id += 1;
        record.id = id;
        self.records.push(record);
        id
    }

    pub fn records(&self) -> &[StatementRecord] {
        &self.records
    }

    pub fn get(&self, id: StatementId) -> Option<&StatementRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Remove one record. Ids are never reused.
    pub fn remove(&mut self, id: StatementId) -> Option<StatementRecord> {
        let pos = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(pos))
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::CertaintyDetail;

    fn record(query: &str) -> StatementRecord {
        StatementRecord {
            id: 0,
            kind: StatementKind::classify(query),
            query: query.to_string(),
            first_order: FirstOrder::Expressible,
            result: Vec::new(),
            table: None,
            key_column: None,
            key_violation: false,
            certainty: Certainty {
                certain: true,
                detail: CertaintyDetail::NotApplicable,
            },
        }
    }

    #[test]
    fn ids_are_monotonic_and_not_reused() {
        let mut s = Session::new();
        assert_eq!(s.record(record("SELECT 1")), 1);
        assert_eq!(s.record(record("SELECT 2")), 2);
        assert!(s.remove(2).is_some());
        assert_eq!(s.record(record("SELECT 3")), 3);
        assert_eq!(s.len(), 2);
        assert_eq!(s.get(3).map(|r| r.query.as_str()), Some("SELECT 3"));
        assert!(s.get(2).is_none());
    }

    #[test]
    fn sessions_are_independent() {
        let mut a = Session::new();
        let mut b = Session::new();
        a.record(record("SELECT 1"));
        assert!(b.is_empty());
        assert_eq!(b.record(record("SELECT 1")), 1);
        a.clear();
        assert!(a.is_empty());
    }
}
