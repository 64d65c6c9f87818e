//! Repair-certainty evaluator.
//!
//! Decision sequence for a statement:
//!
//! 1. not a read query → certain, `not_applicable`
//! 2. no violated key on the target relation → certain, `no_error`
//! 3. not first-order expressible → **not** certain, no enumeration
//! 4. otherwise re-read the relation, enumerate every repair, answer the query
//!    on each, and compare the answers as multisets
//!
//! Step 3 is a policy: non-FO queries are assumed unstable under repair.

use serde::Serialize;

use crate::config::EvaluatorConfig;
use crate::error::{CqaError, Result};
use crate::first_order::{FirstOrder, FoBlocker, StatementKind};
use crate::multiset::all_identical;
use crate::relation::{KeyMetadata, RelationSnapshot};
use crate::repairs::RepairPlan;
use crate::tuple::Tuple;

// ============================================================================
// Seams
// ============================================================================

/// Read access to the engine that owns table storage.
pub trait RelationStore {
    /// Full current extent of `name` (`SELECT * FROM name`).
    fn read_relation(&self, name: &str) -> Result<RelationSnapshot>;

    /// Declared key columns of `name` and whether they are violated.
    fn key_metadata(&self, name: &str) -> Option<KeyMetadata>;

    /// Declared columns of `name`, when the store keeps a schema.
    fn relation_columns(&self, _name: &str) -> Option<Vec<String>> {
        None
    }
}

/// A query that can be answered on one repair of its target relation.
pub trait RepairQuery {
    fn answer(&self, repair: &[Tuple]) -> Result<Vec<Tuple>>;
}

/// Answers a repair with the repair itself, so repairs are compared directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityQuery;

impl RepairQuery for IdentityQuery {
    fn answer(&self, repair: &[Tuple]) -> Result<Vec<Tuple>> {
        Ok(repair.to_vec())
    }
}

impl<Q: RepairQuery + ?Sized> RepairQuery for &Q {
    fn answer(&self, repair: &[Tuple]) -> Result<Vec<Tuple>> {
        (**self).answer(repair)
    }
}

// ============================================================================
// Request / result
// ============================================================================

/// Everything the evaluator needs to know about one executed statement.
#[derive(Debug, Clone)]
pub struct CertaintyRequest<'a> {
    /// Normalised statement text.
    pub query: &'a str,
    pub kind: StatementKind,
    pub target_relation: &'a str,
    /// The answer the engine produced. Never used as the repair source: the
    /// relation is re-read so repairs see tuples the query filtered out.
    pub result: &'a [Tuple],
    pub has_key_violation: bool,
    pub first_order: FirstOrder,
    pub key_column: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairOutcome {
    pub repair: Vec<Tuple>,
    pub answer: Vec<Tuple>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CertaintyDetail {
    NotApplicable,
    NoError,
    NotFirstOrder { reason: FoBlocker },
    Repairs { repairs: Vec<RepairOutcome> },
}

impl CertaintyDetail {
    pub fn label(&self) -> &'static str {
        match self {
            CertaintyDetail::NotApplicable => "not applicable",
            CertaintyDetail::NoError => "no error",
            CertaintyDetail::NotFirstOrder { .. } => "not first-order",
            CertaintyDetail::Repairs { .. } => "repairs",
        }
    }

    pub fn repairs(&self) -> &[RepairOutcome] {
        match self {
            CertaintyDetail::Repairs { repairs } => repairs,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Certainty {
    pub certain: bool,
    pub detail: CertaintyDetail,
}

impl Certainty {
    fn certain(detail: CertaintyDetail) -> Self {
        Self {
            certain: true,
            detail,
        }
    }
}

// ============================================================================
// Evaluator
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvaluatorConfig,
}

impl Evaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Read `relation` and plan its repairs under `key_columns`, applying the
    /// configured budget.
    ///
    /// Every key column must be a column of the relation: the declared schema
    /// when the store has one, otherwise the columns seen in its tuples.
    pub fn plan<S: RelationStore + ?Sized>(
        &self,
        store: &S,
        relation: &str,
        key_columns: &[String],
    ) -> Result<RepairPlan<Tuple>> {
        let snapshot = store.read_relation(relation)?;
        let known = store
            .relation_columns(relation)
            .unwrap_or_else(|| snapshot.columns());
        if !known.is_empty() {
            if let Some(missing) = key_columns.iter().find(|k| !known.contains(*k)) {
                return Err(CqaError::UnknownColumn {
                    relation: snapshot.name.clone(),
                    column: missing.clone(),
                });
            }
        }
        let plan = RepairPlan::for_key(&snapshot, key_columns);
        self.check_budget(relation, &plan)?;
        Ok(plan)
    }

    /// Warn above the configured threshold; refuse plans over `max_repairs`.
    /// An overflowing count is over every limit.
    pub fn check_budget<T: Clone>(&self, relation: &str, plan: &RepairPlan<T>) -> Result<()> {
        let count = plan.count();
        let over_warn = count.map_or(true, |n| n > self.config.warn_repairs_above);
        if over_warn {
            tracing::warn!(
                relation,
                groups = plan.groups().len(),
                repairs = ?count,
                threshold = self.config.warn_repairs_above,
                "repair count above warning threshold"
            );
        }
        if let Some(limit) = self.config.max_repairs {
            if count.map_or(true, |n| n > limit) {
                return Err(CqaError::RepairBudgetExceeded { count, limit });
            }
        }
        Ok(())
    }

    /// Decide whether the answer of `query` is the same in every repair of
    /// the request's target relation.
    pub fn evaluate<S, Q>(
        &self,
        store: &S,
        query: &Q,
        request: &CertaintyRequest<'_>,
    ) -> Result<Certainty>
    where
        S: RelationStore + ?Sized,
        Q: RepairQuery + ?Sized,
    {
        if !request.kind.is_read() {
            return Ok(Certainty::certain(CertaintyDetail::NotApplicable));
        }
        let key_column = match request.key_column {
            Some(k) if request.has_key_violation => k,
            _ => return Ok(Certainty::certain(CertaintyDetail::NoError)),
        };
        if let FirstOrder::NotExpressible(reason) = request.first_order {
            return Ok(Certainty {
                certain: false,
                detail: CertaintyDetail::NotFirstOrder { reason },
            });
        }

        let key_columns = [key_column.to_string()];
        let plan = self.plan(store, request.target_relation, &key_columns)?;

        let mut repairs: Vec<RepairOutcome> = Vec::new();
        for repair in plan.repairs() {
            let answer = query.answer(&repair)?;
            repairs.push(RepairOutcome { repair, answer });
        }
        let answers: Vec<&[Tuple]> = repairs.iter().map(|o| o.answer.as_slice()).collect();
        let certain = all_identical(&answers);

        tracing::debug!(
            relation = request.target_relation,
            query = request.query,
            observed_rows = request.result.len(),
            groups = plan.groups().len(),
            repairs = repairs.len(),
            certain,
            "evaluated certainty under key violation"
        );

        Ok(Certainty {
            certain,
            detail: CertaintyDetail::Repairs { repairs },
        })
    }
}
