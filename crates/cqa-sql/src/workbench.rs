//! Statement pipeline: execute, classify, evaluate, record.
//!
//! ```text
//!   sql text ──parse──► [ParsedStatement] ──for each──┐
//!                                                     ▼
//!        SqlEngine::execute ─► is_first_order ─► key_metadata(target)
//!                                                     │
//!                         Evaluator::evaluate ◄───────┘
//!                                 │
//!                                 ▼
//!                        Session::record  ─► StatementId
//! ```

use anyhow::{Context, Result};
use cqa_repair::{
    is_first_order, Certainty, CertaintyRequest, Evaluator, EvaluatorConfig, IdentityQuery,
    RelationStore, Session, StatementId, StatementRecord, Tuple,
};
use sqlparser::ast::Statement;

use crate::engine::SqlEngine;
use crate::error::SqlError;
use crate::select::SelectQuery;
use crate::statement::{parse_statements, ParsedStatement};

#[derive(Debug, Default)]
pub struct Workbench {
    engine: SqlEngine,
    session: Session,
    evaluator: Evaluator,
}

impl Workbench {
    pub fn new(engine: SqlEngine, config: EvaluatorConfig) -> Self {
        Self {
            engine,
            session: Session::new(),
            evaluator: Evaluator::new(config),
        }
    }

    pub fn engine(&self) -> &SqlEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SqlEngine {
        &mut self.engine
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Run every statement in `sql` and record each one.
    ///
    /// Nothing runs if `sql` does not parse. A failing statement stops the
    /// batch; statements before it stay applied and recorded.
    pub fn run(&mut self, sql: &str) -> Result<Vec<StatementId>> {
        let statements = parse_statements(sql).context("failed to parse SQL input")?;
        let mut ids = Vec::with_capacity(statements.len());
        for parsed in &statements {
            let record = self
                .process(parsed)
                .with_context(|| format!("statement `{}` failed", parsed.text))?;
            ids.push(self.session.record(record));
        }
        Ok(ids)
    }

    fn process(&mut self, parsed: &ParsedStatement) -> Result<StatementRecord> {
        let first_order = is_first_order(&parsed.text, parsed.kind);

        let result = match self.engine.execute(parsed) {
            Ok(rows) => rows,
            Err(SqlError::Unsupported(what))
                if matches!(parsed.statement, Statement::Query(_))
                    && !first_order.is_expressible() =>
            {
                tracing::warn!(
                    query = %parsed.text,
                    reason = first_order.blocker().map(|b| b.label()).unwrap_or_default(),
                    unsupported = %what,
                    "recording non-first-order query without a result"
                );
                Vec::new()
            }
            Err(err) => return Err(err.into()),
        };

        let table = parsed.target.clone();
        let meta = table.as_deref().and_then(|t| self.engine.key_metadata(t));
        let key_column = meta.as_ref().and_then(|m| {
            if m.columns.len() > 1 {
                tracing::warn!(
                    table = table.as_deref().unwrap_or_default(),
                    key = ?m.columns,
                    "composite key is not evaluated for repairs"
                );
            }
            m.single_column().map(str::to_string)
        });
        let key_violation = meta.as_ref().is_some_and(|m| m.violated);

        let certainty = self.certainty(
            parsed,
            &result,
            key_violation,
            key_column.as_deref(),
            first_order,
        )?;

        tracing::info!(
            kind = parsed.kind.as_str(),
            rows = result.len(),
            certain = certainty.certain,
            detail = certainty.detail.label(),
            "statement evaluated"
        );

        Ok(StatementRecord {
            id: 0,
            kind: parsed.kind,
            query: parsed.text.clone(),
            first_order,
            result,
            table,
            key_column,
            key_violation,
            certainty,
        })
    }

    fn certainty(
        &self,
        parsed: &ParsedStatement,
        result: &[Tuple],
        has_key_violation: bool,
        key_column: Option<&str>,
        first_order: cqa_repair::FirstOrder,
    ) -> Result<Certainty> {
        let request = CertaintyRequest {
            query: &parsed.text,
            kind: parsed.kind,
            target_relation: parsed.target.as_deref().unwrap_or_default(),
            result,
            has_key_violation,
            first_order,
            key_column,
        };

        // Only a SELECT that will actually be enumerated needs compiling.
        let needs_repairs = parsed.kind.is_read()
            && first_order.is_expressible()
            && has_key_violation
            && key_column.is_some();
        let certainty = if needs_repairs {
            let query = SelectQuery::compile(&parsed.statement)?;
            self.evaluator.evaluate(&self.engine, &query, &request)?
        } else {
            self.evaluator
                .evaluate(&self.engine, &IdentityQuery, &request)?
        };
        Ok(certainty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cqa_repair::{CertaintyDetail, FoBlocker, StatementKind};

    const SETUP: &str = "CREATE TABLE P (id INT PRIMARY KEY, v TEXT);
                         INSERT INTO P VALUES (1, 'A'), (1, 'B'), (2, 'C');";

    fn bench() -> Workbench {
        let mut wb = Workbench::default();
        wb.run(SETUP).unwrap();
        wb
    }

    fn last(wb: &Workbench) -> &StatementRecord {
        wb.session().records().last().unwrap()
    }

    #[test]
    fn setup_statements_are_not_applicable() {
        let wb = bench();
        assert_eq!(wb.session().len(), 2);
        for record in wb.session().records() {
            assert!(record.certainty.certain);
            assert_eq!(record.certainty.detail, CertaintyDetail::NotApplicable);
        }
        assert_eq!(wb.session().records()[0].kind, StatementKind::Create);
    }

    #[test]
    fn conflicting_select_is_uncertain() {
        let mut wb = bench();
        let ids = wb.run("SELECT v FROM P WHERE id = 1").unwrap();
        assert_eq!(ids, vec![3]);
        let rec = last(&wb);
        assert_eq!(rec.table.as_deref(), Some("P"));
        assert_eq!(rec.key_column.as_deref(), Some("id"));
        assert!(rec.key_violation);
        assert_eq!(rec.result.len(), 2);
        assert!(!rec.certainty.certain);
        assert_eq!(rec.certainty.detail.repairs().len(), 2);
    }

    #[test]
    fn select_away_from_conflict_is_certain() {
        let mut wb = bench();
        wb.run("SELECT v FROM P WHERE id = 2").unwrap();
        let rec = last(&wb);
        assert!(rec.certainty.certain);
        assert_eq!(rec.certainty.detail.repairs().len(), 2);
    }

    #[test]
    fn unsupported_non_fo_select_is_recorded() {
        let mut wb = bench();
        wb.run("SELECT v, COUNT(*) FROM P GROUP BY v").unwrap();
        let rec = last(&wb);
        assert!(rec.result.is_empty());
        assert!(!rec.certainty.certain);
        assert_eq!(
            rec.certainty.detail,
            CertaintyDetail::NotFirstOrder {
                reason: FoBlocker::GroupBy
            }
        );
    }

    #[test]
    fn cte_is_recorded_as_non_select() {
        let mut wb = bench();
        wb.run("WITH t AS (SELECT v FROM P) SELECT v FROM t").unwrap();
        let rec = last(&wb);
        assert_eq!(rec.kind, StatementKind::Other);
        assert_eq!(rec.first_order.blocker(), Some(FoBlocker::NotSelect));
        assert_eq!(rec.certainty.detail, CertaintyDetail::NotApplicable);
    }

    #[test]
    fn failing_statement_keeps_earlier_ones() {
        let mut wb = Workbench::default();
        let err = wb
            .run("CREATE TABLE T (id INT); SELECT * FROM Missing")
            .unwrap_err();
        assert!(format!("{err:#}").contains("Missing"));
        assert_eq!(wb.session().len(), 1);
        assert!(wb.engine().catalog().table("T").is_some());
    }

    #[test]
    fn parse_error_applies_nothing() {
        let mut wb = Workbench::default();
        assert!(wb.run("CREATE TABLE T (id INT); SELEC").is_err());
        assert!(wb.session().is_empty());
        assert!(wb.engine().catalog().table("T").is_none());
    }
}
