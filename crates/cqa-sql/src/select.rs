//! Single-relation `SELECT` compiled into a repair-answerable query.
//!
//! ```sql
//! SELECT [DISTINCT] item, ...
//! FROM Rel
//! [WHERE predicate]
//! [ORDER BY col [ASC|DESC], ...]
//! [LIMIT n]
//! ```
//!
//! - `item` is `*`, `Rel.*`, `col`, `Rel.col`, or either of the latter with `AS alias`
//! - `predicate` combines `= <> != < <= > >=`, `AND`, `OR`, `NOT`,
//!   `IS [NOT] NULL` over columns and literals, with SQL three-valued logic
//!
//! Grouping, aggregates, joins, sub-queries and CTEs are rejected with
//! [`SqlError::Unsupported`].

use std::cmp::Ordering;
use std::collections::HashSet;

use cqa_repair::{CqaError, RepairQuery, Tuple, Value};
use sqlparser::ast::{
    BinaryOperator, Distinct, Expr, GroupByExpr, Ident, Query, SelectItem, SetExpr, Statement,
    TableFactor, UnaryOperator, Value as SqlValue,
};

use crate::error::{SqlError, SqlResult};

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Column(String),
    Literal(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Compare {
        left: Operand,
        op: CmpOp,
        right: Operand,
    },
    IsNull {
        operand: Operand,
        negated: bool,
    },
    Truthy(Operand),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

#[derive(Debug, Clone, PartialEq)]
enum Projection {
    All,
    Column { source: String, output: String },
}

#[derive(Debug, Clone, PartialEq)]
struct OrderKey {
    column: String,
    ascending: bool,
}

/// A compiled `SELECT` over one relation.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    relation: String,
    projection: Vec<Projection>,
    selection: Option<Predicate>,
    distinct: bool,
    order_by: Vec<OrderKey>,
    limit: Option<usize>,
}

impl SelectQuery {
    pub fn compile(statement: &Statement) -> SqlResult<Self> {
        match statement {
            Statement::Query(query) => Self::compile_query(query),
            other => Err(SqlError::unsupported(format!(
                "expected a SELECT statement, got `{other}`"
            ))),
        }
    }

    fn compile_query(query: &Query) -> SqlResult<Self> {
        if query.with.is_some() {
            return Err(SqlError::unsupported("WITH"));
        }
        if query.offset.is_some() || query.fetch.is_some() {
            return Err(SqlError::unsupported("OFFSET / FETCH"));
        }
        let SetExpr::Select(select) = query.body.as_ref() else {
            return Err(SqlError::unsupported("only plain SELECT bodies are supported"));
        };

        match &select.group_by {
            GroupByExpr::Expressions(exprs) if exprs.is_empty() => {}
            _ => return Err(SqlError::unsupported("GROUP BY")),
        }
        if select.having.is_some() {
            return Err(SqlError::unsupported("HAVING"));
        }

        let distinct = match &select.distinct {
            None => false,
            Some(Distinct::Distinct) => true,
            Some(Distinct::On(_)) => return Err(SqlError::unsupported("DISTINCT ON")),
        };

        let [table] = select.from.as_slice() else {
            return Err(SqlError::unsupported(
                "exactly one relation is required in FROM",
            ));
        };
        if !table.joins.is_empty() {
            return Err(SqlError::unsupported("JOIN"));
        }
        let relation = match &table.relation {
            TableFactor::Table { name, .. } => name
                .0
                .last()
                .map(|i| i.value.clone())
                .ok_or_else(|| SqlError::unsupported("empty relation name"))?,
            other => return Err(SqlError::unsupported(format!("FROM item `{other}`"))),
        };

        let projection = select
            .projection
            .iter()
            .map(lower_select_item)
            .collect::<SqlResult<Vec<_>>>()?;

        let selection = select.selection.as_ref().map(lower_predicate).transpose()?;

        let order_by = query
            .order_by
            .iter()
            .map(|o| {
                Ok(OrderKey {
                    column: column_name(&o.expr)?,
                    ascending: o.asc.unwrap_or(true),
                })
            })
            .collect::<SqlResult<Vec<_>>>()?;

        let limit = query.limit.as_ref().map(limit_value).transpose()?;

        Ok(Self {
            relation,
            projection,
            selection,
            distinct,
            order_by,
            limit,
        })
    }

    /// The relation named in `FROM`.
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Run this query over `rows` (the full extent of the relation).
    pub fn run(&self, rows: &[Tuple]) -> SqlResult<Vec<Tuple>> {
        let mut kept: Vec<&Tuple> = Vec::with_capacity(rows.len());
        for row in rows {
            let keep = match &self.selection {
                None => true,
                Some(p) => eval_predicate(p, row)? == Some(true),
            };
            if keep {
                kept.push(row);
            }
        }

        if !self.order_by.is_empty() {
            for key in &self.order_by {
                for row in &kept {
                    lookup(row, &key.column)?;
                }
            }
            kept.sort_by(|a, b| self.compare_rows(a, b));
        }

        let mut out: Vec<Tuple> = Vec::with_capacity(kept.len());
        let mut seen: HashSet<String> = HashSet::new();
        for row in kept {
            let projected = self.project(row)?;
            if self.distinct && !seen.insert(projected.canonical()) {
                continue;
            }
            out.push(projected);
        }

        if let Some(n) = self.limit {
            out.truncate(n);
        }
        Ok(out)
    }

    fn compare_rows(&self, a: &Tuple, b: &Tuple) -> Ordering {
        for key in &self.order_by {
            let null = Value::Null;
            let va = lookup(a, &key.column).unwrap_or(&null);
            let vb = lookup(b, &key.column).unwrap_or(&null);
            // NULL sorts first.
            let ord = match (va.is_null(), vb.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => va.sql_cmp(vb).unwrap_or(Ordering::Equal),
            };
            let ord = if key.ascending { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    fn project(&self, row: &Tuple) -> SqlResult<Tuple> {
        let mut out = Tuple::new();
        for item in &self.projection {
            match item {
                Projection::All => {
                    for (c, v) in row.iter() {
                        out.insert(c, v.clone());
                    }
                }
                Projection::Column { source, output } => {
                    out.insert(output.clone(), lookup(row, source)?.clone());
                }
            }
        }
        Ok(out)
    }
}

impl RepairQuery for SelectQuery {
    fn answer(&self, repair: &[Tuple]) -> cqa_repair::Result<Vec<Tuple>> {
        self.run(repair).map_err(|e| CqaError::Query(e.to_string()))
    }
}

// ============================================================================
// Lowering
// ============================================================================

fn lower_select_item(item: &SelectItem) -> SqlResult<Projection> {
    match item {
        SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(_, _) => Ok(Projection::All),
        SelectItem::UnnamedExpr(expr) => {
            let source = column_name(expr)?;
            Ok(Projection::Column {
                output: source.clone(),
                source,
            })
        }
        SelectItem::ExprWithAlias { expr, alias } => Ok(Projection::Column {
            source: column_name(expr)?,
            output: alias.value.clone(),
        }),
    }
}

fn column_name(expr: &Expr) -> SqlResult<String> {
    match expr {
        Expr::Identifier(id) => Ok(id.value.clone()),
        Expr::CompoundIdentifier(ids) => last_ident(ids),
        Expr::Nested(inner) => column_name(inner),
        other => Err(SqlError::unsupported(format!(
            "expected a column reference, got `{other}`"
        ))),
    }
}

fn last_ident(ids: &[Ident]) -> SqlResult<String> {
    ids.last()
        .map(|i| i.value.clone())
        .ok_or_else(|| SqlError::unsupported("empty identifier"))
}

fn limit_value(expr: &Expr) -> SqlResult<usize> {
    match literal_value(expr)? {
        Value::Int(n) if n >= 0 => Ok(n as usize),
        other => Err(SqlError::InvalidValue(format!("LIMIT {other}"))),
    }
}

/// Convert a literal expression (as found in `VALUES` or `WHERE`) to a value.
pub(crate) fn literal_value(expr: &Expr) -> SqlResult<Value> {
    match expr {
        Expr::Value(v) => sql_value(v),
        Expr::Nested(inner) => literal_value(inner),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match literal_value(expr)? {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(x) => Ok(Value::Float(-x)),
            other => Err(SqlError::InvalidValue(format!("-{other}"))),
        },
        Expr::UnaryOp {
            op: UnaryOperator::Plus,
            expr,
        } => literal_value(expr),
        other => Err(SqlError::unsupported(format!(
            "expected a literal, got `{other}`"
        ))),
    }
}

fn sql_value(v: &SqlValue) -> SqlResult<Value> {
    match v {
        SqlValue::Number(text, _) => {
            if let Ok(n) = text.parse::<i64>() {
                Ok(Value::Int(n))
            } else {
                text.parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| SqlError::InvalidValue(text.clone()))
            }
        }
        SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => {
            Ok(Value::Text(s.clone()))
        }
        SqlValue::Boolean(b) => Ok(Value::Bool(*b)),
        SqlValue::Null => Ok(Value::Null),
        other => Err(SqlError::unsupported(format!("literal `{other}`"))),
    }
}

fn lower_operand(expr: &Expr) -> SqlResult<Operand> {
    match expr {
        Expr::Identifier(_) | Expr::CompoundIdentifier(_) => {
            Ok(Operand::Column(column_name(expr)?))
        }
        Expr::Nested(inner) => lower_operand(inner),
        _ => Ok(Operand::Literal(literal_value(expr)?)),
    }
}

fn lower_predicate(expr: &Expr) -> SqlResult<Predicate> {
    match expr {
        Expr::Nested(inner) => lower_predicate(inner),
        Expr::BinaryOp { left, op, right } => {
            let cmp = match op {
                BinaryOperator::And => {
                    return Ok(Predicate::And(
                        Box::new(lower_predicate(left)?),
                        Box::new(lower_predicate(right)?),
                    ))
                }
                BinaryOperator::Or => {
                    return Ok(Predicate::Or(
                        Box::new(lower_predicate(left)?),
                        Box::new(lower_predicate(right)?),
                    ))
                }
                BinaryOperator::Eq => CmpOp::Eq,
                BinaryOperator::NotEq => CmpOp::NotEq,
                BinaryOperator::Lt => CmpOp::Lt,
                BinaryOperator::LtEq => CmpOp::LtEq,
                BinaryOperator::Gt => CmpOp::Gt,
                BinaryOperator::GtEq => CmpOp::GtEq,
                other => return Err(SqlError::unsupported(format!("operator `{other}`"))),
            };
            Ok(Predicate::Compare {
                left: lower_operand(left)?,
                op: cmp,
                right: lower_operand(right)?,
            })
        }
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            expr,
        } => Ok(Predicate::Not(Box::new(lower_predicate(expr)?))),
        Expr::IsNull(inner) => Ok(Predicate::IsNull {
            operand: lower_operand(inner)?,
            negated: false,
        }),
        Expr::IsNotNull(inner) => Ok(Predicate::IsNull {
            operand: lower_operand(inner)?,
            negated: true,
        }),
        Expr::Identifier(_) | Expr::CompoundIdentifier(_) | Expr::Value(_) => {
            Ok(Predicate::Truthy(lower_operand(expr)?))
        }
        other => Err(SqlError::unsupported(format!("predicate `{other}`"))),
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Exact column name first, then a case-insensitive match.
fn lookup<'t>(row: &'t Tuple, column: &str) -> SqlResult<&'t Value> {
    if let Some(v) = row.get(column) {
        return Ok(v);
    }
    row.iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(column))
        .map(|(_, v)| v)
        .ok_or_else(|| SqlError::UnknownColumn(column.to_string()))
}

fn operand_value<'t>(operand: &'t Operand, row: &'t Tuple) -> SqlResult<&'t Value> {
    match operand {
        Operand::Column(c) => lookup(row, c),
        Operand::Literal(v) => Ok(v),
    }
}

/// Three-valued: `None` is SQL `UNKNOWN`.
fn eval_predicate(p: &Predicate, row: &Tuple) -> SqlResult<Option<bool>> {
    Ok(match p {
        Predicate::Compare { left, op, right } => {
            let l = operand_value(left, row)?;
            let r = operand_value(right, row)?;
            l.sql_cmp(r).map(|ord| match op {
                CmpOp::Eq => ord == Ordering::Equal,
                CmpOp::NotEq => ord != Ordering::Equal,
                CmpOp::Lt => ord == Ordering::Less,
                CmpOp::LtEq => ord != Ordering::Greater,
                CmpOp::Gt => ord == Ordering::Greater,
                CmpOp::GtEq => ord != Ordering::Less,
            })
        }
        Predicate::IsNull { operand, negated } => {
            Some(operand_value(operand, row)?.is_null() != *negated)
        }
        Predicate::Truthy(operand) => match operand_value(operand, row)? {
            Value::Null => None,
            Value::Bool(b) => Some(*b),
            Value::Int(n) => Some(*n != 0),
            Value::Float(x) => Some(*x != 0.0),
            Value::Text(_) => Some(false),
        },
        Predicate::And(a, b) => match (eval_predicate(a, row)?, eval_predicate(b, row)?) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        Predicate::Or(a, b) => match (eval_predicate(a, row)?, eval_predicate(b, row)?) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
        Predicate::Not(inner) => eval_predicate(inner, row)?.map(|b| !b),
    })
}
