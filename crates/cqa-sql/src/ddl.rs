//! Table declarations from SQL DDL.
//!
//! Extracts what the repair evaluator needs from `CREATE TABLE`:
//! - columns, in declaration order
//! - the primary key, from a column option or a table constraint
//!
//! `UNIQUE` constraints are not treated as keys.

use sqlparser::ast::{ColumnOption, Statement, TableConstraint};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::error::SqlResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDecl {
    pub name: String,
    pub columns: Vec<String>,
    pub primary_key: Vec<String>,
}

/// Parse SQL DDL and extract every `CREATE TABLE` declaration.
pub fn parse_sql_ddl(sql: &str) -> SqlResult<Vec<TableDecl>> {
    let dialect = GenericDialect {};
    let statements = Parser::parse_sql(&dialect, sql)?;
    Ok(statements.iter().filter_map(table_decl).collect())
}

pub(crate) fn table_decl(stmt: &Statement) -> Option<TableDecl> {
    let Statement::CreateTable {
        name,
        columns: sql_columns,
        constraints: sql_constraints,
        ..
    } = stmt
    else {
        return None;
    };

    let table_name = name.0.last().map(|i| i.value.clone())?;
    let mut columns = Vec::with_capacity(sql_columns.len());
    let mut primary_key = Vec::new();

    for col in sql_columns {
        columns.push(col.name.value.clone());
        let is_primary = col
            .options
            .iter()
            .any(|opt| matches!(opt.option, ColumnOption::Unique { is_primary: true, .. }));
        if is_primary {
            primary_key.push(col.name.value.clone());
        }
    }

    for constraint in sql_constraints {
        if let TableConstraint::Unique {
            columns: uq_cols,
            is_primary: true,
            ..
        } = constraint
        {
            primary_key = uq_cols.iter().map(|c| c.value.clone()).collect();
        }
    }

    Some(TableDecl {
        name: table_name,
        columns,
        primary_key,
    })
}
