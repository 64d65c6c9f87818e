use cqa_repair::StatementKind;
use sqlparser::ast::{SetExpr, Statement, TableFactor};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::error::SqlResult;

/// One parsed statement with its normalised text.
#[derive(Debug, Clone)]
pub struct ParsedStatement {
    pub statement: Statement,
    /// `sqlparser`'s rendering: upper-cased keywords, single spaces.
    pub text: String,
    pub kind: StatementKind,
    /// For `SELECT`: the first relation of the `FROM` clause.
    pub target: Option<String>,
}

pub fn parse_statements(sql: &str) -> SqlResult<Vec<ParsedStatement>> {
    let dialect = GenericDialect {};
    let statements = Parser::parse_sql(&dialect, sql)?;
    Ok(statements.into_iter().map(ParsedStatement::new).collect())
}

impl ParsedStatement {
    pub fn new(statement: Statement) -> Self {
        let text = statement.to_string();
        let kind = StatementKind::classify(&text);
        let target = if kind.is_read() {
            select_target(&statement)
        } else {
            None
        };
        Self {
            statement,
            text,
            kind,
            target,
        }
    }
}

fn select_target(statement: &Statement) -> Option<String> {
    let Statement::Query(query) = statement else {
        return None;
    };
    let SetExpr::Select(select) = query.body.as_ref() else {
        return None;
    };
    let first = select.from.first()?;
    match &first.relation {
        TableFactor::Table { name, .. } => name.0.last().map(|ident| ident.value.clone()),
        _ => None,
    }
}
