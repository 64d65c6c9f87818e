use cqa_repair::{Catalog, KeyMetadata, RelationSnapshot, RelationStore, Tuple};
use sqlparser::ast::{Expr, ObjectName, ObjectType, SetExpr, Statement};

use crate::ddl::table_decl;
use crate::error::{SqlError, SqlResult};
use crate::select::{literal_value, SelectQuery};
use crate::statement::ParsedStatement;

/// Executes parsed statements against an in-memory [`Catalog`].
#[derive(Debug, Clone, Default)]
pub struct SqlEngine {
    catalog: Catalog,
}

impl SqlEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn into_catalog(self) -> Catalog {
        self.catalog
    }

    /// Execute one statement. `SELECT` returns its answer; everything else
    /// returns no rows.
    pub fn execute(&mut self, parsed: &ParsedStatement) -> SqlResult<Vec<Tuple>> {
        match &parsed.statement {
            Statement::Query(_) => {
                let query = SelectQuery::compile(&parsed.statement)?;
                let snapshot = self.catalog.read_relation(query.relation())?;
                query.run(&snapshot.tuples)
            }
            stmt @ Statement::CreateTable { .. } => {
                let decl = table_decl(stmt)
                    .ok_or_else(|| SqlError::unsupported("CREATE TABLE without a name"))?;
                self.catalog
                    .create_table(&decl.name, decl.columns, decl.primary_key)?;
                Ok(Vec::new())
            }
            Statement::Insert {
                table_name,
                columns,
                source,
                ..
            } => {
                let table = object_name(table_name)?;
                let source = source
                    .as_deref()
                    .ok_or_else(|| SqlError::unsupported("INSERT without VALUES"))?;
                let SetExpr::Values(values) = source.body.as_ref() else {
                    return Err(SqlError::unsupported("INSERT ... SELECT"));
                };
                let columns: Vec<String> = if columns.is_empty() {
                    self.catalog
                        .table(&table)
                        .map(|t| t.columns.clone())
                        .ok_or_else(|| cqa_repair::CqaError::UnknownRelation(table.clone()))?
                } else {
                    columns.iter().map(|c| c.value.clone()).collect()
                };
                let rows = values
                    .rows
                    .iter()
                    .map(|row| build_row(&table, &columns, row))
                    .collect::<SqlResult<Vec<_>>>()?;
                for row in rows {
                    self.catalog.insert(&table, row)?;
                }
                Ok(Vec::new())
            }
            Statement::Drop {
                object_type: ObjectType::Table,
                if_exists,
                names,
                ..
            } => {
                for name in names {
                    let table = object_name(name)?;
                    if !self.catalog.drop_table(&table) && !*if_exists {
                        return Err(cqa_repair::CqaError::UnknownRelation(table).into());
                    }
                }
                Ok(Vec::new())
            }
            _ => Err(SqlError::unsupported(format!(
                "{} statements are not executed: `{}`",
                parsed.kind, parsed.text
            ))),
        }
    }
}

impl RelationStore for SqlEngine {
    fn read_relation(&self, name: &str) -> cqa_repair::Result<RelationSnapshot> {
        self.catalog.read_relation(name)
    }

    fn key_metadata(&self, name: &str) -> Option<KeyMetadata> {
        self.catalog.key_metadata(name)
    }

    fn relation_columns(&self, name: &str) -> Option<Vec<String>> {
        self.catalog.relation_columns(name)
    }
}

fn object_name(name: &ObjectName) -> SqlResult<String> {
    name.0
        .last()
        .map(|i| i.value.clone())
        .ok_or_else(|| SqlError::unsupported("empty object name"))
}

fn build_row(table: &str, columns: &[String], row: &[Expr]) -> SqlResult<Tuple> {
    if row.len() != columns.len() {
        return Err(SqlError::InvalidValue(format!(
            "INSERT INTO {table}: {} values for {} columns",
            row.len(),
            columns.len()
        )));
    }
    columns
        .iter()
        .zip(row)
        .map(|(c, expr)| Ok((c.clone(), literal_value(expr)?)))
        .collect()
}
