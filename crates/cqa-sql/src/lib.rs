//! SQL surface for the repair-certainty evaluator.
//!
//! We use `sqlparser` to avoid hand-rolling SQL parsing. The engine here is a
//! deliberately small, single-relation executor: enough to load tables with
//! declared (unenforced) keys, run simple `SELECT`s, and answer a `SELECT` on
//! every repair of its target relation.
//!
//! Supported subset:
//!
//! ```sql
//! CREATE TABLE P (id INT PRIMARY KEY, v TEXT);
//! CREATE TABLE R (a INT, b INT, c TEXT, PRIMARY KEY (a));
//! INSERT INTO P VALUES (1, 'A'), (1, 'B');
//! INSERT INTO P (v, id) VALUES ('C', 2);
//! SELECT DISTINCT v AS value FROM P WHERE id = 1 AND NOT v IS NULL ORDER BY v LIMIT 5;
//! DROP TABLE IF EXISTS R;
//! ```

mod ddl;
mod engine;
mod error;
mod select;
mod statement;
mod workbench;

pub use ddl::{parse_sql_ddl, TableDecl};
pub use engine::SqlEngine;
pub use error::{SqlError, SqlResult};
pub use select::SelectQuery;
pub use statement::{parse_statements, ParsedStatement};
pub use workbench::Workbench;
