use std::fmt;

use colored::Colorize;
use cqa_repair::{CertaintyDetail, StatementRecord, Tuple};

pub fn count(count: Option<u64>) -> String {
    count.map_or_else(|| "more than u64::MAX".to_string(), |n| n.to_string())
}

fn tuples(f: &mut fmt::Formatter<'_>, indent: &str, rows: &[Tuple]) -> fmt::Result {
    if rows.is_empty() {
        writeln!(f, "{indent}(empty)")?;
    }
    for row in rows {
        writeln!(f, "{indent}{row}")?;
    }
    Ok(())
}

/// Multi-line text rendering of one evaluated statement.
pub struct RecordView<'a>(&'a StatementRecord);

pub fn statement_record(record: &StatementRecord) -> RecordView<'_> {
    RecordView(record)
}

impl fmt::Display for RecordView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.0;
        writeln!(
            f,
            "{} {}",
            format!("[{}]", record.id).dimmed(),
            record.query.bold()
        )?;

        if let Some(table) = &record.table {
            let key = match (&record.key_column, record.key_violation) {
                (Some(k), true) => format!("key {k} ({})", "violated".yellow()),
                (Some(k), false) => format!("key {k}"),
                (None, true) => format!("composite key ({})", "violated".yellow()),
                (None, false) => "no key".to_string(),
            };
            writeln!(f, "    table {table}, {key}")?;
        }

        if record.kind.is_read() {
            writeln!(f, "    {} row(s)", record.result.len())?;
            tuples(f, "      ", &record.result)?;
        }

        let verdict = if record.certainty.certain {
            "certain".green().bold()
        } else {
            "not certain".red().bold()
        };
        match &record.certainty.detail {
            CertaintyDetail::NotFirstOrder { reason } => {
                writeln!(f, "    {verdict}: not first-order ({})", reason.label())
            }
            CertaintyDetail::Repairs { repairs } => {
                writeln!(f, "    {verdict} across {} repair(s)", repairs.len())?;
                for (i, outcome) in repairs.iter().enumerate() {
                    writeln!(f, "      repair {}:", i + 1)?;
                    tuples(f, "        ", &outcome.repair)?;
                    writeln!(f, "      answer:")?;
                    tuples(f, "        ", &outcome.answer)?;
                }
                Ok(())
            }
            other => writeln!(f, "    {verdict} ({})", other.label()),
        }
    }
}
