//! `cqa` command-line interface
//!
//! - `cqa run`: execute SQL against an in-memory catalog and report, per
//!   statement, whether its answer is certain across all key repairs
//! - `cqa repairs`: list the repairs of one relation
//! - `cqa facts`: decide certainty of a boolean query over a fact instance

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use cqa_repair::{Catalog, Evaluator, EvaluatorConfig, RelationStore, Tuple};
use cqa_sql::{SqlEngine, Workbench};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser)]
#[command(name = "cqa")]
#[command(
    author,
    version,
    about = "Consistent query answering over relations with key violations"
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Refuse to enumerate more repairs than this (env: CQA_MAX_REPAIRS).
    #[arg(long, global = true)]
    max_repairs: Option<u64>,

    /// Warn when a relation has more repairs than this (env: CQA_WARN_REPAIRS).
    #[arg(long, global = true)]
    warn_repairs: Option<u64>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run SQL statements and report repair certainty for each.
    Run {
        /// SQL text (one or more `;`-separated statements).
        sql: Option<String>,

        /// Read the SQL to evaluate from a file.
        #[arg(short, long, conflicts_with = "sql")]
        file: Option<PathBuf>,

        /// Start from a JSON catalog fixture.
        #[arg(long)]
        db: Option<PathBuf>,

        /// Setup scripts applied (and recorded) before the SQL, in order.
        #[arg(long)]
        script: Vec<PathBuf>,
    },

    /// Enumerate the repairs of one relation of a JSON catalog fixture.
    Repairs {
        #[arg(long)]
        db: PathBuf,

        #[arg(long)]
        relation: String,

        /// Key column(s); defaults to the relation's declared key.
        #[arg(long)]
        key: Vec<String>,
    },

    /// Decide whether the boolean query of a fact instance is certain.
    Facts {
        /// Instance file with `@database` and `@query` sections.
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = EvaluatorConfig::from_env()
        .with_max_repairs(cli.max_repairs)
        .with_warn_repairs_above(cli.warn_repairs);
    tracing::debug!(?config, "evaluator configuration");

    match cli.command {
        Commands::Run {
            sql,
            file,
            db,
            script,
        } => cmd_run(sql, file.as_deref(), db.as_deref(), &script, config, cli.json),
        Commands::Repairs { db, relation, key } => {
            cmd_repairs(&db, &relation, key, config, cli.json)
        }
        Commands::Facts { input } => cmd_facts(&input, &config, cli.json),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read fixture `{}`", path.display()))?;
    Catalog::from_json(&text)
        .with_context(|| format!("invalid fixture `{}`", path.display()))
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(
    sql: Option<String>,
    file: Option<&Path>,
    db: Option<&Path>,
    scripts: &[PathBuf],
    config: EvaluatorConfig,
    json: bool,
) -> Result<()> {
    let input = match (sql, file) {
        (Some(sql), _) => sql,
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?,
        (None, None) => return Err(anyhow!("provide SQL text or `--file <path>`")),
    };

    let engine = match db {
        Some(path) => SqlEngine::with_catalog(load_catalog(path)?),
        None => SqlEngine::new(),
    };
    let mut bench = Workbench::new(engine, config);

    for path in scripts {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read script `{}`", path.display()))?;
        bench
            .run(&text)
            .with_context(|| format!("script `{}` failed", path.display()))?;
    }

    let ids = bench.run(&input)?;
    let records: Vec<_> = ids
        .iter()
        .filter_map(|id| bench.session().get(*id))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for record in records {
            print!("{}", render::statement_record(record));
        }
    }
    Ok(())
}

// ============================================================================
// repairs
// ============================================================================

#[derive(Serialize)]
struct RepairsReport<'a> {
    relation: &'a str,
    key: &'a [String],
    groups: usize,
    count: Option<u64>,
    repairs: Vec<Vec<Tuple>>,
}

fn cmd_repairs(
    db: &Path,
    relation: &str,
    key: Vec<String>,
    config: EvaluatorConfig,
    json: bool,
) -> Result<()> {
    let catalog = load_catalog(db)?;
    let key = if key.is_empty() {
        catalog
            .key_metadata(relation)
            .map(|m| m.columns)
            .ok_or_else(|| anyhow!("relation `{relation}` has no declared key; pass `--key`"))?
    } else {
        key
    };

    let plan = Evaluator::new(config).plan(&catalog, relation, &key)?;
    let report = RepairsReport {
        relation,
        key: &key,
        groups: plan.groups().len(),
        count: plan.count(),
        repairs: plan.repairs().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} {} on ({}): {} conflict group(s), {} repair(s)",
        "Relation".green().bold(),
        relation,
        key.join(", "),
        report.groups,
        render::count(report.count)
    );
    for (i, repair) in report.repairs.iter().enumerate() {
        println!("{}", format!("repair {}", i + 1).bold());
        for tuple in repair {
            println!("  {tuple}");
        }
    }
    Ok(())
}

// ============================================================================
// facts
// ============================================================================

fn cmd_facts(input: &Path, config: &EvaluatorConfig, json: bool) -> Result<()> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("failed to read instance `{}`", input.display()))?;
    let instance = cqa_dsl::parse_instance(&text)
        .with_context(|| format!("invalid instance `{}`", input.display()))?;
    let certain = cqa_dsl::is_certain(&instance, config)?;

    if json {
        println!("{}", serde_json::json!({ "certain": certain }));
    } else if certain {
        println!("{}", "certain".green().bold());
    } else {
        println!("{}", "not certain".red().bold());
    }
    Ok(())
}
