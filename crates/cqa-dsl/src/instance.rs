//! Instance text format.
//!
//! Line oriented:
//! - `@database` / `@Database` and `@query` / `@Query` open a section
//! - `#` starts a comment; blank lines are skipped
//! - lines before the first section header are ignored
//! - `Pred(k1, k2 ; a1, a2)`: arguments before `;` form the key; without a
//!   `;` every argument is a key argument
//! - query lines may be prefixed with `not ` / `Not `

use std::collections::BTreeMap;

use cqa_repair::{Catalog, Tuple, Value};
use nom::{
    bytes::complete::{take_while, take_while1},
    character::complete::{char as pchar, multispace0},
    combinator::{all_consuming, opt},
    multi::many0,
    sequence::{delimited, preceded},
    IResult,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// AST
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fact {
    pub pred: String,
    pub key_len: usize,
    pub args: Vec<String>,
}

impl Fact {
    pub fn key(&self) -> &[String] {
        &self.args[..self.key_len.min(self.args.len())]
    }

    /// Grouping key for repairs: the predicate plus its key arguments.
    pub fn key_token(&self) -> String {
        let mut token = self.pred.clone();
        for arg in self.key() {
            token.push('\u{1f}');
            token.push_str(arg);
        }
        token
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Atom {
    pub negated: bool,
    pub pred: String,
    pub key_len: usize,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub database: Vec<Fact>,
    pub query: Vec<Atom>,
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("parse error on line {line}: {message}")]
    Line { line: usize, message: String },

    #[error("instance has no `@database` facts")]
    MissingDatabase,

    #[error("instance has no `@query` atoms")]
    MissingQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Database,
    Query,
}

pub fn parse_instance(text: &str) -> Result<Instance, InstanceError> {
    let mut instance = Instance::default();
    let mut section = Section::None;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("@database") || line.starts_with("@Database") {
            section = Section::Database;
            continue;
        }
        if line.starts_with("@query") || line.starts_with("@Query") {
            section = Section::Query;
            continue;
        }
        if section == Section::None {
            continue;
        }

        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }

        match section {
            Section::Database => {
                let (pred, key_len, args) =
                    parse_atom(line).map_err(|message| InstanceError::Line {
                        line: line_no,
                        message,
                    })?;
                instance.database.push(Fact {
                    pred,
                    key_len,
                    args,
                });
            }
            Section::Query => {
                let (negated, body) = match line
                    .strip_prefix("not ")
                    .or_else(|| line.strip_prefix("Not "))
                {
                    Some(rest) => (true, rest.trim_start()),
                    None => (false, line),
                };
                let (pred, key_len, args) =
                    parse_atom(body).map_err(|message| InstanceError::Line {
                        line: line_no,
                        message,
                    })?;
                instance.query.push(Atom {
                    negated,
                    pred,
                    key_len,
                    args,
                });
            }
            Section::None => {}
        }
    }

    if instance.database.is_empty() {
        return Err(InstanceError::MissingDatabase);
    }
    if instance.query.is_empty() {
        return Err(InstanceError::MissingQuery);
    }
    Ok(instance)
}

fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(before, _)| before)
}

fn is_pred_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_separator(c: char) -> bool {
    c == ',' || c.is_whitespace()
}

fn is_term_char(c: char) -> bool {
    !is_separator(c) && !matches!(c, ';' | '(' | ')')
}

fn parse_term(input: &str) -> IResult<&str, &str> {
    delimited(
        take_while(is_separator),
        take_while1(is_term_char),
        take_while(is_separator),
    )(input)
}

fn parse_terms(input: &str) -> IResult<&str, Vec<&str>> {
    let (input, _) = take_while(is_separator)(input)?;
    many0(parse_term)(input)
}

/// `Pred(k... [; a...])` into predicate, key length and arguments.
fn parse_atom(line: &str) -> Result<(String, usize, Vec<String>), String> {
    fn parser(input: &str) -> IResult<&str, (&str, Vec<&str>, Vec<&str>)> {
        let (input, pred) = take_while1(is_pred_char)(input)?;
        let (input, _) = preceded(multispace0, pchar('('))(input)?;
        let (input, key) = parse_terms(input)?;
        let (input, rest) = opt(preceded(pchar(';'), parse_terms))(input)?;
        let (input, _) = pchar(')')(input)?;
        let (input, _) = multispace0(input)?;
        Ok((input, (pred, key, rest.unwrap_or_default())))
    }

    all_consuming(parser)(line)
        .map(|(_, (pred, key, rest))| {
            let key_len = key.len();
            let args = key.into_iter().chain(rest).map(str::to_string).collect();
            (pred.to_string(), key_len, args)
        })
        .map_err(|_| format!("malformed atom `{line}`, expected `Pred(k1, ... ; a1, ...)`"))
}

// ============================================================================
// Catalog view
// ============================================================================

impl Instance {
    /// Distinct predicates in order of first appearance.
    pub fn predicates(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for fact in &self.database {
            if !seen.contains(&fact.pred.as_str()) {
                seen.push(&fact.pred);
            }
        }
        seen
    }

    /// One relation per predicate with columns `k1..kn, a1..am` and key
    /// `k1..kn`. The shape comes from the widest fact of each predicate.
    pub fn to_catalog(&self) -> cqa_repair::Result<Catalog> {
        let mut shapes: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for fact in &self.database {
            let non_key = fact.args.len() - fact.key().len();
            let shape = shapes.entry(&fact.pred).or_insert((0, 0));
            shape.0 = shape.0.max(fact.key().len());
            shape.1 = shape.1.max(non_key);
        }

        let mut catalog = Catalog::new();
        for (pred, (key_len, rest_len)) in &shapes {
            let key: Vec<String> = (1..=*key_len).map(|i| format!("k{i}")).collect();
            let columns = key
                .iter()
                .cloned()
                .chain((1..=*rest_len).map(|i| format!("a{i}")))
                .collect();
            catalog.create_table(pred, columns, key)?;
        }
        for fact in &self.database {
            let key = fact.key();
            let row: Tuple = key
                .iter()
                .enumerate()
                .map(|(i, arg)| (format!("k{}", i + 1), Value::from(arg.as_str())))
                .chain(
                    fact.args[key.len()..]
                        .iter()
                        .enumerate()
                        .map(|(i, arg)| (format!("a{}", i + 1), Value::from(arg.as_str()))),
                )
                .collect();
            catalog.insert(&fact.pred, row)?;
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
        preamble is ignored
        @database
        R(a ; b)   # first
        R(a; c)
        S(b)
        @Query
        R(x ; y)
        not S(y)
    ";

    #[test]
    fn parses_sections_keys_and_negation() {
        let inst = parse_instance(SAMPLE).unwrap();
        assert_eq!(inst.database.len(), 3);
        assert_eq!(
            inst.database[0],
            Fact {
                pred: "R".into(),
                key_len: 1,
                args: vec!["a".into(), "b".into()],
            }
        );
        assert_eq!(inst.database[2].key_len, 1);
        assert_eq!(inst.query.len(), 2);
        assert!(!inst.query[0].negated);
        assert!(inst.query[1].negated);
        assert_eq!(inst.query[1].pred, "S");
    }

    #[test]
    fn separators_may_be_commas_or_spaces() {
        let inst = parse_instance("@database\nT(1,2 3 ; x,, y)\n@query\nT(a b c ; d e)").unwrap();
        let fact = &inst.database[0];
        assert_eq!(fact.key_len, 3);
        assert_eq!(fact.args, vec!["1", "2", "3", "x", "y"]);
        assert_eq!(fact.key(), ["1", "2", "3"]);
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let err = parse_instance("@database\nR(a ; b)\nR(a ; b\n@query\nR(x;y)").unwrap_err();
        match err {
            InstanceError::Line { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_sections() {
        assert!(matches!(
            parse_instance("@query\nR(x)"),
            Err(InstanceError::MissingDatabase)
        ));
        assert!(matches!(
            parse_instance("@database\nR(a)\n@query\n# nothing"),
            Err(InstanceError::MissingQuery)
        ));
    }

    #[test]
    fn key_token_separates_predicates() {
        let r = Fact {
            pred: "R".into(),
            key_len: 1,
            args: vec!["a".into(), "b".into()],
        };
        let s = Fact {
            pred: "S".into(),
            ..r.clone()
        };
        assert_ne!(r.key_token(), s.key_token());
    }

    #[test]
    fn catalog_view_declares_keys() {
        use cqa_repair::RelationStore;

        let inst = parse_instance(SAMPLE).unwrap();
        let catalog = inst.to_catalog().unwrap();
        let r = catalog.table("R").unwrap();
        assert_eq!(r.columns, vec!["k1", "a1"]);
        assert_eq!(r.key, vec!["k1"]);
        assert!(catalog.key_metadata("R").unwrap().violated);
        assert!(!catalog.key_metadata("S").unwrap().violated);
        assert_eq!(
            r.rows[1],
            Tuple::new().with("k1", "a").with("a1", "c")
        );
    }
}
