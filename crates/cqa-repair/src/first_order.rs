//! Syntactic first-order expressibility filter.
//!
//! A read query is treated as first-order expressible unless it uses one of
//! the constructs listed in [`FoBlocker`]. The check is a conservative scan of
//! the normalised statement text, not a semantic proof: keywords inside
//! string literals are ignored, everything else counts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Statement kinds, classified from the first word of the normalised text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    Select,
    Insert,
    Create,
    Drop,
    Delete,
    Update,
    Alter,
    Other,
}

impl StatementKind {
    pub fn classify(normalized: &str) -> Self {
        let first = normalized
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        match first.as_str() {
            "SELECT" => StatementKind::Select,
            "INSERT" => StatementKind::Insert,
            "CREATE" => StatementKind::Create,
            "DROP" => StatementKind::Drop,
            "DELETE" => StatementKind::Delete,
            "UPDATE" => StatementKind::Update,
            "ALTER" => StatementKind::Alter,
            _ => StatementKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Create => "CREATE",
            StatementKind::Drop => "DROP",
            StatementKind::Delete => "DELETE",
            StatementKind::Update => "UPDATE",
            StatementKind::Alter => "ALTER",
            StatementKind::Other => "OTHER",
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, StatementKind::Select)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The construct that disqualified a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoBlocker {
    NotSelect,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    With,
    Aggregation,
}

impl FoBlocker {
    pub fn label(&self) -> &'static str {
        match self {
            FoBlocker::NotSelect => "Not a SELECT statement",
            FoBlocker::GroupBy => "Group by",
            FoBlocker::Having => "Having",
            FoBlocker::OrderBy => "Order by",
            FoBlocker::Limit => "Limit",
            FoBlocker::With => "With",
            FoBlocker::Aggregation => "Aggregation",
        }
    }
}

impl fmt::Display for FoBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum FirstOrder {
    Expressible,
    NotExpressible(FoBlocker),
}

impl FirstOrder {
    pub fn is_expressible(&self) -> bool {
        matches!(self, FirstOrder::Expressible)
    }

    pub fn blocker(&self) -> Option<FoBlocker> {
        match self {
            FirstOrder::Expressible => None,
            FirstOrder::NotExpressible(b) => Some(*b),
        }
    }
}

const AGGREGATES: [&str; 5] = ["COUNT", "SUM", "AVG", "MIN", "MAX"];

#[derive(Debug)]
struct Word {
    upper: String,
    /// Directly followed (modulo whitespace) by `(`.
    call: bool,
}

/// Split `query` into identifier-like words, skipping quoted literals.
fn scan_words(query: &str) -> Vec<Word> {
    let chars: Vec<char> = query.chars().collect();
    let mut words = Vec::new();
    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' || c == '"' || c == '`' {
            // Doubled quotes escape themselves.
            i += 1;
            while i < chars.len() {
                if chars[i] == c {
                    if i + 1 < chars.len() && chars[i + 1] == c {
                        i += 2;
                        continue;
                    }
                    break;
                }
                i += 1;
            }
            i += 1;
            continue;
        }
        if c.is_alphanumeric() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let upper: String = chars[start..i].iter().collect::<String>().to_uppercase();
            let mut j = i;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            let call = j < chars.len() && chars[j] == '(';
            words.push(Word { upper, call });
            continue;
        }
        i += 1;
    }
    words
}

fn has_pair(words: &[Word], first: &str, second: &str) -> bool {
    words
        .windows(2)
        .any(|w| w[0].upper == first && w[1].upper == second)
}

fn has_word(words: &[Word], word: &str) -> bool {
    words.iter().any(|w| w.upper == word)
}

/// Classify `query` (of statement kind `kind`) as first-order expressible or
/// not, naming the first disqualifying construct found.
pub fn is_first_order(query: &str, kind: StatementKind) -> FirstOrder {
    if kind != StatementKind::Select {
        return FirstOrder::NotExpressible(FoBlocker::NotSelect);
    }
    let words = scan_words(query);

    let blocker = if has_pair(&words, "GROUP", "BY") {
        Some(FoBlocker::GroupBy)
    } else if has_word(&words, "HAVING") {
        Some(FoBlocker::Having)
    } else if has_pair(&words, "ORDER", "BY") {
        Some(FoBlocker::OrderBy)
    } else if has_word(&words, "LIMIT") {
        Some(FoBlocker::Limit)
    } else if has_word(&words, "WITH") {
        Some(FoBlocker::With)
    } else if words
        .iter()
        .any(|w| w.call && AGGREGATES.contains(&w.upper.as_str()))
    {
        Some(FoBlocker::Aggregation)
    } else {
        None
    };

    match blocker {
        Some(b) => FirstOrder::NotExpressible(b),
        None => FirstOrder::Expressible,
    }
}
