use thiserror::Error;

#[derive(Debug, Error)]
pub enum CqaError {
    #[error("unknown relation `{0}`")]
    UnknownRelation(String),

    #[error("relation `{0}` already exists")]
    RelationExists(String),

    #[error("relation `{relation}` has no column `{column}`")]
    UnknownColumn { relation: String, column: String },

    #[error("repair budget exceeded: {} repairs, limit {limit}", display_count(.count))]
    RepairBudgetExceeded { count: Option<u64>, limit: u64 },

    #[error("query evaluation failed: {0}")]
    Query(String),

    #[error("invalid fixture: {0}")]
    Fixture(#[from] serde_json::Error),
}

fn display_count(count: &Option<u64>) -> String {
    match count {
        Some(n) => n.to_string(),
        None => "more than 2^64".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, CqaError>;
