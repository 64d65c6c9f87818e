use cqa_repair::CqaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlError {
    #[error("failed to parse SQL: {0}")]
    Parse(#[from] sqlparser::parser::ParserError),

    #[error("unsupported SQL: {0}")]
    Unsupported(String),

    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error(transparent)]
    Catalog(#[from] CqaError),
}

impl SqlError {
    pub(crate) fn unsupported(what: impl Into<String>) -> Self {
        SqlError::Unsupported(what.into())
    }
}

pub type SqlResult<T> = Result<T, SqlError>;
