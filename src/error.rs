use thiserror::Error;

/// Rule violated by a candidate query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Only SELECT queries are allowed (non-SELECT statement rejected). SQL: {sql}")]
    NonSelect { sql: String },

    #[error("Multiple statements are not allowed (multiple statements rejected). SQL: {sql}")]
    MultipleStatements { sql: String },
}

#[derive(Error, Debug)]
pub enum Text2SqlError {
    #[error("SQL parsing error: {0}")]
    Parsing(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("SQL execution error: {0}")]
    Execution(String),

    #[error("Model/DB error: {0}")]
    Generation(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Text2SqlError {
    /// HTTP status the error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            Text2SqlError::Parsing(_)
            | Text2SqlError::Validation(_)
            | Text2SqlError::Execution(_) => 400,
            Text2SqlError::InvalidRequest(_) => 422,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, Text2SqlError>;
