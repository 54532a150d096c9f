use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("malformed version record: {0}")]
    MalformedRecord(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("branch name must not be empty")]
    EmptyBranch,
}
