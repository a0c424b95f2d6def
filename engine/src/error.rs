//! Error types for the Tidemark engine.

use thiserror::Error;

/// All possible errors from the Tidemark engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Accessor errors
    #[error("no unique id found for table {table} after {attempts} attempts")]
    IdExhausted { table: String, attempts: usize },

    #[error("record has no value for primary key field '{0}'")]
    MissingId(String),

    #[error("versioning is not enabled for table {0}")]
    VersioningDisabled(String),

    // Mapping errors
    #[error("mapping error: {0}")]
    Mapping(String),

    // Collaborator errors
    #[error("executor error: {0}")]
    Executor(String),

    #[error("counter cache error: {0}")]
    Cache(String),
}

impl Error {
    /// Build an executor error from any displayable backend error.
    pub fn executor(err: impl std::fmt::Display) -> Self {
        Error::Executor(err.to_string())
    }

    /// Build a counter cache error from any displayable backend error.
    pub fn cache(err: impl std::fmt::Display) -> Self {
        Error::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Mapping(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
