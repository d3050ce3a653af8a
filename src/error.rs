use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PuzzleError {
    #[error("Cannot open puzzle store at '{}'", path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to {operation}")]
    QueryFailed {
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("No puzzle with id '{0}'")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("There are only {available} puzzles due and {requested} were requested")]
    InsufficientDueItems { available: usize, requested: usize },
}

impl PuzzleError {
    /// Wraps a statement failure with a description of what was being attempted.
    pub fn query(operation: impl Into<String>) -> impl FnOnce(sqlx::Error) -> Self {
        let operation = operation.into();
        move |source| PuzzleError::QueryFailed { operation, source }
    }
}

pub type Result<T, E = PuzzleError> = std::result::Result<T, E>;
