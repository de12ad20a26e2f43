//! Error types for mysql2sqlite.
//!
//! The conversion core never fails: splitting, filtering and rewriting are
//! total over text. Only reading input, loading configuration and talking
//! to the target database produce errors.

use thiserror::Error;

/// The main error type for conversion and loading.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The target database could not be opened.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The target engine rejected a rewritten statement.
    #[error("Statement {index} rejected: {message}")]
    Execution {
        index: usize,
        statement: String,
        message: String,
    },

    /// BEGIN, COMMIT or ROLLBACK failed.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Create an execution error for the statement at `index` (1-based).
    pub fn rejected(index: usize, statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            index,
            statement: statement.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for mysql2sqlite operations.
pub type ConvertResult<T> = Result<T, ConvertError>;
