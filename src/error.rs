//! Error types for newsfeed.

use thiserror::Error;

/// Common error type for newsfeed.
#[derive(Error, Debug)]
pub enum NewsError {
    /// Database error.
    ///
    /// A single statement failed. Errors from sqlx are converted into this
    /// variant automatically.
    #[error("database error: {0}")]
    Database(String),

    /// The store cannot be reached at all.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Feed download failed.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Feed document could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

// Conversion from sqlx errors
impl From<sqlx::Error> for NewsError {
    fn from(e: sqlx::Error) -> Self {
        NewsError::Database(e.to_string())
    }
}

/// Result type alias for newsfeed operations.
pub type Result<T> = std::result::Result<T, NewsError>;
