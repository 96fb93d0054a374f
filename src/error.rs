use thiserror::Error;

/// Main error type for the journalgraph service.
///
/// `NotFound` deliberately covers both "does not exist" and "not owned by the
/// caller" so responses never leak the existence of another user's data.
#[derive(Error, Debug)]
pub enum JournalGraphError {
    /// Database-related errors (always surfaced, never swallowed)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or unauthorized entry/edge
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input (self-relation, out-of-range depth, unknown relation type)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Traversal exceeded its deadline
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),
}

/// Convenient Result type using JournalGraphError
pub type Result<T> = std::result::Result<T, JournalGraphError>;
