//! Error types for MyNote Core.
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Result type alias for MyNote operations
pub type MyNoteResult<T> = Result<T, MyNoteError>;

/// Main error type for MyNote operations
#[derive(Error, Debug)]
pub enum MyNoteError {
    #[error("Validation error in {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MyNoteError {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MyNoteError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        MyNoteError::NotFound(what.into())
    }

    /// Create a new conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        MyNoteError::Conflict(message.into())
    }

    /// Whether this error is the storage-unavailable class (I/O or database
    /// failure) as opposed to a caller mistake. The reminder worker uses this
    /// to decide between backing off a full interval and skipping one row.
    pub fn is_storage(&self) -> bool {
        matches!(self, MyNoteError::Database(_) | MyNoteError::Io(_))
    }
}
