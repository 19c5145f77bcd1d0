//! Error types for helpdesk.

use thiserror::Error;

/// Result type alias using helpdesk's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for helpdesk operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found (unknown ticket id, unresolvable attachment)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Ticket not found
    #[error("Ticket not found: {0}")]
    TicketNotFound(i64),

    /// Rejected input: empty required field, bad enum value, disallowed
    /// or oversized upload
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means the requested entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::TicketNotFound(_))
    }
}
