//! Log store error types

use thiserror::Error;

/// Errors that can occur in the log store
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite rejected a statement or could not open the database
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection lock was poisoned by a panicking writer
    #[error("Lock error: {0}")]
    Lock(String),

    /// Caller supplied data the store will not accept
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
