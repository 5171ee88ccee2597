//! Bulk delete error types

use thiserror::Error;

/// Errors raised by the bulk delete coordinator
#[derive(Error, Debug)]
pub enum BulkError {
    /// The items argument was not a sequence of scalar tokens
    #[error("Invalid item list: {0}")]
    InvalidItemList(String),

    /// Store layer error
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),
}

/// Result type for bulk operations
pub type BulkResult<T> = Result<T, BulkError>;
