//! Filter error types

use thiserror::Error;

/// Errors raised while reading a filter specification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// A recognised filter key carried a value of the wrong shape
    #[error("Invalid filter '{field}': {reason}")]
    InvalidFilter { field: String, reason: String },
}

impl FilterError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field
    pub fn field(&self) -> &str {
        match self {
            Self::InvalidFilter { field, .. } => field,
        }
    }
}

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;
