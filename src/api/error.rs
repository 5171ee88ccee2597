//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use crate::bulk::BulkError;
use crate::filter::FilterError;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed filter value
    #[error("{0}")]
    Filter(#[from] FilterError),

    /// Malformed item list or failed bulk delete
    #[error("{0}")]
    Bulk(#[from] BulkError),

    /// Log store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status and machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Filter(_) => (StatusCode::BAD_REQUEST, "INVALID_FILTER"),
            ApiError::Bulk(BulkError::InvalidItemList(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_ITEM_LIST")
            }
            ApiError::Bulk(BulkError::Store(e)) | ApiError::Store(e) => store_status(e),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

fn store_status(error: &StoreError) -> (StatusCode, &'static str) {
    match error {
        StoreError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            request_id = %request_id,
            error_code = %code,
            error_message = %self,
            "API error occurred"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_error_is_bad_request() {
        let err = ApiError::from(FilterError::invalid("ip", "expected a scalar, got an array"));
        assert_eq!(
            err.status_and_code(),
            (StatusCode::BAD_REQUEST, "INVALID_FILTER")
        );
        assert!(err.to_string().contains("'ip'"));
    }

    #[test]
    fn test_bulk_errors() {
        let err = ApiError::from(BulkError::InvalidItemList("bad".to_string()));
        assert_eq!(
            err.status_and_code(),
            (StatusCode::BAD_REQUEST, "INVALID_ITEM_LIST")
        );

        let err = ApiError::from(BulkError::Store(StoreError::Lock("poisoned".to_string())));
        assert_eq!(
            err.status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
        );
    }

    #[test]
    fn test_store_validation_is_bad_request() {
        let err = ApiError::from(StoreError::Validation("url cannot be empty".to_string()));
        assert_eq!(
            err.status_and_code(),
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
        );
    }
}
