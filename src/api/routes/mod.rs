//! API Routes
//!
//! Route handlers organized by functionality.

pub mod export;
pub mod health;
pub mod misses;

use crate::api::error::{ApiError, ApiResult};

/// Run a store call on the blocking pool
pub(crate) async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))?
}
