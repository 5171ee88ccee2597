//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::bulk::BulkDeleteCoordinator;
use crate::query::{QueryPlanner, DEFAULT_PER_PAGE, MAX_PER_PAGE};
use crate::store::LogStore;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Miss-event log
    pub store: Arc<LogStore>,
    /// Turns list parameters into retrieval plans
    pub planner: QueryPlanner,
    /// Runs deletes and returns the refreshed view
    pub coordinator: BulkDeleteCoordinator,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<LogStore>, config: ApiConfig) -> Self {
        let planner = QueryPlanner::new(config.default_per_page, config.max_per_page);
        let coordinator = BulkDeleteCoordinator::new(Arc::clone(&store), planner);

        Self {
            store,
            planner,
            coordinator,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Page size when a list request names none
    pub default_per_page: u32,
    /// Upper bound on the page size a caller can request
    pub max_per_page: u32,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Enable the export endpoint
    pub enable_export: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8404,
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: MAX_PER_PAGE,
            max_body_size: 2 * 1024 * 1024, // 2MB
            enable_export: true,
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
