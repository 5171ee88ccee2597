//! # misslog
//!
//! Filter, aggregation and deletion engine for "404 not found" events in a
//! URL-redirection manager.
//!
//! ## Features
//!
//! - **Durable log**: SQLite in WAL mode, one row per miss
//! - **Filtered paging**: stable pages over a live, growing log
//! - **Grouping**: counts per client IP or per requested URL
//! - **Bulk deletes**: by id, by group value, or by filter
//!
//! ## Modules
//!
//! - [`store`]: Miss-event log store
//! - [`filter`]: Filter criteria and predicates
//! - [`query`]: List parameters and the query planner
//! - [`bulk`]: Bulk delete coordinator
//! - [`api`]: REST API server with Axum
//! - [`retention`]: Background expiry of old events
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use misslog::query::{ListParams, QueryPlanner};
//! use misslog::store::{GroupBy, LogStore, NewMissEvent, StoreConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = LogStore::open(&StoreConfig::new("./data"))?;
//!
//!     store.insert(NewMissEvent::new("/old-page").ip("203.0.113.7"))?;
//!     store.insert(NewMissEvent::new("/old-page").ip("203.0.113.8"))?;
//!
//!     // Misses per URL, busiest first
//!     let plan = QueryPlanner::default().plan(&ListParams::new().group_by(GroupBy::Url));
//!     let result = store.list(&plan)?;
//!
//!     for group in result.groups().unwrap_or_default() {
//!         println!("{} {}", group.count, group.group_key);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod bulk;
pub mod config;
pub mod filter;
pub mod query;
pub mod retention;
pub mod store;

// Re-export top-level types for convenience
pub use store::{
    GroupBy, GroupSummary, LogStore, MissEvent, NewMissEvent, StoreConfig, StoreError,
    StoreResult,
};

pub use filter::{FilterBy, FilterError, FilterKey, Predicate};

pub use query::{Direction, ListItems, ListParams, ListResult, OrderBy, Plan, QueryPlanner};

pub use bulk::{BulkDeleteCoordinator, BulkError, DeleteScope, ItemToken};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use retention::{spawn_sweeper, RetentionPolicy};

pub use config::{
    ApiConfig as ConfigApiConfig, Config, ConfigError, LoggingConfig, RetentionConfig,
    StorageConfig as ConfigStorageConfig,
};
