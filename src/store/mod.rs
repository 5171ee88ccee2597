//! Miss-event Log Store
//!
//! - **types**: `MissEvent`, `NewMissEvent`, `GroupBy`, `GroupSummary`
//! - **log_store**: SQLite-backed `LogStore`
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//!   NewMissEvent → validate → INSERT (one statement, under the connection lock)
//!
//! Read Path:
//!   Plan → BEGIN → COUNT + page SELECT → COMMIT → ListResult
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use misslog::store::{LogStore, NewMissEvent, StoreConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = LogStore::open(&StoreConfig::new("./data"))?;
//!
//!     store.insert(
//!         NewMissEvent::new("/old-page")
//!             .ip("203.0.113.7")
//!             .referrer("https://example.com/"),
//!     )?;
//!
//!     println!("{} misses recorded", store.count()?);
//!     Ok(())
//! }
//! ```

mod error;
mod log_store;
mod types;

pub use error::{StoreError, StoreResult};
pub use log_store::{LogStore, StoreConfig};
pub use types::{GroupBy, GroupSummary, MissEvent, NewMissEvent};
