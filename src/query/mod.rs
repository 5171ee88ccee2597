//! Query Planner
//!
//! Combines a filter, a sort order and a page window into one retrieval
//! plan. Two modes:
//!
//! - **Flat**: a page of individual miss events plus the match count
//! - **Grouped**: a page of `(group_key, count)` rows plus the group count
//!
//! # Pipeline
//!
//! ```text
//! request bag → ListParams → QueryPlanner::plan → Plan → LogStore::list → ListResult
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use misslog::query::{ListParams, QueryPlanner};
//! use misslog::store::GroupBy;
//!
//! let planner = QueryPlanner::default();
//! let plan = planner.plan(&ListParams::new().group_by(GroupBy::Ip).per_page(10));
//! let page = store.list(&plan)?;
//! ```

mod params;
mod plan;
mod result;

pub use params::{Direction, ListParams, OrderBy};
pub use plan::{FlatSort, GroupSort, Page, Plan, QueryPlanner, DEFAULT_PER_PAGE, MAX_PER_PAGE};
pub use result::{ListItems, ListResult};
