//! Bulk Delete Coordinator
//!
//! Three ways to remove events, one per call:
//!
//! | Mode | Input | Store call |
//! |------|-------|------------|
//! | items | ids and group values | `delete_by_id` / `delete_group` per token |
//! | groups | group values only | `delete_group` per value |
//! | filter | `DeleteScope` | `delete_matching` or `delete_all` |
//!
//! Every mode finishes by re-running the planner and returning the
//! refreshed `ListResult`.

mod coordinator;
mod error;
mod items;

pub use coordinator::{BulkDeleteCoordinator, DeleteScope, DeleteStats};
pub use error::{BulkError, BulkResult};
pub use items::{parse_group_values, parse_item_token, parse_items, split_items, ItemToken};
