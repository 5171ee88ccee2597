//! Bulk Delete Coordinator
//!
//! Resolves delete targets, removes them through the log store, and
//! re-runs the query planner so the caller gets the post-delete view.

use crate::bulk::error::BulkResult;
use crate::bulk::items::ItemToken;
use crate::filter::FilterBy;
use crate::query::{ListParams, ListResult, QueryPlanner};
use crate::store::{GroupBy, LogStore};
use std::sync::Arc;

/// What a filter deletion removes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteScope {
    /// Events matching a non-empty filter
    Matching(FilterBy),
    /// Every event in the store
    Everything,
}

impl DeleteScope {
    /// Scope for a caller-supplied filter. An empty filter means the whole
    /// log.
    pub fn from_filter(filter: FilterBy) -> Self {
        if filter.is_empty() {
            tracing::warn!("Delete requested with no filter and no items, deleting every event");
            Self::Everything
        } else {
            Self::Matching(filter)
        }
    }
}

/// Counts from one bulk delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteStats {
    pub ids_removed: usize,
    pub group_rows_removed: usize,
}

impl DeleteStats {
    pub fn total(&self) -> usize {
        self.ids_removed + self.group_rows_removed
    }
}

/// Runs deletes against the log store and returns the refreshed view
#[derive(Clone)]
pub struct BulkDeleteCoordinator {
    store: Arc<LogStore>,
    planner: QueryPlanner,
}

impl BulkDeleteCoordinator {
    pub fn new(store: Arc<LogStore>, planner: QueryPlanner) -> Self {
        Self { store, planner }
    }

    pub fn store(&self) -> &Arc<LogStore> {
        &self.store
    }

    pub fn planner(&self) -> &QueryPlanner {
        &self.planner
    }

    /// Plan and run a list request
    pub fn list(&self, params: &ListParams) -> BulkResult<ListResult> {
        let plan = self.planner.plan(params);
        Ok(self.store.list(&plan)?)
    }

    /// Delete by explicit tokens.
    ///
    /// Id tokens remove one event each. Group tokens remove every event
    /// whose `ip` (when grouped by ip) or exact `url` equals the value.
    /// Each delete is atomic on its own; the batch is not.
    pub fn delete_by_items(
        &self,
        items: &[ItemToken],
        params: &ListParams,
    ) -> BulkResult<ListResult> {
        let stats = self.remove_items(items, GroupBy::for_deletion(params.group_by))?;

        tracing::info!(
            items = items.len(),
            ids_removed = stats.ids_removed,
            group_rows_removed = stats.group_rows_removed,
            removed = stats.total(),
            "Bulk delete by items"
        );

        self.list(params)
    }

    /// Delete whole groups. Every value is treated as a group value, even
    /// when it looks like an id.
    pub fn delete_groups(&self, values: &[String], params: &ListParams) -> BulkResult<ListResult> {
        let dimension = GroupBy::for_deletion(params.group_by);
        let mut removed = 0;

        for value in values {
            removed += self.store.delete_group(dimension, value)?;
        }

        tracing::info!(
            groups = values.len(),
            removed,
            dimension = %dimension,
            "Bulk delete by group"
        );

        self.list(params)
    }

    /// Delete everything in `scope` with one statement
    pub fn delete_by_filter(
        &self,
        scope: &DeleteScope,
        params: &ListParams,
    ) -> BulkResult<ListResult> {
        let removed = match scope {
            DeleteScope::Matching(filter) => self.store.delete_matching(&filter.predicate())?,
            DeleteScope::Everything => self.store.delete_all()?,
        };

        tracing::info!(removed, "Bulk delete by filter");

        self.list(params)
    }

    /// Delete one event; a missing id is not an error
    pub fn delete_by_id(&self, id: i64) -> BulkResult<()> {
        self.store.delete_by_id(id)?;
        Ok(())
    }

    fn remove_items(&self, items: &[ItemToken], dimension: GroupBy) -> BulkResult<DeleteStats> {
        let mut stats = DeleteStats::default();

        for item in items {
            match item {
                ItemToken::Id(id) => {
                    if self.store.delete_by_id(*id)? {
                        stats.ids_removed += 1;
                    }
                }
                ItemToken::Group(value) => {
                    stats.group_rows_removed += self.store.delete_group(dimension, value)?;
                }
            }
        }

        Ok(stats)
    }
}
